// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Raw sample validation
//!
//! Every incoming vector goes through [`RawSampleGuard::validate`] before
//! anything else touches it, so pre-processed or placeholder data never
//! reaches the calibration buffer or the histories.

use serde::{Deserialize, Serialize};

use crate::config::{AcquisitionConfig, TrailingField};
use crate::error::ProcessingError;

/// A raw sample that passed validation, with its trailing fields split off
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedSample {
    /// Strictly positive raw intensities (or optical densities)
    pub values: Vec<f64>,
    /// Auxiliary device-status value, if the source appended one
    pub status: Option<f64>,
    /// Event marker, if the source appended one
    pub marker: Option<f64>,
}

impl ValidatedSample {
    /// Number of raw values after trimming
    pub fn width(&self) -> usize {
        self.values.len()
    }
}

/// Stateless validator for raw intensity vectors
#[derive(Debug, Clone)]
pub struct RawSampleGuard {
    allowed_lengths: Vec<usize>,
    trailing_field_widths: Vec<usize>,
    single_trailing_field: TrailingField,
}

impl RawSampleGuard {
    /// Create a guard accepting the configured raw lengths
    pub fn new(config: &AcquisitionConfig) -> Self {
        Self {
            allowed_lengths: config.allowed_raw_lengths.clone(),
            trailing_field_widths: config.trailing_field_widths.clone(),
            single_trailing_field: config.single_trailing_field,
        }
    }

    fn is_allowed(&self, length: usize) -> bool {
        self.allowed_lengths.contains(&length)
    }

    fn takes_trailing_fields(&self, width: usize) -> bool {
        self.is_allowed(width) && self.trailing_field_widths.contains(&width)
    }

    /// Raw-shape check: allowed length and every value finite and > 0
    pub fn check_row(&self, values: &[f64]) -> bool {
        self.is_allowed(values.len()) && values.iter().all(|v| v.is_finite() && *v > 0.0)
    }

    /// Validate a raw vector, stripping up to two trailing auxiliary fields
    /// when the remaining width is one that carries them (32 by default, so
    /// 16, 32, 33 and 34 are the accepted lengths).
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::MalformedSample`] carrying the original
    /// length and the minimum value when the trimmed length is not allowed
    /// or a value is not strictly positive.
    pub fn validate(&self, raw: &[f64]) -> Result<ValidatedSample, ProcessingError> {
        let length = raw.len();

        let trailing = if self.is_allowed(length) {
            0
        } else if length >= 1 && self.takes_trailing_fields(length - 1) {
            1
        } else if length >= 2 && self.takes_trailing_fields(length - 2) {
            2
        } else {
            return Err(ProcessingError::malformed(length, raw));
        };

        let (values, extra) = raw.split_at(length - trailing);
        if !self.check_row(values) {
            return Err(ProcessingError::malformed(length, values));
        }

        let (status, marker) = match (extra, self.single_trailing_field) {
            ([status, marker], _) => (Some(*status), Some(*marker)),
            ([value], TrailingField::Status) => (Some(*value), None),
            ([value], TrailingField::Marker) => (None, Some(*value)),
            _ => (None, None),
        };

        Ok(ValidatedSample {
            values: values.to_vec(),
            status,
            marker,
        })
    }
}
