// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Data acquisition configuration
//!
//! This module defines how incoming raw vectors are expected to look:
//! the nominal sample rate used to size internal buffers, the raw lengths
//! accepted by the sample guard, which of them may carry trailing fields,
//! and how a single trailing field is read.

use serde::{Deserialize, Serialize};

/// Role of a lone trailing value appended after the raw intensities.
///
/// When two values are appended the first one is always the device status
/// and the second one the event marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrailingField {
    /// Auxiliary device-status (ADC) value
    Status,
    /// Event marker / trigger channel
    #[default]
    Marker,
}

/// Configuration for the incoming raw sample stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Nominal sample rate of the stream in Hz.
    ///
    /// All rate-dependent buffers (calibration length, quality and alert
    /// histories) are sized from this value. Default is 10 Hz.
    #[serde(default = "default_sample_rate_hz")]
    pub sample_rate_hz: f64,

    /// Raw vector lengths accepted by the sample guard.
    ///
    /// 16 is an already mapped 8 channels x 2 wavelengths vector, 32 is two
    /// receiver banks of 8 channels x 2 wavelengths each.
    #[serde(default = "default_allowed_raw_lengths")]
    pub allowed_raw_lengths: Vec<usize>,

    /// Raw lengths that may be followed by status and marker fields.
    ///
    /// Only the dual-bank headset appends them, so by default a 16-wide
    /// vector with extra values is malformed.
    #[serde(default = "default_trailing_field_widths")]
    pub trailing_field_widths: Vec<usize>,

    /// Interpretation of a single trailing value
    #[serde(default)]
    pub single_trailing_field: TrailingField,
}

fn default_sample_rate_hz() -> f64 {
    10.0
}

fn default_allowed_raw_lengths() -> Vec<usize> {
    vec![16, 32]
}

fn default_trailing_field_widths() -> Vec<usize> {
    vec![32]
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: default_sample_rate_hz(),
            allowed_raw_lengths: default_allowed_raw_lengths(),
            trailing_field_widths: default_trailing_field_widths(),
            single_trailing_field: TrailingField::default(),
        }
    }
}
