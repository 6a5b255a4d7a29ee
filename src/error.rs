// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error types for the signal-processing core
//!
//! Per-sample errors ([`ProcessingError::MalformedSample`]) are local and
//! recoverable: the offending sample is dropped and no state is touched.
//! Calibration errors clear the calibration buffer and let the caller retry.
//! Configuration errors ([`ProcessingError::SingularExtinctionMatrix`],
//! [`ProcessingError::InvalidConfiguration`]) prevent the pipeline from starting.

use thiserror::Error;

/// Errors raised by the fNIRS processing core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessingError {
    /// The raw vector has an unexpected length or contains a non-positive value
    #[error("Malformed raw sample: length {length}, minimum value {min_value}")]
    MalformedSample { length: usize, min_value: f64 },

    /// `finish` was called before enough samples were collected
    #[error("Calibration failed: {collected} samples collected, {required} required")]
    CalibrationInsufficientData { collected: usize, required: usize },

    /// The calibration buffer does not hold a usable raw matrix
    #[error("Calibration failed: {reason}")]
    CalibrationShapeInvalid { reason: String },

    /// A calibration operation was requested while no calibration is running
    #[error("No calibration in progress")]
    CalibrationNotActive,

    /// The extinction-coefficient matrix cannot be inverted
    #[error("Extinction coefficient matrix is singular (determinant {determinant})")]
    SingularExtinctionMatrix { determinant: f64 },

    /// The sample rate is not a positive finite number
    #[error("Invalid sample rate: {rate} Hz")]
    InvalidSampleRate { rate: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl ProcessingError {
    /// Build a [`ProcessingError::MalformedSample`] from the offending vector
    pub fn malformed(length: usize, values: &[f64]) -> Self {
        let min_value = values
            .iter()
            .copied()
            .fold(None, |acc: Option<f64>, v| match acc {
                Some(m) if m <= v => Some(m),
                _ => Some(v),
            })
            .unwrap_or(f64::NAN);
        Self::MalformedSample { length, min_value }
    }

    /// Whether the error ends the session rather than a single sample
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SingularExtinctionMatrix { .. } | Self::InvalidConfiguration(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_reports_minimum() {
        let err = ProcessingError::malformed(3, &[4.0, -1.0, 2.0]);
        assert_eq!(
            err,
            ProcessingError::MalformedSample {
                length: 3,
                min_value: -1.0
            }
        );
    }

    #[test]
    fn test_malformed_empty_vector() {
        match ProcessingError::malformed(0, &[]) {
            ProcessingError::MalformedSample { length, min_value } => {
                assert_eq!(length, 0);
                assert!(min_value.is_nan());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_fatality() {
        assert!(ProcessingError::SingularExtinctionMatrix { determinant: 0.0 }.is_fatal());
        assert!(!ProcessingError::CalibrationNotActive.is_fatal());
    }
}
