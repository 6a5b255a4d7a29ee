// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Baseline calibration configuration

use serde::{Deserialize, Serialize};

/// Configuration for baseline calibration and channel-pair discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Length of the calibration window in seconds
    #[serde(default = "default_duration_seconds")]
    pub duration_seconds: f64,

    /// Seconds of slack subtracted from the duration when checking that
    /// enough samples were collected
    #[serde(default = "default_safety_margin_seconds")]
    pub safety_margin_seconds: f64,

    /// Minimum summed variance for a wavelength pair to count as active
    #[serde(default = "default_pair_variance_threshold")]
    pub pair_variance_threshold: f64,

    /// Mapped intensities are clamped to this value before taking a logarithm
    #[serde(default = "default_min_positive")]
    pub min_positive: f64,
}

fn default_duration_seconds() -> f64 {
    10.0
}

fn default_safety_margin_seconds() -> f64 {
    2.0
}

fn default_pair_variance_threshold() -> f64 {
    1e-4
}

fn default_min_positive() -> f64 {
    1e-6
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            duration_seconds: default_duration_seconds(),
            safety_margin_seconds: default_safety_margin_seconds(),
            pair_variance_threshold: default_pair_variance_threshold(),
            min_positive: default_min_positive(),
        }
    }
}

impl CalibrationConfig {
    /// Minimum number of samples `finish` requires at the given sample rate.
    ///
    /// `floor(rate x (duration - safety_margin))`, never less than one.
    pub fn required_samples(&self, sample_rate_hz: f64) -> usize {
        let seconds = (self.duration_seconds - self.safety_margin_seconds).max(0.0);
        ((sample_rate_hz * seconds).floor() as usize).max(1)
    }
}
