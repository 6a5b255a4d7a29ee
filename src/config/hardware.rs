// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Hardware placeholder constants
//!
//! Some exports fill inactive optode pairs, and a disconnected or saturated
//! device status, with fixed placeholder values instead of real readings.

use serde::{Deserialize, Serialize};

/// Placeholder values emitted by the sensor for inactive or invalid data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareConfig {
    /// High placeholder constant
    pub placeholder_high: f64,
    /// Low placeholder constant
    pub placeholder_low: f64,
    /// Absolute tolerance used when comparing a value to a placeholder
    pub placeholder_tolerance: f64,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            placeholder_high: 4.81625,
            placeholder_low: 0.02025,
            placeholder_tolerance: 0.02,
        }
    }
}

impl HardwareConfig {
    /// Whether `value` sits within tolerance of either placeholder constant
    pub fn is_placeholder(&self, value: f64) -> bool {
        (value - self.placeholder_high).abs() < self.placeholder_tolerance
            || (value - self.placeholder_low).abs() < self.placeholder_tolerance
    }
}
