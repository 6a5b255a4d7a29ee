// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Raw signal preprocessing
//!
//! This module validates raw optode samples, discovers which wavelength
//! pairs carry light and establishes the calibration baseline.

pub mod calibration;
pub mod guard;
pub mod mapper;
#[cfg(test)]
mod calibration_test;

pub use calibration::{BaselineCalibrator, Calibration, CalibrationState};
pub use guard::{RawSampleGuard, ValidatedSample};
pub use mapper::{ChannelMap, ChannelPair, ChannelPairMapper};

use crate::config::{AcquisitionConfig, CalibrationConfig, HardwareConfig};

/// Create a raw sample guard for the given acquisition settings
pub fn create_sample_guard(config: &AcquisitionConfig) -> RawSampleGuard {
    RawSampleGuard::new(config)
}

/// Create a channel pair mapper
pub fn create_pair_mapper(
    calibration: &CalibrationConfig,
    hardware: &HardwareConfig,
) -> ChannelPairMapper {
    ChannelPairMapper::new(calibration, hardware)
}
