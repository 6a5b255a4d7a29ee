// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Utility module for common utilities used throughout the project

pub mod noise_generator;

pub use noise_generator::NoiseGenerator;

/// Number of samples covering `seconds` at `sample_rate`, never less than one
pub fn samples_for_duration(seconds: f64, sample_rate: f64) -> usize {
    let count = (seconds * sample_rate).floor();
    if count.is_finite() && count >= 1.0 {
        count as usize
    } else {
        1
    }
}
