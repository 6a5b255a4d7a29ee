// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).
//!
//! Spectroscopic conversion module
//!
//! This module turns optical density changes measured at two near-infrared
//! wavelengths into hemoglobin concentration changes.

pub mod mbll;

pub use mbll::{Hemoglobin, MbllConverter};

use crate::config::MbllConfig;
use crate::error::ProcessingError;

/// Create an MBLL converter, failing on an invalid extinction table
pub fn create_mbll_converter(config: &MbllConfig) -> Result<MbllConverter, ProcessingError> {
    MbllConverter::new(config)
}
