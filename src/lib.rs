// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust fNIRS library
//!
//! This library turns raw near-infrared optode intensities into relative
//! hemoglobin concentration changes, grades signal quality and detects
//! sustained cognitive load.
//!
//! ```no_run
//! use rust_fnirs::config::Config;
//! use rust_fnirs::processing::{DataProcessingPipeline, ProcessOutcome};
//!
//! let config = Config::default();
//! let mut pipeline = DataProcessingPipeline::new(config.pipeline_config()).unwrap();
//!
//! pipeline.start_calibration();
//! for _ in 0..80 {
//!     pipeline.add_calibration_sample(&[100.0; 16]).unwrap();
//! }
//! pipeline.finish_calibration().unwrap();
//!
//! if let ProcessOutcome::Processed(sample) = pipeline.process(&[101.0; 16]).unwrap() {
//!     println!("ΔO2Hb: {:?}", sample.o2hb);
//! }
//! ```

pub mod acquisition;
pub mod config;
pub mod error;
pub mod preprocessing;
pub mod processing;
pub mod spectral;
pub mod utility;

pub use error::ProcessingError;

/// Number of physical optode channels
pub const CHANNEL_COUNT: usize = 8;

/// Number of wavelengths per channel
pub const WAVELENGTH_COUNT: usize = 2;
