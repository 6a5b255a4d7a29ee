// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the fNIRS monitor
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema before being deserialized.
//!
//! ## Configuration Structure
//!
//! - `acquisition`: Sample rate and accepted raw vector lengths
//! - `hardware`: Placeholder constants emitted for inactive pairs
//! - `calibration`: Calibration window and pair discovery thresholds
//! - `mbll`: Modified Beer-Lambert Law constants
//! - `quality`: Rolling signal quality estimate
//! - `alert`: Sustained-load alert rules
//! - `processing`: Processing mode and per-mode policy
//! - `worker`: Queue sizes of the background pipeline worker
//!
//! ## Usage
//!
//! ```no_run
//! use rust_fnirs::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some(25.0),  // Sample rate
//!     None,        // Processing mode
//!     Some(0.01),  // Alert threshold
//!     Some(5.0),   // Alert duration
//!     None,        // Calibration duration
//! );
//!
//! let pipeline_config = config.pipeline_config();
//! println!("Sample rate: {} Hz", pipeline_config.acquisition.sample_rate_hz);
//! ```

pub mod acquisition;
pub mod alert;
pub mod calibration;
pub mod hardware;
pub mod mbll;
pub mod processing;
pub mod quality;
pub mod utils;
pub mod worker;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

// Re-export all types for public API
pub use acquisition::{AcquisitionConfig, TrailingField};
pub use alert::AlertConfig;
pub use calibration::CalibrationConfig;
pub use hardware::HardwareConfig;
pub use mbll::{ExtinctionCoefficients, ExtinctionTable, MbllConfig, Wavelength};
pub use processing::{ModeConfig, ProcessingConfig, ProcessingMode};
pub use quality::QualityConfig;
pub use utils::output_config_schema;
pub use worker::WorkerConfig;

/// Embedded JSON schema used to validate configuration files
pub(crate) const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Root configuration structure.
///
/// Every section falls back to its defaults when omitted, so a minimal
/// configuration file only needs the values that differ from them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Incoming stream description
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Hardware placeholder constants
    #[serde(default)]
    pub hardware: HardwareConfig,

    /// Calibration settings
    #[serde(default)]
    pub calibration: CalibrationConfig,

    /// MBLL constants
    #[serde(default)]
    pub mbll: MbllConfig,

    /// Signal quality estimation
    #[serde(default)]
    pub quality: QualityConfig,

    /// Alert rules
    #[serde(default)]
    pub alert: AlertConfig,

    /// Processing mode selection
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Background worker sizing
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Runtime configuration held by a [`crate::processing::DataProcessingPipeline`].
///
/// This is the subset of [`Config`] the signal-processing core needs; it is
/// owned by the pipeline instance so that no global state is involved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    pub acquisition: AcquisitionConfig,
    pub hardware: HardwareConfig,
    pub calibration: CalibrationConfig,
    pub mbll: MbllConfig,
    pub quality: QualityConfig,
    pub alert: AlertConfig,
    pub processing: ProcessingConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                std::fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with default values. A file that fails
    /// schema validation, deserialization or the specific rules produces an
    /// error and a `*.sample.yaml` file with defaults next to it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Validate the configuration against the rules the schema cannot express
    pub fn validate(&self) -> Result<()> {
        utils::validate_specific_rules(self)
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only explicitly provided values override the loaded configuration.
    ///
    /// # Parameters
    ///
    /// * `sample_rate` - Nominal sample rate in Hz
    /// * `mode` - Processing mode
    /// * `threshold` - Alert threshold (ΔμM)
    /// * `alert_duration` - Seconds the alert condition must hold
    /// * `calibration_duration` - Calibration window in seconds
    pub fn apply_args(
        &mut self,
        sample_rate: Option<f64>,
        mode: Option<ProcessingMode>,
        threshold: Option<f64>,
        alert_duration: Option<f64>,
        calibration_duration: Option<f64>,
    ) {
        if let Some(rate) = sample_rate {
            debug!("Overriding sample rate from command line: {}", rate);
            self.acquisition.sample_rate_hz = rate;
        }
        if let Some(mode) = mode {
            debug!("Overriding processing mode from command line: {}", mode);
            self.processing.mode = mode;
        }
        if let Some(threshold) = threshold {
            debug!("Overriding alert threshold from command line: {}", threshold);
            self.alert.threshold = threshold;
        }
        if let Some(duration) = alert_duration {
            debug!("Overriding alert duration from command line: {}", duration);
            self.alert.duration_seconds = duration;
            if self.alert.history_seconds < duration {
                self.alert.history_seconds = duration;
            }
        }
        if let Some(duration) = calibration_duration {
            debug!(
                "Overriding calibration duration from command line: {}",
                duration
            );
            self.calibration.duration_seconds = duration;
        }
    }

    /// Runtime configuration for the processing pipeline
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            acquisition: self.acquisition.clone(),
            hardware: self.hardware.clone(),
            calibration: self.calibration.clone(),
            mbll: self.mbll.clone(),
            quality: self.quality.clone(),
            alert: self.alert.clone(),
            processing: self.processing.clone(),
        }
    }
}
