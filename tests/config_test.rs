// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use rust_fnirs::config::{
    AlertConfig, Config, ProcessingMode, TrailingField, Wavelength,
};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_and_save() -> Result<()> {
    // Create a temporary directory
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Create a custom config
    let mut config = Config::default();
    config.acquisition.sample_rate_hz = 25.0;
    config.acquisition.single_trailing_field = TrailingField::Status;
    config.processing.mode = ProcessingMode::OpticalDensity;
    config.alert = AlertConfig {
        enabled: true,
        threshold: 0.01,
        duration_seconds: 5.0,
        history_seconds: 12.0,
    };

    // Save config to file
    config.save_to_file(&config_path)?;

    // Load config from file
    let loaded_config = Config::from_file(&config_path)?;
    assert_eq!(loaded_config, config);

    // Test loading default config for non-existent file
    let non_existent_path = temp_dir.path().join("non_existent.yaml");
    let default_config = Config::from_file(&non_existent_path)?;

    // Verify default config was created
    assert!(non_existent_path.exists());
    assert_eq!(default_config, Config::default());
    assert_eq!(default_config.acquisition.sample_rate_hz, 10.0);
    assert_eq!(default_config.acquisition.allowed_raw_lengths, vec![16, 32]);
    assert_eq!(
        default_config.mbll.wavelength_order,
        [Wavelength::Nm850, Wavelength::Nm760]
    );

    Ok(())
}

#[test]
fn test_partial_config_uses_defaults() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("partial.yaml");
    fs::write(
        &config_path,
        r#"
alert:
  threshold: 0.02
processing:
  mode: optical_density
"#,
    )?;

    let config = Config::from_file(&config_path)?;
    assert_eq!(config.alert.threshold, 0.02);
    assert_eq!(config.alert.duration_seconds, 3.0);
    assert_eq!(config.processing.mode, ProcessingMode::OpticalDensity);
    assert_eq!(config.processing.active().unit_scale, 1000.0);
    assert_eq!(config.processing.active().min_alert_channels, 1);
    assert_eq!(config.hardware.placeholder_high, 4.81625);
    assert_eq!(config.mbll.dpf, 6.0);

    Ok(())
}

#[test]
fn test_apply_args() {
    let mut config = Config::default();

    // Nothing provided: nothing changes
    config.apply_args(None, None, None, None, None);
    assert_eq!(config, Config::default());

    config.apply_args(
        Some(50.0),
        Some(ProcessingMode::OpticalDensity),
        Some(0.008),
        Some(15.0),
        Some(20.0),
    );
    assert_eq!(config.acquisition.sample_rate_hz, 50.0);
    assert_eq!(config.processing.mode, ProcessingMode::OpticalDensity);
    assert_eq!(config.alert.threshold, 0.008);
    assert_eq!(config.alert.duration_seconds, 15.0);
    // The history grows to hold the longer alert window
    assert_eq!(config.alert.history_seconds, 15.0);
    assert_eq!(config.calibration.duration_seconds, 20.0);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation() {
    assert!(Config::default().validate().is_ok());

    let mut config = Config::default();
    config.acquisition.sample_rate_hz = 0.0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.mbll.dpf = -1.0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.worker.queue_capacity = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_pipeline_config_follows_config() {
    let mut config = Config::default();
    config.calibration.duration_seconds = 30.0;
    config.quality.enabled = false;

    let pipeline_config = config.pipeline_config();
    assert_eq!(pipeline_config.calibration.duration_seconds, 30.0);
    assert!(!pipeline_config.quality.enabled);
    assert_eq!(pipeline_config.mbll, config.mbll);
}

#[test]
fn test_processing_mode_parsing() {
    assert_eq!(
        "optical_density".parse::<ProcessingMode>().unwrap(),
        ProcessingMode::OpticalDensity
    );
    assert_eq!(
        "ratio".parse::<ProcessingMode>().unwrap(),
        ProcessingMode::BaselineRatio
    );
    assert!("fft".parse::<ProcessingMode>().is_err());
    assert_eq!(ProcessingMode::BaselineRatio.to_string(), "baseline_ratio");
}
