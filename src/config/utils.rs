// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::debug;

use super::{Config, CONFIG_SCHEMA};
use crate::spectral::MbllConverter;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./rust_fnirs --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        anyhow::bail!("{} must be a positive number, got {}", name, value);
    }
    Ok(())
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **Raw lengths**: at least one allowed length, every length even and non-zero,
///   trailing-field widths among the allowed lengths
/// - **Rates and durations**: positive and finite; the calibration duration must
///   exceed its safety margin and the alert duration must fit in the history
/// - **MBLL**: positive DPF and distance, distinct wavelengths, and an
///   invertible extinction matrix
/// - **Mode policies**: `min_alert_channels` between 1 and 8 and a
///   non-negative `quality_std_lower_bound` for both modes
/// - **Worker**: non-zero queue capacities
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    let acquisition = &config.acquisition;
    ensure_positive("acquisition.sample_rate_hz", acquisition.sample_rate_hz)?;
    if acquisition.allowed_raw_lengths.is_empty() {
        anyhow::bail!("acquisition.allowed_raw_lengths must not be empty");
    }
    for &length in &acquisition.allowed_raw_lengths {
        if length == 0 || length % 2 != 0 {
            anyhow::bail!(
                "Invalid raw length {}: lengths must be even (2 wavelengths per channel)",
                length
            );
        }
    }
    for length in &acquisition.trailing_field_widths {
        if !acquisition.allowed_raw_lengths.contains(length) {
            anyhow::bail!(
                "acquisition.trailing_field_widths contains {} which is not an allowed raw length",
                length
            );
        }
    }

    ensure_positive(
        "hardware.placeholder_tolerance",
        config.hardware.placeholder_tolerance,
    )?;

    let calibration = &config.calibration;
    ensure_positive("calibration.duration_seconds", calibration.duration_seconds)?;
    ensure_positive("calibration.min_positive", calibration.min_positive)?;
    if calibration.safety_margin_seconds < 0.0 {
        anyhow::bail!("calibration.safety_margin_seconds must not be negative");
    }
    if calibration.duration_seconds <= calibration.safety_margin_seconds {
        anyhow::bail!(
            "Calibration duration ({} s) must exceed its safety margin ({} s)",
            calibration.duration_seconds,
            calibration.safety_margin_seconds
        );
    }

    ensure_positive("mbll.dpf", config.mbll.dpf)?;
    ensure_positive(
        "mbll.interoptode_distance_cm",
        config.mbll.interoptode_distance_cm,
    )?;
    if config.mbll.wavelength_order[0] == config.mbll.wavelength_order[1] {
        anyhow::bail!("mbll.wavelength_order must name two different wavelengths");
    }
    MbllConverter::new(&config.mbll).context("Invalid extinction coefficients")?;

    ensure_positive("quality.window_seconds", config.quality.window_seconds)?;

    let alert = &config.alert;
    ensure_positive("alert.duration_seconds", alert.duration_seconds)?;
    ensure_positive("alert.history_seconds", alert.history_seconds)?;
    if alert.duration_seconds > alert.history_seconds {
        anyhow::bail!(
            "Alert duration ({} s) exceeds the alert history ({} s)",
            alert.duration_seconds,
            alert.history_seconds
        );
    }

    for (name, mode) in [
        ("baseline_ratio", &config.processing.baseline_ratio),
        ("optical_density", &config.processing.optical_density),
    ] {
        ensure_positive(&format!("processing.{}.unit_scale", name), mode.unit_scale)?;
        if !(1..=crate::CHANNEL_COUNT).contains(&mode.min_alert_channels) {
            anyhow::bail!(
                "processing.{}.min_alert_channels must be between 1 and {}, got {}",
                name,
                crate::CHANNEL_COUNT,
                mode.min_alert_channels
            );
        }
        let bound = mode.quality_std_lower_bound;
        if !bound.is_finite() || bound < 0.0 {
            anyhow::bail!(
                "processing.{}.quality_std_lower_bound must be a non-negative number, got {}",
                name,
                bound
            );
        }
    }

    if config.worker.queue_capacity == 0 || config.worker.event_capacity == 0 {
        anyhow::bail!("Worker queue capacities must be greater than zero");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtinctionCoefficients, Wavelength};

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_specific_rules(&Config::default()).is_ok());
    }

    #[test]
    fn test_odd_raw_length_rejected() {
        let mut config = Config::default();
        config.acquisition.allowed_raw_lengths = vec![16, 33];
        let err = validate_specific_rules(&config).unwrap_err();
        assert!(err.to_string().contains("33"));
    }

    #[test]
    fn test_calibration_shorter_than_margin_rejected() {
        let mut config = Config::default();
        config.calibration.duration_seconds = 2.0;
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn test_singular_extinction_rejected() {
        let mut config = Config::default();
        let row = ExtinctionCoefficients {
            o2hb: 0.2,
            hhb: 0.4,
        };
        config.mbll.extinction.nm760 = row;
        config.mbll.extinction.nm850 = row;
        let err = validate_specific_rules(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("singular"));
    }

    #[test]
    fn test_duplicate_wavelengths_rejected() {
        let mut config = Config::default();
        config.mbll.wavelength_order = [Wavelength::Nm760, Wavelength::Nm760];
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn test_alert_policy_bounds() {
        let mut config = Config::default();
        config.processing.baseline_ratio.min_alert_channels = 0;
        assert!(validate_specific_rules(&config).is_err());

        let mut config = Config::default();
        config.processing.optical_density.min_alert_channels = 9;
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn test_alert_duration_must_fit_history() {
        let mut config = Config::default();
        config.alert.duration_seconds = 12.0;
        assert!(validate_specific_rules(&config).is_err());
    }
}
