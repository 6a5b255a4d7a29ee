// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Processing mode configuration
//!
//! The pipeline supports two physical conventions. `baseline_ratio` expects
//! raw light intensities and a calibration window, `optical_density` expects
//! optical densities and references the first sample of the session. The
//! flat-channel bound of the quality estimate is per mode since the two
//! conventions feed traces of very different magnitudes.

use serde::{Deserialize, Serialize};

/// Processing convention of the incoming data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// `ΔOD = -ln(sample / calibrated_mean)`
    #[default]
    BaselineRatio,
    /// `ΔOD = sample - first_sample`
    OpticalDensity,
}

impl std::fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BaselineRatio => write!(f, "baseline_ratio"),
            Self::OpticalDensity => write!(f, "optical_density"),
        }
    }
}

impl std::str::FromStr for ProcessingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baseline_ratio" | "ratio" => Ok(Self::BaselineRatio),
            "optical_density" | "od" => Ok(Self::OpticalDensity),
            other => Err(format!("unknown processing mode '{}'", other)),
        }
    }
}

/// Per-mode conversion and alert policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeConfig {
    /// Factor applied to the MBLL output (1000 converts mM to μM)
    pub unit_scale: f64,
    /// Number of channels that must sustain the alert condition simultaneously
    pub min_alert_channels: usize,
    /// Standard deviation below which a channel trace is considered flat,
    /// in the units of the incoming data
    pub quality_std_lower_bound: f64,
}

/// Configuration of the processing modes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Active mode
    #[serde(default)]
    pub mode: ProcessingMode,

    #[serde(default = "default_baseline_ratio")]
    pub baseline_ratio: ModeConfig,

    #[serde(default = "default_optical_density")]
    pub optical_density: ModeConfig,
}

fn default_baseline_ratio() -> ModeConfig {
    ModeConfig {
        unit_scale: 1.0,
        min_alert_channels: 2,
        quality_std_lower_bound: 2.0,
    }
}

fn default_optical_density() -> ModeConfig {
    ModeConfig {
        unit_scale: 1000.0,
        min_alert_channels: 1,
        quality_std_lower_bound: 0.001,
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            mode: ProcessingMode::default(),
            baseline_ratio: default_baseline_ratio(),
            optical_density: default_optical_density(),
        }
    }
}

impl ProcessingConfig {
    /// Settings of the active mode
    pub fn active(&self) -> &ModeConfig {
        match self.mode {
            ProcessingMode::BaselineRatio => &self.baseline_ratio,
            ProcessingMode::OpticalDensity => &self.optical_density,
        }
    }
}
