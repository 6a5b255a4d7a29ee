// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Pipeline output types

use serde::{Deserialize, Serialize};

use crate::preprocessing::ChannelMap;

/// Per-channel signal quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTag {
    Ok,
    Degraded,
}

/// Sustained cognitive load state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    #[default]
    Nominal,
    Load,
}

impl std::fmt::Display for AlertState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nominal => write!(f, "nominal"),
            Self::Load => write!(f, "load"),
        }
    }
}

/// Reference used to compute optical density changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum BaselineKind {
    /// Mean mapped intensities of the calibration window, `ΔOD = -ln(x / b)`
    Ratio(Vec<f64>),
    /// First optical-density sample of the session, `ΔOD = x - b`
    Reference(Vec<f64>),
}

impl BaselineKind {
    pub fn values(&self) -> &[f64] {
        match self {
            Self::Ratio(values) | Self::Reference(values) => values,
        }
    }
}

/// Result of one run-mode sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedSample {
    /// Index of this sample among the processed samples of the session
    pub sequence: u64,
    /// ΔO2Hb per channel
    pub o2hb: Vec<f64>,
    /// ΔHHb per channel
    pub hhb: Vec<f64>,
    /// Per-channel quality, `None` when quality estimation is disabled
    pub quality: Option<Vec<QualityTag>>,
    /// Alert state, `None` when alerting is disabled
    pub alert: Option<AlertState>,
    /// Event marker carried by the raw sample
    pub marker: Option<f64>,
    /// Device status carried by the raw sample
    pub status: Option<f64>,
}

/// What the pipeline did with a sample
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Processed(ProcessedSample),
    /// Ratio mode without a baseline: nothing to report yet
    NotCalibrated,
    /// The sample went into the calibration buffer
    Calibrating,
}

impl ProcessOutcome {
    pub fn processed(&self) -> Option<&ProcessedSample> {
        match self {
            Self::Processed(sample) => Some(sample),
            _ => None,
        }
    }
}

/// Summary of a calibration attempt, as published to listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub success: bool,
    pub baseline: Option<Vec<f64>>,
    pub channel_map: Option<ChannelMap>,
    pub error: Option<String>,
}
