// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sustained-load alert configuration

use serde::{Deserialize, Serialize};

/// Alert rules for the sustained cognitive-load detector.
///
/// An alert is raised when ΔO2Hb stays above `threshold` for
/// `duration_seconds` on enough channels. The history ring keeps
/// `history_seconds` of flags, which bounds the usable duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Attach an alert state to processed samples
    pub enabled: bool,
    /// ΔO2Hb threshold (ΔμM)
    pub threshold: f64,
    /// How long the condition must hold, in seconds
    pub duration_seconds: f64,
    /// Capacity of the flag history, in seconds
    pub history_seconds: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.004,
            duration_seconds: 3.0,
            history_seconds: 10.0,
        }
    }
}
