// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Signal quality configuration

use serde::{Deserialize, Serialize};

/// Settings for the rolling per-channel signal quality estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Attach quality tags to processed samples
    pub enabled: bool,
    /// Length of the rolling estimation window in seconds
    pub window_seconds: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_seconds: 10.0,
        }
    }
}
