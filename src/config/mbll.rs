// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modified Beer-Lambert Law configuration
//!
//! Physical constants used to convert optical density changes into
//! hemoglobin concentration changes.

use serde::{Deserialize, Serialize};

/// Near-infrared wavelengths emitted by the optodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wavelength {
    /// 760 nm, more sensitive to deoxy-hemoglobin
    Nm760,
    /// 850 nm, more sensitive to oxy-hemoglobin
    Nm850,
}

/// Extinction coefficients of both hemoglobin species at one wavelength
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtinctionCoefficients {
    /// Oxy-hemoglobin
    pub o2hb: f64,
    /// Deoxy-hemoglobin
    pub hhb: f64,
}

/// Extinction coefficient table keyed by wavelength
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtinctionTable {
    pub nm760: ExtinctionCoefficients,
    pub nm850: ExtinctionCoefficients,
}

impl ExtinctionTable {
    /// Coefficients for `wavelength`
    pub fn get(&self, wavelength: Wavelength) -> ExtinctionCoefficients {
        match wavelength {
            Wavelength::Nm760 => self.nm760,
            Wavelength::Nm850 => self.nm850,
        }
    }
}

impl Default for ExtinctionTable {
    fn default() -> Self {
        Self {
            nm760: ExtinctionCoefficients {
                o2hb: 0.1555,
                hhb: 0.4178,
            },
            nm850: ExtinctionCoefficients {
                o2hb: 0.2465,
                hhb: 0.1833,
            },
        }
    }
}

/// Configuration for the MBLL conversion.
///
/// # Example
///
/// ```
/// use rust_fnirs::config::{MbllConfig, Wavelength};
///
/// let mbll = MbllConfig {
///     dpf: 6.0,
///     interoptode_distance_cm: 3.5,
///     wavelength_order: [Wavelength::Nm850, Wavelength::Nm760],
///     ..MbllConfig::default()
/// };
/// assert_eq!(mbll.path_length_cm(), 21.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MbllConfig {
    /// Differential path-length factor (unitless)
    pub dpf: f64,
    /// Source-detector distance in cm
    pub interoptode_distance_cm: f64,
    /// Order of the two wavelength readings inside each incoming pair
    pub wavelength_order: [Wavelength; 2],
    /// Extinction coefficients per wavelength and species
    pub extinction: ExtinctionTable,
}

impl Default for MbllConfig {
    fn default() -> Self {
        Self {
            dpf: 6.0,
            interoptode_distance_cm: 3.5,
            wavelength_order: [Wavelength::Nm850, Wavelength::Nm760],
            extinction: ExtinctionTable::default(),
        }
    }
}

impl MbllConfig {
    /// Effective optical path length `DPF x distance`
    pub fn path_length_cm(&self) -> f64 {
        self.dpf * self.interoptode_distance_cm
    }
}
