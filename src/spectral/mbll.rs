// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modified Beer-Lambert Law conversion
//!
//! Converts optical density changes at two wavelengths into oxy- and
//! deoxy-hemoglobin concentration changes:
//!
//! ```text
//! | ΔOD_a |            | ε_O2Hb(a)  ε_HHb(a) |   | ΔO2Hb |
//! |       | = DPF · d · |                     | · |       |
//! | ΔOD_b |            | ε_O2Hb(b)  ε_HHb(b) |   | ΔHHb  |
//! ```
//!
//! where `a` and `b` follow the incoming wavelength order of each pair.
//! The extinction matrix is inverted once when the converter is built.

use serde::{Deserialize, Serialize};

use crate::config::MbllConfig;
use crate::error::ProcessingError;

/// Determinant magnitude below which the extinction matrix is treated as singular
const SINGULAR_EPSILON: f64 = 1e-12;

/// Hemoglobin concentration changes, one value per channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hemoglobin {
    /// ΔO2Hb per channel
    pub o2hb: Vec<f64>,
    /// ΔHHb per channel
    pub hhb: Vec<f64>,
}

/// MBLL converter holding the pre-inverted extinction matrix
#[derive(Debug, Clone, PartialEq)]
pub struct MbllConverter {
    /// Inverse of the extinction matrix, rows are [O2Hb, HHb]
    inverse: [[f64; 2]; 2],
    /// `DPF x interoptode distance` in cm
    path_length_cm: f64,
}

impl MbllConverter {
    /// Build a converter from the MBLL configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::SingularExtinctionMatrix`] if the 2x2
    /// extinction matrix cannot be inverted, and
    /// [`ProcessingError::InvalidConfiguration`] for a non-positive path length.
    pub fn new(config: &MbllConfig) -> Result<Self, ProcessingError> {
        let path_length_cm = config.path_length_cm();
        if !path_length_cm.is_finite() || path_length_cm <= 0.0 {
            return Err(ProcessingError::InvalidConfiguration(format!(
                "optical path length must be positive, got {} cm",
                path_length_cm
            )));
        }

        let first = config.extinction.get(config.wavelength_order[0]);
        let second = config.extinction.get(config.wavelength_order[1]);

        let (a11, a12) = (first.o2hb, first.hhb);
        let (a21, a22) = (second.o2hb, second.hhb);
        let det = a11 * a22 - a12 * a21;

        if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
            return Err(ProcessingError::SingularExtinctionMatrix { determinant: det });
        }

        let inverse = [[a22 / det, -a12 / det], [-a21 / det, a11 / det]];

        Ok(Self {
            inverse,
            path_length_cm,
        })
    }

    /// The inverted extinction matrix
    pub fn inverse_matrix(&self) -> [[f64; 2]; 2] {
        self.inverse
    }

    /// Convert a channel-major ΔOD vector into hemoglobin changes.
    ///
    /// `delta_od` holds `2n` values ordered `[ch1_a, ch1_b, ch2_a, ...]`.
    /// The result is scaled by `unit_scale` (1000 converts mM to μM).
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::MalformedSample`] for an odd-length vector.
    pub fn convert(&self, delta_od: &[f64], unit_scale: f64) -> Result<Hemoglobin, ProcessingError> {
        if delta_od.len() % 2 != 0 {
            return Err(ProcessingError::malformed(delta_od.len(), delta_od));
        }

        let scale = unit_scale / self.path_length_cm;
        let channels = delta_od.len() / 2;
        let mut o2hb = Vec::with_capacity(channels);
        let mut hhb = Vec::with_capacity(channels);

        for pair in delta_od.chunks_exact(2) {
            let (od_a, od_b) = (pair[0], pair[1]);
            o2hb.push((self.inverse[0][0] * od_a + self.inverse[0][1] * od_b) * scale);
            hhb.push((self.inverse[1][0] * od_a + self.inverse[1][1] * od_b) * scale);
        }

        Ok(Hemoglobin { o2hb, hhb })
    }
}
