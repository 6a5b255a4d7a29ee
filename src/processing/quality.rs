// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rolling signal quality estimation
//!
//! A channel whose first-wavelength intensity barely moves over the window
//! is most likely not coupled to the scalp. When the device reports a status
//! value, the status alone decides: a placeholder status degrades every
//! channel.

use dasp_ring_buffer::Fixed;

use super::result::QualityTag;
use crate::config::{HardwareConfig, QualityConfig};
use crate::utility::samples_for_duration;
use crate::CHANNEL_COUNT;

/// Population standard deviation, `0.0` for an empty trace
pub fn population_std(trace: &[f64]) -> f64 {
    if trace.is_empty() {
        return 0.0;
    }
    let n = trace.len() as f64;
    let mean = trace.iter().sum::<f64>() / n;
    let variance = trace.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Quality of one intensity trace: degraded when its std is below `std_lower_bound`
pub fn assess_trace(trace: &[f64], std_lower_bound: f64) -> QualityTag {
    if population_std(trace) < std_lower_bound {
        QualityTag::Degraded
    } else {
        QualityTag::Ok
    }
}

/// Keeps the first-wavelength history of every channel and grades it
#[derive(Debug, Clone)]
pub struct SignalQualityEstimator {
    config: QualityConfig,
    hardware: HardwareConfig,
    std_lower_bound: f64,
    history: Fixed<Vec<[f64; CHANNEL_COUNT]>>,
    filled: usize,
}

impl SignalQualityEstimator {
    /// `std_lower_bound` is the flat-trace bound of the active processing mode
    pub fn new(
        config: &QualityConfig,
        hardware: &HardwareConfig,
        std_lower_bound: f64,
        sample_rate: f64,
    ) -> Self {
        let capacity = samples_for_duration(config.window_seconds, sample_rate);
        Self {
            config: config.clone(),
            hardware: hardware.clone(),
            std_lower_bound,
            history: Fixed::from(vec![[0.0; CHANNEL_COUNT]; capacity]),
            filled: 0,
        }
    }

    /// Number of rows the window holds
    pub fn capacity(&self) -> usize {
        self.history.len()
    }

    /// Number of rows written since the last clear, capped at the capacity
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Append one mapped 16-wide row (the first wavelength of each pair is kept)
    pub fn push(&mut self, mapped: &[f64]) {
        let mut row = [0.0; CHANNEL_COUNT];
        for (slot, pair) in row.iter_mut().zip(mapped.chunks_exact(2)) {
            *slot = pair[0];
        }
        self.history.push(row);
        self.filled = (self.filled + 1).min(self.capacity());
    }

    /// Warm the window with calibration rows, oldest first
    pub fn seed(&mut self, rows: &[Vec<f64>]) {
        let skip = rows.len().saturating_sub(self.capacity());
        for row in &rows[skip..] {
            self.push(row);
        }
    }

    pub fn clear(&mut self) {
        let capacity = self.capacity();
        self.history = Fixed::from(vec![[0.0; CHANNEL_COUNT]; capacity]);
        self.filled = 0;
    }

    /// Reallocate the window for a new sample rate, discarding its contents
    pub fn resize(&mut self, sample_rate: f64) {
        let capacity = samples_for_duration(self.config.window_seconds, sample_rate);
        self.history = Fixed::from(vec![[0.0; CHANNEL_COUNT]; capacity]);
        self.filled = 0;
    }

    /// Grade every channel.
    ///
    /// With a status value the decision is status-driven, otherwise it uses
    /// the filled part of the window.
    pub fn assess(&self, status: Option<f64>) -> Vec<QualityTag> {
        if let Some(status) = status {
            let tag = if self.hardware.is_placeholder(status) {
                QualityTag::Degraded
            } else {
                QualityTag::Ok
            };
            return vec![tag; CHANNEL_COUNT];
        }

        let skip = self.history.len() - self.filled;
        let rows: Vec<&[f64; CHANNEL_COUNT]> = self.history.iter().skip(skip).collect();
        (0..CHANNEL_COUNT)
            .map(|channel| {
                let trace: Vec<f64> = rows.iter().map(|row| row[channel]).collect();
                assess_trace(&trace, self.std_lower_bound)
            })
            .collect()
    }
}
