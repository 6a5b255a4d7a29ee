// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Active channel-pair discovery
//!
//! A raw vector holds contiguous wavelength pairs `(0,1), (2,3), ...`. With
//! 16 columns every pair is a physical channel. With 32 columns the device
//! reports two receiver banks of 8 pairs, of which only 4 per bank carry
//! light; the mapper picks them from the variance of the calibration window.

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::config::{CalibrationConfig, HardwareConfig};
use crate::error::ProcessingError;
use crate::CHANNEL_COUNT;

/// Width of one receiver bank (8 pairs x 2 wavelengths)
pub const BANK_WIDTH: usize = 16;

/// Width of the canonical mapped vector
pub const MAPPED_WIDTH: usize = CHANNEL_COUNT * 2;

/// Indices of the two wavelength readings of one physical channel.
///
/// `first` and `second` follow the configured incoming wavelength order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelPair {
    pub first: usize,
    pub second: usize,
}

impl ChannelPair {
    fn contiguous(pair_index: usize) -> Self {
        Self {
            first: 2 * pair_index,
            second: 2 * pair_index + 1,
        }
    }
}

/// The 8 channel pairs selected for a session, and the raw width they index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMap {
    pairs: Vec<ChannelPair>,
    raw_width: usize,
}

impl ChannelMap {
    /// Selected pairs, in channel order
    pub fn pairs(&self) -> &[ChannelPair] {
        &self.pairs
    }

    /// Raw vector width this map applies to
    pub fn raw_width(&self) -> usize {
        self.raw_width
    }

    /// Default map used when no calibration selected the pairs.
    ///
    /// 16 columns map one-to-one, 32 columns take the first four pairs of
    /// each receiver bank.
    pub fn static_layout(raw_width: usize) -> Option<Self> {
        let pairs = match raw_width {
            BANK_WIDTH => (0..CHANNEL_COUNT).map(ChannelPair::contiguous).collect(),
            w if w == 2 * BANK_WIDTH => (0..4)
                .chain(8..12)
                .map(ChannelPair::contiguous)
                .collect(),
            _ => return None,
        };
        Some(Self { pairs, raw_width })
    }

    /// Map a raw vector to `[a_1, b_1, ..., a_8, b_8]`, clamping every value
    /// to at least `min_positive`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::MalformedSample`] when the vector width
    /// differs from the width the map was built for.
    pub fn map(&self, raw: &[f64], min_positive: f64) -> Result<Vec<f64>, ProcessingError> {
        if raw.len() != self.raw_width {
            return Err(ProcessingError::malformed(raw.len(), raw));
        }
        let mut out = Vec::with_capacity(self.pairs.len() * 2);
        for pair in &self.pairs {
            out.push(raw[pair.first].max(min_positive));
            out.push(raw[pair.second].max(min_positive));
        }
        Ok(out)
    }

    /// Map a raw vector without clamping (optical densities may be negative)
    pub fn select(&self, raw: &[f64]) -> Result<Vec<f64>, ProcessingError> {
        self.map(raw, f64::NEG_INFINITY)
    }
}

/// Scores candidate pairs over a calibration window and selects the active ones
#[derive(Debug, Clone)]
pub struct ChannelPairMapper {
    variance_threshold: f64,
    hardware: HardwareConfig,
}

impl ChannelPairMapper {
    pub fn new(calibration: &CalibrationConfig, hardware: &HardwareConfig) -> Self {
        Self {
            variance_threshold: calibration.pair_variance_threshold,
            hardware: hardware.clone(),
        }
    }

    fn column_mean(column: &ArrayView1<f64>) -> f64 {
        column.mean().unwrap_or(0.0)
    }

    /// Activity score of a pair: summed population variance of both columns,
    /// or zero when both column means sit on a placeholder constant.
    pub fn score_pair(&self, matrix: &Array2<f64>, pair: ChannelPair) -> f64 {
        let a = matrix.column(pair.first);
        let b = matrix.column(pair.second);

        if self.hardware.is_placeholder(Self::column_mean(&a))
            && self.hardware.is_placeholder(Self::column_mean(&b))
        {
            return 0.0;
        }

        a.var(0.0) + b.var(0.0)
    }

    /// Pick `required` pairs among `candidates`.
    ///
    /// Pairs above the variance threshold win in index order; when too few
    /// are active the candidates are ranked by score (stable, so ties keep
    /// index order). The result is returned in index order, also after a
    /// rank fallback: output channel `n` is the `n`-th selected optode
    /// position on the headset, not the `n`-th strongest pair.
    fn select(
        &self,
        matrix: &Array2<f64>,
        candidates: &[ChannelPair],
        required: usize,
    ) -> Vec<ChannelPair> {
        let scored: Vec<(ChannelPair, f64)> = candidates
            .iter()
            .map(|&pair| (pair, self.score_pair(matrix, pair)))
            .collect();

        let active: Vec<ChannelPair> = scored
            .iter()
            .filter(|(_, score)| *score > self.variance_threshold)
            .map(|(pair, _)| *pair)
            .collect();

        let mut selected: Vec<ChannelPair> = if active.len() >= required {
            active.into_iter().take(required).collect()
        } else {
            log::debug!(
                "Only {} active pairs out of {} required, selecting by rank",
                active.len(),
                required
            );
            let mut ranked = scored;
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
            ranked.into_iter().take(required).map(|(pair, _)| pair).collect()
        };

        selected.sort_by_key(|pair| pair.first);
        selected
    }

    /// Discover the 8 channel pairs of a calibration matrix
    /// (rows = samples, columns = raw indices).
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::CalibrationShapeInvalid`] for an empty
    /// matrix or a width other than 16 or 32.
    pub fn detect(&self, matrix: &Array2<f64>) -> Result<ChannelMap, ProcessingError> {
        if matrix.nrows() == 0 {
            return Err(ProcessingError::CalibrationShapeInvalid {
                reason: "calibration matrix has no rows".to_string(),
            });
        }

        let raw_width = matrix.ncols();
        let pairs = match raw_width {
            BANK_WIDTH => {
                let candidates: Vec<ChannelPair> =
                    (0..CHANNEL_COUNT).map(ChannelPair::contiguous).collect();
                self.select(matrix, &candidates, CHANNEL_COUNT)
            }
            w if w == 2 * BANK_WIDTH => {
                let per_bank = CHANNEL_COUNT / 2;
                let bank_pairs = BANK_WIDTH / 2;
                let mut pairs = Vec::with_capacity(CHANNEL_COUNT);
                for bank in 0..2 {
                    let candidates: Vec<ChannelPair> = (bank * bank_pairs
                        ..(bank + 1) * bank_pairs)
                        .map(ChannelPair::contiguous)
                        .collect();
                    pairs.extend(self.select(matrix, &candidates, per_bank));
                }
                pairs
            }
            other => {
                return Err(ProcessingError::CalibrationShapeInvalid {
                    reason: format!("cannot discover channel pairs in {} columns", other),
                })
            }
        };

        Ok(ChannelMap { pairs, raw_width })
    }
}
