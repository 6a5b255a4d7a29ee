// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sustained-threshold alert detection
//!
//! Every processed sample writes one row of per-channel flags
//! (`ΔO2Hb > threshold`) into a ring buffer. The detector reports
//! [`AlertState::Load`] when at least `min_channels` channels are each
//! flagged on every row of the trailing `duration_seconds` window. A channel
//! that drops below the threshold for one sample breaks its run even if
//! another channel takes over. Slots never written read as `false`, so no
//! alert fires before the window has filled.

use dasp_ring_buffer::Fixed;

use super::result::AlertState;
use crate::config::AlertConfig;
use crate::utility::samples_for_duration;
use crate::CHANNEL_COUNT;

#[derive(Debug, Clone)]
pub struct AlertDetector {
    threshold: f64,
    duration_seconds: f64,
    history_seconds: f64,
    min_channels: usize,
    sample_rate: f64,
    history: Fixed<Vec<[bool; CHANNEL_COUNT]>>,
}

impl AlertDetector {
    pub fn new(config: &AlertConfig, min_channels: usize, sample_rate: f64) -> Self {
        let capacity = samples_for_duration(config.history_seconds, sample_rate);
        Self {
            threshold: config.threshold,
            duration_seconds: config.duration_seconds,
            history_seconds: config.history_seconds,
            min_channels,
            sample_rate,
            history: Fixed::from(vec![[false; CHANNEL_COUNT]; capacity]),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn capacity(&self) -> usize {
        self.history.len()
    }

    /// Rows the sustained condition is checked over
    pub fn window(&self) -> usize {
        samples_for_duration(self.duration_seconds, self.sample_rate).min(self.capacity())
    }

    /// Record the flags of one sample
    pub fn push(&mut self, o2hb: &[f64]) {
        let mut row = [false; CHANNEL_COUNT];
        for (flag, value) in row.iter_mut().zip(o2hb) {
            *flag = *value > self.threshold;
        }
        self.history.push(row);
    }

    /// State over the most recent window
    pub fn evaluate(&self) -> AlertState {
        let mut sustained = [true; CHANNEL_COUNT];
        let skip = self.capacity() - self.window();
        for row in self.history.iter().skip(skip) {
            for (all, flag) in sustained.iter_mut().zip(row) {
                *all &= *flag;
            }
        }

        if sustained.iter().filter(|all| **all).count() >= self.min_channels {
            AlertState::Load
        } else {
            AlertState::Nominal
        }
    }

    /// Push a sample and evaluate
    pub fn update(&mut self, o2hb: &[f64]) -> AlertState {
        self.push(o2hb);
        self.evaluate()
    }

    /// Forget every recorded flag
    pub fn clear(&mut self) {
        let capacity = self.capacity();
        self.history = Fixed::from(vec![[false; CHANNEL_COUNT]; capacity]);
    }

    /// Change threshold and duration. The new threshold applies from the
    /// next sample on; recorded flags are kept unless the history has to
    /// grow to fit the duration.
    pub fn set_rules(&mut self, threshold: f64, duration_seconds: f64) {
        self.threshold = threshold;
        self.duration_seconds = duration_seconds;
        if duration_seconds > self.history_seconds {
            self.history_seconds = duration_seconds;
            self.resize(self.sample_rate);
        }
    }

    /// Reallocate the history for a new sample rate
    pub fn resize(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        let capacity = samples_for_duration(self.history_seconds, sample_rate);
        self.history = Fixed::from(vec![[false; CHANNEL_COUNT]; capacity]);
    }
}
