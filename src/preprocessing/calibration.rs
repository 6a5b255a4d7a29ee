// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Baseline calibration
//!
//! The calibrator buffers validated raw samples while the subject rests,
//! then discovers the active channel pairs and averages the mapped window
//! into the per-column baseline used by the ratio processing mode.
//!
//! ```text
//!          start()             finish() ok
//! Idle ─────────────► Collecting ─────────────► Succeeded
//!  ▲                     │  │
//!  │      abort()        │  │   finish() error
//!  └─────────────────────┘  └─────────────────► Failed
//! ```

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use super::guard::RawSampleGuard;
use super::mapper::{ChannelMap, ChannelPairMapper};
use crate::config::{CalibrationConfig, PipelineConfig};
use crate::error::ProcessingError;
use crate::processing::quality::assess_trace;
use crate::processing::QualityTag;
use crate::utility::samples_for_duration;

/// Lifecycle of a calibration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationState {
    #[default]
    Idle,
    Collecting,
    Succeeded,
    Failed,
}

/// Result of a successful calibration
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    /// Column means of the mapped calibration window (16 values)
    pub baseline: Vec<f64>,
    /// Channel pairs discovered on the raw window
    pub channel_map: ChannelMap,
    /// The calibration window mapped to 16 columns, oldest first
    pub mapped_rows: Vec<Vec<f64>>,
}

/// Collects a calibration window and turns it into a baseline
#[derive(Debug, Clone)]
pub struct BaselineCalibrator {
    guard: RawSampleGuard,
    mapper: ChannelPairMapper,
    config: CalibrationConfig,
    std_lower_bound: f64,
    quality_window_seconds: f64,
    state: CalibrationState,
    buffer: Vec<Vec<f64>>,
    required: usize,
    quality_rows: usize,
}

impl BaselineCalibrator {
    pub fn new(config: &PipelineConfig) -> Self {
        let rate = config.acquisition.sample_rate_hz;
        Self {
            guard: RawSampleGuard::new(&config.acquisition),
            mapper: ChannelPairMapper::new(&config.calibration, &config.hardware),
            config: config.calibration.clone(),
            std_lower_bound: config.processing.active().quality_std_lower_bound,
            quality_window_seconds: config.quality.window_seconds,
            state: CalibrationState::Idle,
            buffer: Vec::new(),
            required: config.calibration.required_samples(rate),
            quality_rows: samples_for_duration(config.quality.window_seconds, rate),
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Number of samples buffered so far
    pub fn collected(&self) -> usize {
        self.buffer.len()
    }

    /// Number of samples `finish` requires at the current rate
    pub fn required_samples(&self) -> usize {
        self.required
    }

    /// Begin a new calibration run with an empty buffer
    pub fn start(&mut self) {
        log::info!(
            "Calibration started ({} samples required)",
            self.required
        );
        self.buffer.clear();
        self.state = CalibrationState::Collecting;
    }

    /// Validate a raw sample and buffer it while collecting.
    ///
    /// Outside of [`CalibrationState::Collecting`] the sample is validated
    /// and then ignored.
    pub fn add_sample(&mut self, raw: &[f64]) -> Result<(), ProcessingError> {
        let sample = self.guard.validate(raw)?;
        if self.state == CalibrationState::Collecting {
            self.buffer.push(sample.values);
        }
        Ok(())
    }

    /// Live quality of the partial buffer, one tag per raw pair.
    ///
    /// Uses the first-wavelength column of each pair over the most recent
    /// quality window. Empty when nothing is buffered.
    pub fn estimate_quality(&self) -> Vec<QualityTag> {
        if self.state != CalibrationState::Collecting {
            return Vec::new();
        }
        let Some(last) = self.buffer.last() else {
            return Vec::new();
        };

        let width = last.len();
        let window: Vec<&Vec<f64>> = self
            .buffer
            .iter()
            .rev()
            .take(self.quality_rows)
            .filter(|row| row.len() == width)
            .collect();

        (0..width / 2)
            .map(|pair| {
                let trace: Vec<f64> = window.iter().map(|row| row[2 * pair]).collect();
                assess_trace(&trace, self.std_lower_bound)
            })
            .collect()
    }

    fn build(&self) -> Result<Calibration, ProcessingError> {
        let collected = self.buffer.len();
        if collected < self.required {
            return Err(ProcessingError::CalibrationInsufficientData {
                collected,
                required: self.required,
            });
        }

        let width = self.buffer[0].len();
        if let Some(index) = self
            .buffer
            .iter()
            .position(|row| row.len() != width || !self.guard.check_row(row))
        {
            return Err(ProcessingError::CalibrationShapeInvalid {
                reason: format!(
                    "row {} does not match the {}-column calibration window",
                    index, width
                ),
            });
        }

        let flat: Vec<f64> = self.buffer.iter().flatten().copied().collect();
        let matrix = Array2::from_shape_vec((collected, width), flat).map_err(|e| {
            ProcessingError::CalibrationShapeInvalid {
                reason: e.to_string(),
            }
        })?;

        let channel_map = self.mapper.detect(&matrix)?;
        log::debug!("Channel pairs selected: {:?}", channel_map.pairs());

        let mapped_rows = self
            .buffer
            .iter()
            .map(|row| channel_map.map(row, self.config.min_positive))
            .collect::<Result<Vec<_>, _>>()?;

        let mapped_width = mapped_rows[0].len();
        let mapped = Array2::from_shape_vec(
            (collected, mapped_width),
            mapped_rows.iter().flatten().copied().collect(),
        )
        .map_err(|e| ProcessingError::CalibrationShapeInvalid {
            reason: e.to_string(),
        })?;

        let baseline = mapped
            .mean_axis(Axis(0))
            .ok_or_else(|| ProcessingError::CalibrationShapeInvalid {
                reason: "empty calibration window".to_string(),
            })?
            .to_vec();

        Ok(Calibration {
            baseline,
            channel_map,
            mapped_rows,
        })
    }

    /// Complete the calibration run.
    ///
    /// The buffer is cleared whatever the outcome.
    ///
    /// # Errors
    ///
    /// * [`ProcessingError::CalibrationNotActive`] when not collecting
    /// * [`ProcessingError::CalibrationInsufficientData`] when fewer than
    ///   [`Self::required_samples`] rows were buffered
    /// * [`ProcessingError::CalibrationShapeInvalid`] when the rows do not
    ///   form a usable 16 or 32 column matrix
    pub fn finish(&mut self) -> Result<Calibration, ProcessingError> {
        if self.state != CalibrationState::Collecting {
            return Err(ProcessingError::CalibrationNotActive);
        }

        let result = self.build();
        self.buffer.clear();

        match &result {
            Ok(_) => {
                self.state = CalibrationState::Succeeded;
                log::info!("Calibration succeeded");
            }
            Err(err) => {
                self.state = CalibrationState::Failed;
                log::warn!("{}", err);
            }
        }
        result
    }

    /// Drop the buffer and go back to idle
    pub fn abort(&mut self) {
        if self.state == CalibrationState::Collecting {
            log::info!("Calibration aborted after {} samples", self.buffer.len());
        }
        self.buffer.clear();
        self.state = CalibrationState::Idle;
    }

    /// Recompute the rate-dependent sizes
    pub fn resize(&mut self, sample_rate: f64) {
        self.required = self.config.required_samples(sample_rate);
        self.quality_rows = samples_for_duration(self.quality_window_seconds, sample_rate);
    }
}
