// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Run-mode processing
//!
//! This module turns validated samples into hemoglobin changes, quality tags
//! and alert states, and hosts the background worker that drives a pipeline
//! from a sample queue.

pub mod alert;
pub mod consumer;
pub mod pipeline;
pub mod quality;
pub mod result;

pub use alert::AlertDetector;
pub use consumer::{PipelineCommand, PipelineEvent, PipelineWorker, WorkerStats};
pub use pipeline::DataProcessingPipeline;
pub use quality::SignalQualityEstimator;
pub use result::{
    AlertState, BaselineKind, CalibrationReport, ProcessOutcome, ProcessedSample, QualityTag,
};

use crate::config::PipelineConfig;
use crate::error::ProcessingError;

/// Create a processing pipeline from its runtime configuration
pub fn create_pipeline(config: PipelineConfig) -> Result<DataProcessingPipeline, ProcessingError> {
    DataProcessingPipeline::new(config)
}
