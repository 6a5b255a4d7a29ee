// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Background pipeline worker
//!
//! The worker owns a [`DataProcessingPipeline`] inside a tokio task. Samples
//! and control commands arrive on a bounded queue, so they are applied in the
//! order the producer sent them; results are broadcast to any number of
//! listeners (display, recorder, audio cue...).
//!
//! Alert changes are published as [`PipelineEvent::AlertChanged`] only on
//! transitions, so a listener can start or stop a cue without tracking
//! state itself.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;

use super::pipeline::DataProcessingPipeline;
use super::result::{AlertState, CalibrationReport, ProcessOutcome, ProcessedSample, QualityTag};
use crate::config::WorkerConfig;

/// Instructions accepted by the worker
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineCommand {
    /// A raw sample, routed to calibration or processing
    Sample(Vec<f64>),
    StartCalibration,
    FinishCalibration,
    AbortCalibration,
    SetSampleRate(f64),
    SetAlertRules { threshold: f64, duration_seconds: f64 },
    /// Stream reconnection
    Reset,
}

/// Notifications published by the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PipelineEvent {
    Processed(ProcessedSample),
    AlertChanged {
        previous: AlertState,
        current: AlertState,
        sequence: Option<u64>,
    },
    /// Live quality of the calibration buffer, sent after each calibration sample
    CalibrationQuality(Vec<QualityTag>),
    CalibrationFinished(CalibrationReport),
    SampleRejected { error: String },
    RateChanged(f64),
    CommandFailed { error: String },
}

/// Counters maintained by the worker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerStats {
    pub samples_processed: u64,
    pub samples_rejected: u64,
    pub calibration_samples: u64,
    pub uncalibrated_samples: u64,
    pub alerts_raised: u64,
}

/// Handle to a running pipeline task
#[derive(Debug)]
pub struct PipelineWorker {
    commands: mpsc::Sender<PipelineCommand>,
    events: broadcast::Sender<PipelineEvent>,
    stats: Arc<RwLock<WorkerStats>>,
    task: JoinHandle<DataProcessingPipeline>,
}

struct WorkerLoop {
    pipeline: DataProcessingPipeline,
    events: broadcast::Sender<PipelineEvent>,
    stats: Arc<RwLock<WorkerStats>>,
    last_alert: AlertState,
}

impl WorkerLoop {
    fn publish(&self, event: PipelineEvent) {
        if self.events.send(event).is_err() {
            log::trace!("No event subscriber");
        }
    }

    fn alert_transition(&mut self, current: AlertState, sequence: Option<u64>) -> bool {
        if current == self.last_alert {
            return false;
        }
        let previous = self.last_alert;
        self.last_alert = current;
        log::info!("Alert state changed: {} -> {}", previous, current);
        self.publish(PipelineEvent::AlertChanged {
            previous,
            current,
            sequence,
        });
        current == AlertState::Load
    }

    async fn handle_sample(&mut self, raw: Vec<f64>) {
        match self.pipeline.ingest(&raw) {
            Ok(ProcessOutcome::Calibrating) => {
                self.stats.write().await.calibration_samples += 1;
                self.publish(PipelineEvent::CalibrationQuality(
                    self.pipeline.calibration_quality(),
                ));
            }
            Ok(ProcessOutcome::NotCalibrated) => {
                self.stats.write().await.uncalibrated_samples += 1;
            }
            Ok(ProcessOutcome::Processed(sample)) => {
                let raised = match sample.alert {
                    Some(state) => self.alert_transition(state, Some(sample.sequence)),
                    None => false,
                };
                {
                    let mut stats = self.stats.write().await;
                    stats.samples_processed += 1;
                    if raised {
                        stats.alerts_raised += 1;
                    }
                }
                self.publish(PipelineEvent::Processed(sample));
            }
            Err(err) => {
                log::debug!("Sample rejected: {}", err);
                self.stats.write().await.samples_rejected += 1;
                self.publish(PipelineEvent::SampleRejected {
                    error: err.to_string(),
                });
            }
        }
    }

    fn finish_calibration(&mut self) {
        let report = match self.pipeline.finish_calibration() {
            Ok(calibration) => CalibrationReport {
                success: true,
                baseline: Some(calibration.baseline),
                channel_map: Some(calibration.channel_map),
                error: None,
            },
            Err(err) => CalibrationReport {
                success: false,
                baseline: None,
                channel_map: None,
                error: Some(err.to_string()),
            },
        };
        self.publish(PipelineEvent::CalibrationFinished(report));
    }

    async fn handle(&mut self, command: PipelineCommand) {
        match command {
            PipelineCommand::Sample(raw) => self.handle_sample(raw).await,
            PipelineCommand::StartCalibration => {
                self.pipeline.start_calibration();
                self.alert_transition(AlertState::Nominal, None);
            }
            PipelineCommand::FinishCalibration => {
                self.finish_calibration();
                self.alert_transition(AlertState::Nominal, None);
            }
            PipelineCommand::AbortCalibration => self.pipeline.abort_calibration(),
            PipelineCommand::SetSampleRate(rate) => match self.pipeline.set_sample_rate(rate) {
                Ok(()) => {
                    self.alert_transition(AlertState::Nominal, None);
                    self.publish(PipelineEvent::RateChanged(rate));
                }
                Err(err) => self.publish(PipelineEvent::CommandFailed {
                    error: err.to_string(),
                }),
            },
            PipelineCommand::SetAlertRules {
                threshold,
                duration_seconds,
            } => {
                if let Err(err) = self.pipeline.set_alert_rules(threshold, duration_seconds) {
                    self.publish(PipelineEvent::CommandFailed {
                        error: err.to_string(),
                    });
                }
            }
            PipelineCommand::Reset => {
                self.pipeline.reset();
                self.alert_transition(AlertState::Nominal, None);
            }
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<PipelineCommand>) -> DataProcessingPipeline {
        log::debug!("Pipeline worker started");
        while let Some(command) = commands.recv().await {
            self.handle(command).await;
        }
        log::debug!("Pipeline worker stopped");
        self.pipeline
    }
}

impl PipelineWorker {
    /// Spawn the worker task on the current tokio runtime
    pub fn spawn(pipeline: DataProcessingPipeline, config: &WorkerConfig) -> Self {
        let (commands, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let stats = Arc::new(RwLock::new(WorkerStats::default()));

        let worker = WorkerLoop {
            pipeline,
            events: events.clone(),
            stats: Arc::clone(&stats),
            last_alert: AlertState::Nominal,
        };
        let task = tokio::spawn(worker.run(receiver));

        Self {
            commands,
            events,
            stats,
            task,
        }
    }

    /// Subscribe to pipeline events
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// Sender usable by an acquisition task
    pub fn sender(&self) -> mpsc::Sender<PipelineCommand> {
        self.commands.clone()
    }

    /// Queue a command, waiting for room in the queue
    pub async fn send(&self, command: PipelineCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .context("Pipeline worker is no longer running")
    }

    pub async fn push_sample(&self, raw: Vec<f64>) -> Result<()> {
        self.send(PipelineCommand::Sample(raw)).await
    }

    /// Current counters
    pub async fn stats(&self) -> WorkerStats {
        self.stats.read().await.clone()
    }

    /// Close the queue, let the worker drain it and return the pipeline
    /// with the final counters
    pub async fn finish(self) -> Result<(DataProcessingPipeline, WorkerStats)> {
        drop(self.commands);
        let pipeline = self.task.await.context("Pipeline worker task failed")?;
        let stats = self.stats.read().await.clone();
        Ok((pipeline, stats))
    }

    /// Close the queue, let the worker drain it and return the pipeline
    pub async fn shutdown(self) -> Result<DataProcessingPipeline> {
        Ok(self.finish().await?.0)
    }
}
