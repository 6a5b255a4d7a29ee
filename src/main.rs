// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the fNIRS cognitive load monitor
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

use rust_fnirs::acquisition::{
    get_simulated_source, ActivationEpisode, SampleSource, SimulationConfig, SourceLayout,
};
use rust_fnirs::config::{self, Config, ProcessingMode};
use rust_fnirs::processing::{
    create_pipeline, AlertState, CalibrationReport, PipelineCommand, PipelineEvent,
    PipelineWorker, QualityTag, WorkerStats,
};
use rust_fnirs::CHANNEL_COUNT;

/// Cognitive load monitor using functional near-infrared spectroscopy
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Nominal sample rate in Hz
    #[arg(long)]
    sample_rate: Option<f64>,

    /// Processing mode (baseline_ratio or optical_density)
    #[arg(long)]
    mode: Option<ProcessingMode>,

    /// Alert threshold in ΔμM
    #[arg(long)]
    threshold: Option<f64>,

    /// Seconds the alert condition must hold
    #[arg(long)]
    alert_duration: Option<f64>,

    /// Calibration window in seconds
    #[arg(long)]
    calibration_duration: Option<f64>,

    /// Seconds of run mode after calibration
    #[arg(long, default_value_t = 60.0)]
    run_seconds: f64,

    /// Simulated raw layout (mapped or dual_bank)
    #[arg(long, default_value = "dual_bank")]
    layout: SourceLayout,

    /// Start of the simulated load episode, in seconds of run mode
    #[arg(long, default_value_t = 20.0)]
    activation_start: f64,

    /// End of the simulated load episode, in seconds of run mode
    #[arg(long, default_value_t = 35.0)]
    activation_end: f64,

    /// Relative drop of the 850 nm intensity during the load episode
    #[arg(long, default_value_t = 0.05)]
    activation_depth: f64,

    /// Seed of the simulated noise
    #[arg(long)]
    seed: Option<u32>,

    /// Pace samples at the nominal rate instead of running as fast as possible
    #[arg(long)]
    realtime: bool,

    /// Output file for the session summary (JSON)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

/// Sequence range during which the alert state was `load`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AlertEpisode {
    start_sequence: Option<u64>,
    end_sequence: Option<u64>,
}

/// Summary of a monitoring session
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionSummary {
    started_at: DateTime<Utc>,
    mode: ProcessingMode,
    sample_rate_hz: f64,
    layout: SourceLayout,
    calibration: Option<CalibrationReport>,
    samples_processed: u64,
    samples_rejected: u64,
    mean_o2hb: Vec<f64>,
    peak_o2hb: Vec<f64>,
    final_quality: Option<Vec<QualityTag>>,
    alert_episodes: Vec<AlertEpisode>,
    stats: WorkerStats,
}

impl SessionSummary {
    fn new(mode: ProcessingMode, sample_rate_hz: f64, layout: SourceLayout) -> Self {
        Self {
            started_at: Utc::now(),
            mode,
            sample_rate_hz,
            layout,
            calibration: None,
            samples_processed: 0,
            samples_rejected: 0,
            mean_o2hb: vec![0.0; CHANNEL_COUNT],
            peak_o2hb: vec![f64::NEG_INFINITY; CHANNEL_COUNT],
            final_quality: None,
            alert_episodes: Vec::new(),
            stats: WorkerStats::default(),
        }
    }

    fn record(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::Processed(sample) => {
                self.samples_processed += 1;
                let n = self.samples_processed as f64;
                for (channel, value) in sample.o2hb.iter().enumerate().take(CHANNEL_COUNT) {
                    self.mean_o2hb[channel] += (value - self.mean_o2hb[channel]) / n;
                    self.peak_o2hb[channel] = self.peak_o2hb[channel].max(*value);
                }
                self.final_quality = sample.quality;
            }
            PipelineEvent::AlertChanged {
                current, sequence, ..
            } => match current {
                AlertState::Load => {
                    info!("Cognitive load detected at sample {:?}", sequence);
                    self.alert_episodes.push(AlertEpisode {
                        start_sequence: sequence,
                        end_sequence: None,
                    });
                }
                AlertState::Nominal => {
                    info!("Back to nominal at sample {:?}", sequence);
                    if let Some(episode) = self.alert_episodes.last_mut() {
                        episode.end_sequence = sequence;
                    }
                }
            },
            PipelineEvent::CalibrationFinished(report) => {
                match &report.error {
                    None => info!("Calibration succeeded"),
                    Some(error) => warn!("Calibration failed: {}", error),
                }
                self.calibration = Some(report);
            }
            PipelineEvent::SampleRejected { error } => {
                self.samples_rejected += 1;
                log::debug!("Sample rejected: {}", error);
            }
            PipelineEvent::CommandFailed { error } => warn!("Command failed: {}", error),
            PipelineEvent::RateChanged(rate) => info!("Sample rate changed to {} Hz", rate),
            PipelineEvent::CalibrationQuality(_) => {}
        }
    }
}

async fn collect_events(
    mut events: broadcast::Receiver<PipelineEvent>,
    mut summary: SessionSummary,
) -> SessionSummary {
    loop {
        match events.recv().await {
            Ok(event) => summary.record(event),
            Err(RecvError::Lagged(skipped)) => warn!("Event listener lagged, {} events lost", skipped),
            Err(RecvError::Closed) => break,
        }
    }
    summary
}

async fn feed(
    worker: &PipelineWorker,
    source: &mut dyn SampleSource,
    count: usize,
    realtime: bool,
) -> Result<()> {
    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / source.sample_rate()));
    for _ in 0..count {
        if realtime {
            interval.tick().await;
        }
        match source.read_sample()? {
            Some(sample) => worker.push_sample(sample.values).await?,
            None => break,
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    // Check if --show-config-schema flag is set
    if args.show_config_schema {
        return config::output_config_schema();
    }

    // Validate configuration file if --validate-config is set
    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    // Load configuration
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    // Apply command line overrides
    config.apply_args(
        args.sample_rate,
        args.mode,
        args.threshold,
        args.alert_duration,
        args.calibration_duration,
    );
    config
        .validate()
        .context("Invalid configuration after command line overrides")?;

    let rate = config.acquisition.sample_rate_hz;
    let calibration_seconds = config.calibration.duration_seconds;
    let pipeline = create_pipeline(config.pipeline_config())
        .context("Failed to create the processing pipeline")?;

    println!("fNIRS Cognitive Load Monitor");
    println!("----------------------------");
    info!(
        "Mode {}, {} Hz, {:?} layout, calibration {} s, run {} s",
        config.processing.mode, rate, args.layout, calibration_seconds, args.run_seconds
    );

    let simulation = SimulationConfig {
        layout: args.layout,
        sample_rate_hz: rate,
        duration_seconds: Some(calibration_seconds + args.run_seconds),
        activations: vec![ActivationEpisode {
            start_seconds: calibration_seconds + args.activation_start,
            end_seconds: calibration_seconds + args.activation_end,
            depth: args.activation_depth,
        }],
        placeholder_high: config.hardware.placeholder_high,
        placeholder_low: config.hardware.placeholder_low,
        include_marker: config
            .acquisition
            .trailing_field_widths
            .contains(&args.layout.width()),
        ..SimulationConfig::default()
    };
    let mut source = get_simulated_source(simulation, args.seed);

    let worker = PipelineWorker::spawn(pipeline, &config.worker);
    let listener = tokio::spawn(collect_events(
        worker.subscribe(),
        SessionSummary::new(config.processing.mode, rate, args.layout),
    ));

    // Calibration, then run mode
    worker.send(PipelineCommand::StartCalibration).await?;
    let calibration_samples = (rate * calibration_seconds).floor() as usize;
    feed(&worker, source.as_mut(), calibration_samples, args.realtime).await?;
    worker.send(PipelineCommand::FinishCalibration).await?;

    let run_samples = (rate * args.run_seconds).floor() as usize;
    feed(&worker, source.as_mut(), run_samples, args.realtime).await?;

    let (_, stats) = worker.finish().await?;
    let mut summary = listener.await.context("Event listener failed")?;
    summary.stats = stats;

    // Output results
    let json = serde_json::to_string_pretty(&summary)?;
    if let Some(output_path) = args.output {
        println!("Saving session summary to: {}", output_path.display());
        std::fs::write(&output_path, json)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
    } else {
        println!("{}", json);
    }

    Ok(())
}
