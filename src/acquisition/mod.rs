// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sample acquisition module
//!
//! This module defines the boundary between a raw sample stream and the
//! processing core, and provides a simulated optode headset used by the
//! command line demo, the tests and the benchmarks.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::HardwareConfig;
use crate::utility::NoiseGenerator;

/// A raw vector with its acquisition time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampedSample {
    pub timestamp: DateTime<Utc>,
    /// Raw intensities, optionally followed by status and marker values
    pub values: Vec<f64>,
}

/// Represents a raw sample source (device stream, replay, simulator)
pub trait SampleSource: Send {
    /// Read the next sample, `None` once the source is exhausted
    fn read_sample(&mut self) -> Result<Option<TimestampedSample>>;

    /// Nominal sample rate of this source in Hz
    fn sample_rate(&self) -> f64;
}

/// Raw vector layout emitted by the simulated headset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceLayout {
    /// 16 values, 8 pairs already mapped
    Mapped,
    /// 32 values, two receiver banks of which 4 pairs each carry light
    #[default]
    DualBank,
}

impl SourceLayout {
    pub fn width(&self) -> usize {
        match self {
            Self::Mapped => 16,
            Self::DualBank => 32,
        }
    }
}

impl std::str::FromStr for SourceLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mapped" | "16" => Ok(Self::Mapped),
            "dual_bank" | "dual-bank" | "32" => Ok(Self::DualBank),
            other => Err(format!("unknown layout '{}'", other)),
        }
    }
}

/// A period during which the simulated subject is under load.
///
/// The 850 nm intensity of every active channel drops by `depth`
/// (a fraction), which reads as a rise in ΔO2Hb and a fall in ΔHHb.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivationEpisode {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub depth: f64,
}

impl ActivationEpisode {
    fn contains(&self, t: f64) -> bool {
        t >= self.start_seconds && t < self.end_seconds
    }
}

/// Settings of [`SimulatedOptodeSource`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub layout: SourceLayout,
    pub sample_rate_hz: f64,
    /// Stop after this many seconds, run forever when `None`
    pub duration_seconds: Option<f64>,
    /// Mean intensity of an active channel
    pub base_intensity: f64,
    /// Standard deviation of the Gaussian jitter on active channels
    pub jitter_std: f64,
    /// Raw pair indices carrying light in the dual-bank layout
    pub active_pairs: Vec<usize>,
    pub activations: Vec<ActivationEpisode>,
    /// Append a device status value (1.0) after the intensities.
    /// Trailing fields are only accepted after the dual-bank layout by default.
    pub include_status: bool,
    /// Append an event marker (1.0 during activations, else 0.0)
    pub include_marker: bool,
    pub placeholder_high: f64,
    pub placeholder_low: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let hardware = HardwareConfig::default();
        Self {
            layout: SourceLayout::default(),
            sample_rate_hz: 10.0,
            duration_seconds: None,
            base_intensity: 1000.0,
            jitter_std: 5.0,
            active_pairs: vec![1, 2, 5, 6, 8, 10, 13, 15],
            activations: Vec::new(),
            include_status: false,
            include_marker: true,
            placeholder_high: hardware.placeholder_high,
            placeholder_low: hardware.placeholder_low,
        }
    }
}

/// Simulated 8-channel optode headset
pub struct SimulatedOptodeSource {
    config: SimulationConfig,
    noise: NoiseGenerator,
    start: DateTime<Utc>,
    index: u64,
}

impl SimulatedOptodeSource {
    /// Create a simulator; a `None` seed draws one at random
    pub fn new(config: SimulationConfig, seed: Option<u32>) -> Self {
        let seed = seed.unwrap_or_else(rand::random::<u32>);
        log::debug!(
            "Simulated {:?} source at {} Hz, seed {}",
            config.layout,
            config.sample_rate_hz,
            seed
        );
        Self {
            config,
            noise: NoiseGenerator::new(seed),
            start: Utc::now(),
            index: 0,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn elapsed_seconds(&self) -> f64 {
        self.index as f64 / self.config.sample_rate_hz
    }

    fn is_active_pair(&self, pair: usize) -> bool {
        match self.config.layout {
            SourceLayout::Mapped => true,
            SourceLayout::DualBank => self.config.active_pairs.contains(&pair),
        }
    }

    /// Build the raw vector for time `t`
    fn generate(&mut self, t: f64) -> Vec<f64> {
        let width = self.config.layout.width();
        let loaded = self.config.activations.iter().find(|a| a.contains(t)).copied();
        let mut values = Vec::with_capacity(width + 2);

        for pair in 0..width / 2 {
            if !self.is_active_pair(pair) {
                let placeholder = if pair % 2 == 0 {
                    self.config.placeholder_high
                } else {
                    self.config.placeholder_low
                };
                values.push(placeholder);
                values.push(placeholder);
                continue;
            }

            // Channels differ slightly in coupling
            let base = self.config.base_intensity * (1.0 + 0.02 * pair as f64);
            let first = match loaded {
                Some(episode) => base * (1.0 - episode.depth),
                None => base,
            };
            let mut pair_values = [first, base * 0.9];
            self.noise.add_jitter(&mut pair_values, self.config.jitter_std);
            values.extend(pair_values.iter().map(|v| v.max(1.0)));
        }

        if self.config.include_status {
            values.push(1.0);
        }
        if self.config.include_marker {
            values.push(if loaded.is_some() { 1.0 } else { 0.0 });
        }
        values
    }
}

impl SampleSource for SimulatedOptodeSource {
    fn read_sample(&mut self) -> Result<Option<TimestampedSample>> {
        let t = self.elapsed_seconds();
        if let Some(duration) = self.config.duration_seconds {
            if t >= duration {
                return Ok(None);
            }
        }

        let values = self.generate(t);
        let offset = Duration::microseconds((t * 1e6) as i64);
        self.index += 1;

        Ok(Some(TimestampedSample {
            timestamp: self.start + offset,
            values,
        }))
    }

    fn sample_rate(&self) -> f64 {
        self.config.sample_rate_hz
    }
}

/// Get a simulated source as a trait object
pub fn get_simulated_source(config: SimulationConfig, seed: Option<u32>) -> Box<dyn SampleSource> {
    Box::new(SimulatedOptodeSource::new(config, seed))
}
