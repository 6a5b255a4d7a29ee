// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use approx::assert_abs_diff_eq;
use ndarray::Array2;
use rust_fnirs::acquisition::{
    ActivationEpisode, SampleSource, SimulatedOptodeSource, SimulationConfig, SourceLayout,
};
use rust_fnirs::config::{Config, PipelineConfig};
use rust_fnirs::preprocessing::{create_pair_mapper, create_sample_guard, CalibrationState};
use rust_fnirs::processing::{
    create_pipeline, AlertState, BaselineKind, ProcessOutcome, QualityTag,
};
use rust_fnirs::ProcessingError;

fn alternating(index: usize) -> [f64; 16] {
    [if index % 2 == 0 { 95.0 } else { 105.0 }; 16]
}

#[test]
fn test_full_calibration_scenario() -> Result<()> {
    let mut pipeline = create_pipeline(PipelineConfig::default())?;

    pipeline.start_calibration();
    for i in 0..80 {
        pipeline.add_calibration_sample(&alternating(i))?;
    }
    let calibration = pipeline.finish_calibration()?;
    assert_eq!(pipeline.calibration_state(), CalibrationState::Succeeded);
    assert_eq!(calibration.baseline.len(), 16);
    for value in &calibration.baseline {
        assert_abs_diff_eq!(*value, 100.0, epsilon = 1e-9);
    }
    assert!(matches!(pipeline.baseline(), Some(BaselineKind::Ratio(_))));

    let outcome = pipeline.process(&[100.0; 16])?;
    let sample = outcome.processed().expect("a processed sample");
    assert_eq!(sample.o2hb.len(), 8);
    assert_eq!(sample.hhb.len(), 8);
    for (o2hb, hhb) in sample.o2hb.iter().zip(&sample.hhb) {
        assert_abs_diff_eq!(*o2hb, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(*hhb, 0.0, epsilon = 1e-9);
    }
    assert_eq!(sample.quality, Some(vec![QualityTag::Ok; 8]));
    assert_eq!(sample.alert, Some(AlertState::Nominal));

    Ok(())
}

#[test]
fn test_constant_baseline_round_trip() -> Result<()> {
    let mut pipeline = create_pipeline(PipelineConfig::default())?;
    pipeline.start_calibration();
    for _ in 0..80 {
        pipeline.add_calibration_sample(&[250.0; 16])?;
    }
    pipeline.finish_calibration()?;

    let outcome = pipeline.process(&[250.0; 16])?;
    let sample = outcome.processed().expect("a processed sample");
    assert!(sample.o2hb.iter().all(|v| v.abs() < 1e-9));
    assert!(sample.hhb.iter().all(|v| v.abs() < 1e-9));
    // A flat calibration window grades every channel as degraded
    assert_eq!(sample.quality, Some(vec![QualityTag::Degraded; 8]));
    Ok(())
}

#[test]
fn test_insufficient_calibration() -> Result<()> {
    let mut pipeline = create_pipeline(PipelineConfig::default())?;
    pipeline.start_calibration();
    for i in 0..50 {
        pipeline.add_calibration_sample(&alternating(i))?;
    }

    assert_eq!(
        pipeline.finish_calibration().unwrap_err(),
        ProcessingError::CalibrationInsufficientData {
            collected: 50,
            required: 80
        }
    );
    assert!(pipeline.baseline().is_none());
    assert_eq!(pipeline.process(&[100.0; 16])?, ProcessOutcome::NotCalibrated);

    // Retrying starts from a clean buffer
    pipeline.start_calibration();
    for i in 0..79 {
        pipeline.add_calibration_sample(&alternating(i))?;
    }
    assert!(pipeline.finish_calibration().is_err());
    Ok(())
}

#[test]
fn test_rejected_lengths() -> Result<()> {
    let guard = create_sample_guard(&Config::default().acquisition);
    for length in [16, 32, 33, 34] {
        assert!(guard.validate(&vec![1.0; length]).is_ok(), "length {}", length);
    }
    for length in [0, 10, 15, 17, 18, 20, 30, 31, 35, 48] {
        assert!(guard.validate(&vec![1.0; length]).is_err(), "length {}", length);
    }
    Ok(())
}

#[test]
fn test_mapper_on_simulated_dual_bank() -> Result<()> {
    // Only two active pairs in the second bank
    let config = SimulationConfig {
        active_pairs: vec![0, 3, 4, 7, 9, 14],
        include_marker: false,
        ..SimulationConfig::default()
    };
    let mut source = SimulatedOptodeSource::new(config, Some(21));
    let mut data = Vec::new();
    for _ in 0..80 {
        let sample = source.read_sample()?.expect("an endless source");
        data.extend(sample.values);
    }
    let matrix = Array2::from_shape_vec((80, 32), data)?;

    let defaults = Config::default();
    let mapper = create_pair_mapper(&defaults.calibration, &defaults.hardware);
    let map = mapper.detect(&matrix)?;
    let firsts: Vec<usize> = map.pairs().iter().map(|p| p.first).collect();

    assert_eq!(firsts.len(), 8);
    assert_eq!(&firsts[..4], &[0, 6, 8, 14]);
    assert!(firsts[4..].contains(&18));
    assert!(firsts[4..].contains(&28));
    assert!(firsts[4..].iter().all(|f| *f >= 16));
    assert_eq!(mapper.detect(&matrix)?, map);
    Ok(())
}

#[test]
fn test_simulated_session_raises_and_clears_alert() -> Result<()> {
    let mut config = Config::default();
    config.acquisition.sample_rate_hz = 10.0;
    let mut pipeline = create_pipeline(config.pipeline_config())?;

    let simulation = SimulationConfig {
        layout: SourceLayout::DualBank,
        activations: vec![ActivationEpisode {
            start_seconds: 30.0,
            end_seconds: 45.0,
            depth: 0.05,
        }],
        ..SimulationConfig::default()
    };
    let mut source = SimulatedOptodeSource::new(simulation, Some(42));

    pipeline.start_calibration();
    let mut states = Vec::new();
    for tick in 0..600 {
        let sample = source.read_sample()?.expect("an endless source");
        if tick == 100 {
            pipeline.finish_calibration()?;
        }
        match pipeline.ingest(&sample.values)? {
            ProcessOutcome::Processed(result) => {
                assert_eq!(result.marker, Some(if (300..450).contains(&tick) { 1.0 } else { 0.0 }));
                states.push((tick, result.alert.expect("alerting enabled")));
            }
            ProcessOutcome::Calibrating => assert!(tick < 100),
            ProcessOutcome::NotCalibrated => panic!("calibrated session"),
        }
    }

    let loaded: Vec<usize> = states
        .iter()
        .filter(|(_, state)| *state == AlertState::Load)
        .map(|(tick, _)| *tick)
        .collect();

    assert!(!loaded.is_empty());
    // The alert needs 3 s of sustained load before it fires
    assert!(*loaded.first().unwrap() >= 329);
    assert!(*loaded.last().unwrap() < 450);
    assert_eq!(states.last().map(|(_, s)| *s), Some(AlertState::Nominal));
    Ok(())
}
