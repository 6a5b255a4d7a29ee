// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sample-by-sample processing pipeline
//!
//! [`DataProcessingPipeline`] owns every stateful component of the core and
//! drives them in order for each raw sample:
//!
//! 1. [`RawSampleGuard`] validation (a rejected sample changes nothing)
//! 2. channel mapping and ΔOD against the session baseline
//! 3. MBLL conversion to ΔO2Hb / ΔHHb
//! 4. quality grading, then alert evaluation
//!
//! The pipeline is single-threaded; reconfiguration takes `&mut self` and is
//! therefore never interleaved with sample processing.

use crate::config::{PipelineConfig, ProcessingMode};
use crate::error::ProcessingError;
use crate::preprocessing::{
    BaselineCalibrator, Calibration, CalibrationState, ChannelMap, RawSampleGuard,
};
use crate::spectral::MbllConverter;

use super::alert::AlertDetector;
use super::quality::SignalQualityEstimator;
use super::result::{BaselineKind, ProcessOutcome, ProcessedSample, QualityTag};

/// Optical densities of one sample, ready for the MBLL step
struct Prepared {
    /// Mapped 16-wide values fed to the quality window
    mapped: Vec<f64>,
    /// Mapped 16-wide ΔOD
    delta_od: Vec<f64>,
    /// Reference captured by this sample (optical-density mode only)
    new_reference: Option<Vec<f64>>,
}

fn check_rate(rate: f64) -> Result<(), ProcessingError> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(ProcessingError::InvalidSampleRate { rate });
    }
    Ok(())
}

/// The fNIRS signal-processing core
#[derive(Debug, Clone)]
pub struct DataProcessingPipeline {
    config: PipelineConfig,
    guard: RawSampleGuard,
    calibrator: BaselineCalibrator,
    converter: MbllConverter,
    quality: SignalQualityEstimator,
    alert: AlertDetector,
    baseline: Option<BaselineKind>,
    channel_map: Option<ChannelMap>,
    sequence: u64,
}

impl DataProcessingPipeline {
    /// Build a pipeline from its configuration.
    ///
    /// # Errors
    ///
    /// * [`ProcessingError::SingularExtinctionMatrix`] when the extinction
    ///   table cannot be inverted
    /// * [`ProcessingError::InvalidSampleRate`] for a non-positive rate
    /// * [`ProcessingError::InvalidConfiguration`] for an unusable raw
    ///   length set or alert policy
    pub fn new(config: PipelineConfig) -> Result<Self, ProcessingError> {
        let rate = config.acquisition.sample_rate_hz;
        check_rate(rate)?;

        if config.acquisition.allowed_raw_lengths.is_empty() {
            return Err(ProcessingError::InvalidConfiguration(
                "no allowed raw length".to_string(),
            ));
        }
        let min_channels = config.processing.active().min_alert_channels;
        if !(1..=crate::CHANNEL_COUNT).contains(&min_channels) {
            return Err(ProcessingError::InvalidConfiguration(format!(
                "min_alert_channels must be between 1 and {}, got {}",
                crate::CHANNEL_COUNT,
                min_channels
            )));
        }

        let converter = MbllConverter::new(&config.mbll)?;
        log::debug!(
            "Pipeline created: mode {}, {} Hz",
            config.processing.mode,
            rate
        );

        Ok(Self {
            guard: RawSampleGuard::new(&config.acquisition),
            calibrator: BaselineCalibrator::new(&config),
            converter,
            quality: SignalQualityEstimator::new(
                &config.quality,
                &config.hardware,
                config.processing.active().quality_std_lower_bound,
                rate,
            ),
            alert: AlertDetector::new(&config.alert, min_channels, rate),
            baseline: None,
            channel_map: None,
            sequence: 0,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn mode(&self) -> ProcessingMode {
        self.config.processing.mode
    }

    pub fn sample_rate(&self) -> f64 {
        self.config.acquisition.sample_rate_hz
    }

    pub fn baseline(&self) -> Option<&BaselineKind> {
        self.baseline.as_ref()
    }

    pub fn channel_map(&self) -> Option<&ChannelMap> {
        self.channel_map.as_ref()
    }

    pub fn calibration_state(&self) -> CalibrationState {
        self.calibrator.state()
    }

    pub fn calibrator(&self) -> &BaselineCalibrator {
        &self.calibrator
    }

    /// Begin a calibration run, dropping the current baseline and histories
    pub fn start_calibration(&mut self) {
        self.calibrator.start();
        self.channel_map = None;
        self.baseline = None;
        self.quality.clear();
        self.alert.clear();
    }

    pub fn add_calibration_sample(&mut self, raw: &[f64]) -> Result<(), ProcessingError> {
        self.calibrator.add_sample(raw)
    }

    /// Live quality of the calibration buffer
    pub fn calibration_quality(&self) -> Vec<QualityTag> {
        self.calibrator.estimate_quality()
    }

    /// Complete calibration and install its results.
    ///
    /// In ratio mode the window mean becomes the baseline and seeds the
    /// quality window. In optical-density mode only the channel map is kept;
    /// the next sample captures a fresh reference.
    pub fn finish_calibration(&mut self) -> Result<Calibration, ProcessingError> {
        let calibration = self.calibrator.finish()?;

        self.channel_map = Some(calibration.channel_map.clone());
        self.quality.clear();
        self.alert.clear();

        match self.mode() {
            ProcessingMode::BaselineRatio => {
                self.baseline = Some(BaselineKind::Ratio(calibration.baseline.clone()));
                self.quality.seed(&calibration.mapped_rows);
            }
            ProcessingMode::OpticalDensity => {
                self.baseline = None;
            }
        }

        Ok(calibration)
    }

    pub fn abort_calibration(&mut self) {
        self.calibrator.abort();
    }

    fn ratio_delta(&self, values: &[f64]) -> Result<Option<Prepared>, ProcessingError> {
        let (Some(BaselineKind::Ratio(baseline)), Some(map)) = (&self.baseline, &self.channel_map)
        else {
            return Ok(None);
        };

        let mapped = map.map(values, self.config.calibration.min_positive)?;
        let delta_od = mapped
            .iter()
            .zip(baseline)
            .map(|(x, b)| -(x / b).ln())
            .collect();

        Ok(Some(Prepared {
            mapped,
            delta_od,
            new_reference: None,
        }))
    }

    fn reference_delta(&self, values: &[f64]) -> Result<Prepared, ProcessingError> {
        let width = values.len();
        let map = match &self.channel_map {
            Some(map) if map.raw_width() == width => map.clone(),
            _ => ChannelMap::static_layout(width)
                .ok_or_else(|| ProcessingError::malformed(width, values))?,
        };

        let (reference, new_reference) = match &self.baseline {
            Some(BaselineKind::Reference(reference)) => {
                if reference.len() != width {
                    return Err(ProcessingError::malformed(width, values));
                }
                (reference.as_slice(), None)
            }
            _ => (values, Some(values.to_vec())),
        };

        let delta: Vec<f64> = values.iter().zip(reference).map(|(x, r)| x - r).collect();

        Ok(Prepared {
            mapped: map.select(values)?,
            delta_od: map.select(&delta)?,
            new_reference,
        })
    }

    /// Process one run-mode sample.
    ///
    /// # Errors
    ///
    /// [`ProcessingError::MalformedSample`] when the sample fails validation
    /// or does not match the session layout. No state is modified in that case.
    pub fn process(&mut self, raw: &[f64]) -> Result<ProcessOutcome, ProcessingError> {
        let sample = self.guard.validate(raw)?;

        let prepared = match self.mode() {
            ProcessingMode::BaselineRatio => match self.ratio_delta(&sample.values)? {
                Some(prepared) => prepared,
                None => return Ok(ProcessOutcome::NotCalibrated),
            },
            ProcessingMode::OpticalDensity => self.reference_delta(&sample.values)?,
        };

        let unit_scale = self.config.processing.active().unit_scale;
        let hb = self.converter.convert(&prepared.delta_od, unit_scale)?;

        if let Some(reference) = prepared.new_reference {
            log::info!("Optical density reference captured ({} values)", reference.len());
            self.baseline = Some(BaselineKind::Reference(reference));
        }

        let quality = if self.config.quality.enabled {
            self.quality.push(&prepared.mapped);
            Some(self.quality.assess(sample.status))
        } else {
            None
        };

        let alert = if self.config.alert.enabled {
            Some(self.alert.update(&hb.o2hb))
        } else {
            None
        };

        let sequence = self.sequence;
        self.sequence += 1;
        log::trace!("Sample {} processed", sequence);

        Ok(ProcessOutcome::Processed(ProcessedSample {
            sequence,
            o2hb: hb.o2hb,
            hhb: hb.hhb,
            quality,
            alert,
            marker: sample.marker,
            status: sample.status,
        }))
    }

    /// Route a sample to the calibration buffer while collecting, otherwise process it
    pub fn ingest(&mut self, raw: &[f64]) -> Result<ProcessOutcome, ProcessingError> {
        if self.calibrator.state() == CalibrationState::Collecting {
            self.calibrator.add_sample(raw)?;
            return Ok(ProcessOutcome::Calibrating);
        }
        self.process(raw)
    }

    /// Switch to a new nominal sample rate.
    ///
    /// Aborts any calibration, drops the baseline and channel map and
    /// reallocates every rate-dependent buffer.
    pub fn set_sample_rate(&mut self, rate: f64) -> Result<(), ProcessingError> {
        check_rate(rate)?;

        self.calibrator.abort();
        self.calibrator.resize(rate);
        self.baseline = None;
        self.channel_map = None;
        self.quality.resize(rate);
        self.alert.resize(rate);
        self.config.acquisition.sample_rate_hz = rate;

        log::info!("Sample rate set to {} Hz, calibration required", rate);
        Ok(())
    }

    /// Change the alert threshold and sustain duration at runtime
    pub fn set_alert_rules(
        &mut self,
        threshold: f64,
        duration_seconds: f64,
    ) -> Result<(), ProcessingError> {
        if !threshold.is_finite() {
            return Err(ProcessingError::InvalidConfiguration(format!(
                "alert threshold must be finite, got {}",
                threshold
            )));
        }
        if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
            return Err(ProcessingError::InvalidConfiguration(format!(
                "alert duration must be positive, got {}",
                duration_seconds
            )));
        }

        self.alert.set_rules(threshold, duration_seconds);
        self.config.alert.threshold = threshold;
        self.config.alert.duration_seconds = duration_seconds;
        self.config.alert.history_seconds = self.config.alert.history_seconds.max(duration_seconds);

        log::debug!(
            "Alert rules: threshold {}, duration {} s",
            threshold,
            duration_seconds
        );
        Ok(())
    }

    /// Forget the session (stream reconnection)
    pub fn reset(&mut self) {
        self.calibrator.abort();
        self.baseline = None;
        self.channel_map = None;
        self.quality.clear();
        self.alert.clear();
        self.sequence = 0;
        log::info!("Pipeline reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::AlertState;

    fn ratio_pipeline() -> DataProcessingPipeline {
        DataProcessingPipeline::new(PipelineConfig::default()).unwrap()
    }

    fn od_pipeline() -> DataProcessingPipeline {
        let mut config = PipelineConfig::default();
        config.processing.mode = ProcessingMode::OpticalDensity;
        DataProcessingPipeline::new(config).unwrap()
    }

    fn calibrate(pipeline: &mut DataProcessingPipeline) {
        pipeline.start_calibration();
        for i in 0..80 {
            let value = if i % 2 == 0 { 95.0 } else { 105.0 };
            pipeline.add_calibration_sample(&[value; 16]).unwrap();
        }
        pipeline.finish_calibration().unwrap();
    }

    #[test]
    fn test_not_calibrated_without_baseline() {
        let mut p = ratio_pipeline();
        assert_eq!(p.process(&[100.0; 16]).unwrap(), ProcessOutcome::NotCalibrated);
    }

    #[test]
    fn test_invalid_rate_rejected() {
        let mut config = PipelineConfig::default();
        config.acquisition.sample_rate_hz = 0.0;
        assert!(matches!(
            DataProcessingPipeline::new(config),
            Err(ProcessingError::InvalidSampleRate { .. })
        ));

        let mut p = ratio_pipeline();
        assert!(p.set_sample_rate(f64::NAN).is_err());
        assert!(p.set_sample_rate(-1.0).is_err());
        assert_eq!(p.sample_rate(), 10.0);
    }

    #[test]
    fn test_malformed_sample_keeps_state() {
        let mut p = ratio_pipeline();
        calibrate(&mut p);
        let before = p.baseline().cloned();

        let mut bad = vec![100.0; 16];
        bad[2] = 0.0;
        assert!(p.process(&bad).is_err());
        assert!(p.process(&[100.0; 5]).is_err());
        assert_eq!(p.baseline().cloned(), before);

        let first = p.process(&[100.0; 16]).unwrap();
        assert_eq!(first.processed().unwrap().sequence, 0);
    }

    #[test]
    fn test_calibrated_layout_must_match() {
        let mut p = ratio_pipeline();
        calibrate(&mut p);
        assert!(matches!(
            p.process(&[100.0; 32]),
            Err(ProcessingError::MalformedSample { length: 32, .. })
        ));
    }

    #[test]
    fn test_ingest_routes_to_calibration() {
        let mut p = ratio_pipeline();
        p.start_calibration();
        assert_eq!(p.ingest(&[100.0; 16]).unwrap(), ProcessOutcome::Calibrating);
        assert_eq!(p.calibrator().collected(), 1);
        p.abort_calibration();
        assert_eq!(p.ingest(&[100.0; 16]).unwrap(), ProcessOutcome::NotCalibrated);
    }

    #[test]
    fn test_optical_density_reference() {
        let mut p = od_pipeline();
        let mut first = vec![0.5; 34];
        first[32] = 1.0;
        first[33] = 3.0;

        let out = p.process(&first).unwrap();
        let sample = out.processed().unwrap();
        assert!(sample.o2hb.iter().all(|v| v.abs() < 1e-12));
        assert_eq!(sample.status, Some(1.0));
        assert_eq!(sample.marker, Some(3.0));
        assert!(matches!(p.baseline(), Some(BaselineKind::Reference(r)) if r.len() == 32));

        let mut second = vec![0.5; 32];
        second[0] = 0.6;
        let out = p.process(&second).unwrap();
        let sample = out.processed().unwrap();
        assert!(sample.o2hb[0] != 0.0);
        assert!(sample.o2hb[1..].iter().all(|v| v.abs() < 1e-12));

        // Width changes are rejected without dropping the reference
        assert!(p.process(&[0.5; 16]).is_err());
        assert!(p.baseline().is_some());
    }

    #[test]
    fn test_optical_density_single_channel_alert() {
        let mut p = od_pipeline();
        p.set_alert_rules(0.004, 1.0).unwrap();
        p.process(&[0.5; 16]).unwrap();

        // Raise the first-wavelength OD of channel 1 only
        let mut active = vec![0.5; 16];
        active[0] = 0.51;
        let mut last = None;
        for _ in 0..10 {
            last = p.process(&active).unwrap().processed().and_then(|s| s.alert);
        }
        let hb = p.process(&active).unwrap();
        let sample = hb.processed().unwrap();
        assert!(sample.o2hb[0] > 0.004);
        assert_eq!(last, Some(AlertState::Load));
        assert_eq!(sample.alert, Some(AlertState::Load));
    }

    #[test]
    fn test_optical_density_quality_uses_mode_bound() {
        let mut p = od_pipeline();
        let mut last = None;
        for i in 0..30 {
            // 32 optical densities and a marker, no status field
            let mut raw = vec![if i % 2 == 0 { 0.497 } else { 0.503 }; 33];
            raw[32] = 0.0;
            last = p.process(&raw).unwrap().processed().and_then(|s| s.quality.clone());
        }
        assert_eq!(last, Some(vec![QualityTag::Ok; 8]));

        // A flat trace is still caught
        let mut flat = od_pipeline();
        for _ in 0..30 {
            last = flat.process(&[0.5; 33]).unwrap().processed().and_then(|s| s.quality.clone());
        }
        assert_eq!(last, Some(vec![QualityTag::Degraded; 8]));
    }

    #[test]
    fn test_set_sample_rate_invalidates_calibration() {
        let mut p = ratio_pipeline();
        calibrate(&mut p);
        assert!(p.baseline().is_some());

        p.set_sample_rate(20.0).unwrap();
        assert_eq!(p.sample_rate(), 20.0);
        assert!(p.baseline().is_none());
        assert!(p.channel_map().is_none());
        assert_eq!(p.calibrator().required_samples(), 160);
        assert_eq!(p.process(&[100.0; 16]).unwrap(), ProcessOutcome::NotCalibrated);
    }

    #[test]
    fn test_reset_restarts_session() {
        let mut p = ratio_pipeline();
        calibrate(&mut p);
        p.process(&[100.0; 16]).unwrap();
        p.process(&[100.0; 16]).unwrap();

        p.reset();
        assert!(p.baseline().is_none());
        calibrate(&mut p);
        let out = p.process(&[100.0; 16]).unwrap();
        assert_eq!(out.processed().unwrap().sequence, 0);
    }

    #[test]
    fn test_disabled_outputs() {
        let mut config = PipelineConfig::default();
        config.quality.enabled = false;
        config.alert.enabled = false;
        let mut p = DataProcessingPipeline::new(config).unwrap();
        calibrate(&mut p);

        let out = p.process(&[100.0; 16]).unwrap();
        let sample = out.processed().unwrap();
        assert!(sample.quality.is_none());
        assert!(sample.alert.is_none());
    }

    #[test]
    fn test_invalid_alert_rules() {
        let mut p = ratio_pipeline();
        assert!(p.set_alert_rules(f64::NAN, 3.0).is_err());
        assert!(p.set_alert_rules(0.01, 0.0).is_err());
        assert!(p.set_alert_rules(0.01, 15.0).is_ok());
        assert_eq!(p.config().alert.history_seconds, 15.0);
    }
}
