// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use super::calibration::{BaselineCalibrator, CalibrationState};
use crate::config::PipelineConfig;
use crate::error::ProcessingError;
use crate::processing::QualityTag;

#[cfg(test)]
mod tests {
    use super::*;

    fn calibrator() -> BaselineCalibrator {
        BaselineCalibrator::new(&PipelineConfig::default())
    }

    fn alternating(index: usize, width: usize) -> Vec<f64> {
        let value = if index % 2 == 0 { 95.0 } else { 105.0 };
        vec![value; width]
    }

    #[test]
    fn test_successful_calibration() {
        let mut cal = calibrator();
        assert_eq!(cal.required_samples(), 80);
        cal.start();
        for i in 0..80 {
            cal.add_sample(&alternating(i, 16)).unwrap();
        }
        assert_eq!(cal.collected(), 80);

        let calibration = cal.finish().unwrap();
        assert_eq!(cal.state(), CalibrationState::Succeeded);
        assert_eq!(cal.collected(), 0);
        assert_eq!(calibration.baseline.len(), 16);
        assert!(calibration
            .baseline
            .iter()
            .all(|v| (v - 100.0).abs() < 1e-9));
        assert_eq!(calibration.mapped_rows.len(), 80);
        assert_eq!(calibration.channel_map.pairs().len(), 8);
    }

    #[test]
    fn test_dual_bank_calibration_maps_to_sixteen() {
        let mut cal = calibrator();
        cal.start();
        for i in 0..80 {
            let mut row = vec![4.81625; 32];
            // Active pairs 1, 2, 5, 6 in bank 0 and 8, 9, 12, 13 in bank 1
            for pair in [1, 2, 5, 6, 8, 9, 12, 13] {
                let value = if i % 2 == 0 { 90.0 } else { 110.0 };
                row[2 * pair] = value;
                row[2 * pair + 1] = value + 10.0;
            }
            row.push(0.0);
            cal.add_sample(&row).unwrap();
        }

        let calibration = cal.finish().unwrap();
        let firsts: Vec<usize> = calibration
            .channel_map
            .pairs()
            .iter()
            .map(|p| p.first)
            .collect();
        assert_eq!(firsts, vec![2, 4, 10, 12, 16, 18, 24, 26]);
        assert_eq!(calibration.baseline.len(), 16);
        assert!((calibration.baseline[0] - 100.0).abs() < 1e-9);
        assert!((calibration.baseline[1] - 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_data() {
        let mut cal = calibrator();
        cal.start();
        for i in 0..79 {
            cal.add_sample(&alternating(i, 16)).unwrap();
        }
        assert_eq!(
            cal.finish().unwrap_err(),
            ProcessingError::CalibrationInsufficientData {
                collected: 79,
                required: 80
            }
        );
        assert_eq!(cal.state(), CalibrationState::Failed);
        assert_eq!(cal.collected(), 0);

        // A new run starts from a clean buffer
        cal.start();
        assert_eq!(cal.collected(), 0);
        assert_eq!(cal.state(), CalibrationState::Collecting);
    }

    #[test]
    fn test_mixed_widths_are_rejected() {
        let mut cal = calibrator();
        cal.start();
        for i in 0..80 {
            let width = if i == 40 { 32 } else { 16 };
            cal.add_sample(&alternating(i, width)).unwrap();
        }
        assert!(matches!(
            cal.finish(),
            Err(ProcessingError::CalibrationShapeInvalid { .. })
        ));
        assert_eq!(cal.state(), CalibrationState::Failed);
    }

    #[test]
    fn test_finish_outside_collecting() {
        let mut cal = calibrator();
        assert_eq!(cal.finish().unwrap_err(), ProcessingError::CalibrationNotActive);
    }

    #[test]
    fn test_malformed_sample_leaves_buffer_untouched() {
        let mut cal = calibrator();
        cal.start();
        cal.add_sample(&[1.0; 16]).unwrap();
        let mut bad = vec![1.0; 16];
        bad[3] = -2.0;
        assert!(cal.add_sample(&bad).is_err());
        assert!(cal.add_sample(&[1.0; 20]).is_err());
        assert_eq!(cal.collected(), 1);
    }

    #[test]
    fn test_samples_ignored_when_idle() {
        let mut cal = calibrator();
        assert!(cal.add_sample(&[1.0; 16]).is_ok());
        assert!(cal.add_sample(&[1.0; 3]).is_err());
        assert_eq!(cal.collected(), 0);
    }

    #[test]
    fn test_abort_clears_buffer() {
        let mut cal = calibrator();
        cal.start();
        for i in 0..10 {
            cal.add_sample(&alternating(i, 16)).unwrap();
        }
        cal.abort();
        assert_eq!(cal.state(), CalibrationState::Idle);
        assert_eq!(cal.collected(), 0);
    }

    #[test]
    fn test_live_quality_estimate() {
        let mut cal = calibrator();
        cal.start();
        assert!(cal.estimate_quality().is_empty());

        for i in 0..20 {
            let mut row = alternating(i, 16);
            // Pair 3 is flat
            row[6] = 50.0;
            row[7] = 50.0;
            cal.add_sample(&row).unwrap();
        }

        let tags = cal.estimate_quality();
        assert_eq!(tags.len(), 8);
        assert_eq!(tags[3], QualityTag::Degraded);
        assert!(tags
            .iter()
            .enumerate()
            .all(|(i, t)| i == 3 || *t == QualityTag::Ok));
        // Estimating does not consume the buffer
        assert_eq!(cal.collected(), 20);
    }

    #[test]
    fn test_resize_changes_required_count() {
        let mut cal = calibrator();
        cal.resize(50.0);
        assert_eq!(cal.required_samples(), 400);
    }
}
