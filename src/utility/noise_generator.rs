// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-fnirs project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Gaussian Noise Generator
//!
//! Lightweight Gaussian jitter for simulated optode intensities.
//!
//! ## Features
//!
//! * Fast XORShift pseudo-random number generation
//! * Box-Muller transform for Gaussian distribution
//! * Reproducible sequences from a fixed seed
//!
//! ## Examples
//!
//! ```rust
//! use rust_fnirs::utility::noise_generator::NoiseGenerator;
//!
//! let mut generator = NoiseGenerator::new(12345);
//!
//! // Jitter a 16-value intensity row with a standard deviation of 5
//! let mut row = vec![1000.0; 16];
//! generator.add_jitter(&mut row, 5.0);
//! ```

use std::time::SystemTime;

/// Random number generator using the XORShift algorithm.
///
/// Not suitable for cryptographic purposes.
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    /// Internal XORShift state, never zero
    rng_state: u32,
}

impl NoiseGenerator {
    /// Creates a new noise generator with a given seed.
    ///
    /// The same seed always produces the same sequence. A zero seed is
    /// replaced by one, since XORShift would otherwise stay at zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_fnirs::utility::noise_generator::NoiseGenerator;
    ///
    /// let mut a = NoiseGenerator::new(42);
    /// let mut b = NoiseGenerator::new(42);
    /// assert_eq!(a.random_float(), b.random_float());
    /// ```
    pub fn new(seed: u32) -> Self {
        Self {
            rng_state: seed.max(1),
        }
    }

    /// Creates a new noise generator seeded from the system time
    pub fn new_from_system_time() -> Self {
        let seed = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u32;
        Self::new(seed)
    }

    /// Generates a random number between -1.0 and 1.0
    pub fn random_float(&mut self) -> f64 {
        self.rng_state ^= self.rng_state << 13;
        self.rng_state ^= self.rng_state >> 17;
        self.rng_state ^= self.rng_state << 5;

        (self.rng_state as f64 / u32::MAX as f64) * 2.0 - 1.0
    }

    /// Generates a value from a standard Gaussian distribution.
    ///
    /// Box-Muller transform:
    /// ```text
    /// z = sqrt(-2 * ln(u1)) * cos(2 * π * u2)
    /// ```
    pub fn random_gaussian(&mut self) -> f64 {
        let u1 = (self.random_float() + 1.0) / 2.0;
        let u2 = (self.random_float() + 1.0) / 2.0;

        // Avoid ln(0)
        let u1 = u1.max(1e-4);

        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// Gaussian value with the given standard deviation
    pub fn gaussian(&mut self, std_dev: f64) -> f64 {
        self.random_gaussian() * std_dev
    }

    /// Add independent Gaussian jitter to every value of `values`
    pub fn add_jitter(&mut self, values: &mut [f64], std_dev: f64) {
        for value in values.iter_mut() {
            *value += self.gaussian(std_dev);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reproducible_sequence() {
        let mut a = NoiseGenerator::new(7);
        let mut b = NoiseGenerator::new(7);
        for _ in 0..100 {
            assert_eq!(a.random_gaussian(), b.random_gaussian());
        }
    }

    #[test]
    fn test_zero_seed_still_moves() {
        let mut generator = NoiseGenerator::new(0);
        let first = generator.random_float();
        let second = generator.random_float();
        assert_ne!(first, second);
    }

    #[test]
    fn test_gaussian_statistics() {
        let mut generator = NoiseGenerator::new(12345);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| generator.gaussian(3.0)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;

        assert!(mean.abs() < 0.2, "mean {}", mean);
        assert!((var.sqrt() - 3.0).abs() < 0.3, "std {}", var.sqrt());
    }

    #[test]
    fn test_random_float_range() {
        let mut generator = NoiseGenerator::new(99);
        for _ in 0..1000 {
            let v = generator.random_float();
            assert!((-1.0..=1.0).contains(&v));
        }
    }
}
