//! Biquad filter implementation using Transposed Direct Form II
//!
//! TDF-II is numerically optimal for floating-point arithmetic,
//! minimizing quantization noise and ensuring stability.

use tb_core::Sample;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

use crate::{MonoProcessor, Processor};

/// Q of a second-order Butterworth section
pub const BUTTERWORTH_Q: f64 = FRAC_1_SQRT_2;

/// Biquad coefficients, normalized so a0 = 1
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Calculate lowpass filter coefficients
    pub fn lowpass(freq: f64, q: f64, sample_rate: f64) -> Self {
        let omega = 2.0 * PI * freq / sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * q);

        let b0 = (1.0 - cos_omega) / 2.0;
        let b1 = 1.0 - cos_omega;
        let b2 = (1.0 - cos_omega) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Calculate highpass filter coefficients
    pub fn highpass(freq: f64, q: f64, sample_rate: f64) -> Self {
        let omega = 2.0 * PI * freq / sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * q);

        let b0 = (1.0 + cos_omega) / 2.0;
        let b1 = -(1.0 + cos_omega);
        let b2 = (1.0 + cos_omega) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Bypass (unity gain, no filtering)
    pub fn bypass() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    /// Both poles strictly inside the unit circle (Jury criterion)
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }
}

/// Transposed Direct Form II biquad filter
#[derive(Debug, Clone)]
pub struct BiquadTDF2 {
    coeffs: BiquadCoeffs,
    z1: f64,
    z2: f64,
}

impl BiquadTDF2 {
    pub fn new() -> Self {
        Self::with_coeffs(BiquadCoeffs::bypass())
    }

    pub fn with_coeffs(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Swap coefficients, keeping the filter memory
    #[inline]
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    #[inline]
    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }
}

impl Default for BiquadTDF2 {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for BiquadTDF2 {
    fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

impl MonoProcessor for BiquadTDF2 {
    #[inline(always)]
    fn process_sample(&mut self, input: Sample) -> Sample {
        let output = self.coeffs.b0 * input + self.z1;
        self.z1 = self.coeffs.b1 * input - self.coeffs.a1 * output + self.z2;
        self.z2 = self.coeffs.b2 * input - self.coeffs.a2 * output;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bypass() {
        let mut filter = BiquadTDF2::new();

        let input = 0.5;
        let output = filter.process_sample(input);
        assert!((output - input).abs() < 1e-10);
    }

    #[test]
    fn test_lowpass_dc() {
        let mut filter = BiquadTDF2::with_coeffs(BiquadCoeffs::lowpass(1000.0, BUTTERWORTH_Q, 48000.0));

        // DC signal should pass through lowpass
        for _ in 0..1000 {
            filter.process_sample(1.0);
        }
        let output = filter.process_sample(1.0);
        assert!((output - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_highpass_dc() {
        let mut filter = BiquadTDF2::with_coeffs(BiquadCoeffs::highpass(1000.0, BUTTERWORTH_Q, 48000.0));

        // DC signal should be blocked by highpass
        for _ in 0..1000 {
            filter.process_sample(1.0);
        }
        let output = filter.process_sample(1.0);
        assert!(output.abs() < 0.01);
    }

    #[test]
    fn test_crossover_range_is_stable() {
        for sample_rate in [22050.0, 44100.0, 48000.0, 96000.0] {
            for freq in [20.0, 150.0, 600.0, 1000.0, 4000.0, 10000.0] {
                assert!(BiquadCoeffs::lowpass(freq, BUTTERWORTH_Q, sample_rate).is_stable());
                assert!(BiquadCoeffs::highpass(freq, BUTTERWORTH_Q, sample_rate).is_stable());
            }
        }
    }

    #[test]
    fn test_set_coeffs_keeps_memory() {
        let mut filter = BiquadTDF2::with_coeffs(BiquadCoeffs::lowpass(500.0, BUTTERWORTH_Q, 48000.0));
        for _ in 0..100 {
            filter.process_sample(1.0);
        }
        let z1 = filter.z1;
        filter.set_coeffs(BiquadCoeffs::lowpass(600.0, BUTTERWORTH_Q, 48000.0));
        assert_eq!(filter.z1, z1);
        assert!(z1 != 0.0);
    }

    #[test]
    fn test_reset() {
        let mut filter = BiquadTDF2::with_coeffs(BiquadCoeffs::lowpass(1000.0, BUTTERWORTH_Q, 48000.0));

        // Process some samples
        for _ in 0..100 {
            filter.process_sample(1.0);
        }

        // Reset
        filter.reset();

        // State should be cleared
        assert_eq!(filter.z1, 0.0);
        assert_eq!(filter.z2, 0.0);
    }
}
