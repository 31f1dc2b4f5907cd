//! Per-band compressor
//!
//! Gain is computed and smoothed in the dB domain, per sample:
//! 1. peak level of the sample in dBFS, floored at [`tb_core::DB_FLOOR`]
//! 2. soft-knee static curve gives the target gain
//! 3. one-pole ballistics move the envelope toward the target, using the
//!    attack constant when more attenuation is needed, release otherwise
//! 4. envelope and makeup gain are applied in place
//!
//! The unit has no bypass. Whoever owns it decides whether to call it.

use tb_core::{AudioBuffer, BandParams, Decibels, Sample, TbError, TbResult};

use crate::Processor;

// ============ Parameters ============

/// Compressor settings, fixed for the duration of a block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorParams {
    /// Ratio (1 = no compression)
    pub ratio: f64,
    /// Threshold (dB)
    pub threshold_db: f64,
    /// Attack (ms)
    pub attack_ms: f64,
    /// Release (ms)
    pub release_ms: f64,
    /// Makeup gain (linear)
    pub makeup_gain: f64,
    /// Knee width (dB)
    pub knee_db: f64,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            ratio: 1.0,
            threshold_db: 0.0,
            attack_ms: 5.0,
            release_ms: 5.0,
            makeup_gain: 1.0,
            knee_db: 5.0,
        }
    }
}

impl CompressorParams {
    /// Band settings plus the knee width shared by all bands
    pub fn from_band(band: &BandParams, knee_db: f64) -> Self {
        Self {
            ratio: band.ratio,
            threshold_db: band.threshold_db,
            attack_ms: band.attack_ms,
            release_ms: band.release_ms,
            makeup_gain: band.gain,
            knee_db,
        }
    }

    pub fn validate(&self) -> TbResult<()> {
        let fields = [
            ("ratio", self.ratio),
            ("threshold", self.threshold_db),
            ("attack", self.attack_ms),
            ("release", self.release_ms),
            ("makeupGain", self.makeup_gain),
            ("kneeWidth", self.knee_db),
        ];
        if let Some(&(name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(TbError::invalid(name, value, "must be finite"));
        }
        if self.ratio < 1.0 {
            return Err(TbError::invalid("ratio", self.ratio, "must be >= 1"));
        }
        if self.threshold_db > 0.0 {
            return Err(TbError::invalid("threshold", self.threshold_db, "must be <= 0 dB"));
        }
        if self.attack_ms <= 0.0 {
            return Err(TbError::invalid("attack", self.attack_ms, "must be positive"));
        }
        if self.release_ms <= 0.0 {
            return Err(TbError::invalid("release", self.release_ms, "must be positive"));
        }
        if self.makeup_gain < 0.0 {
            return Err(TbError::invalid("makeupGain", self.makeup_gain, "must be >= 0"));
        }
        if self.knee_db < 0.0 {
            return Err(TbError::invalid("kneeWidth", self.knee_db, "must be >= 0"));
        }
        Ok(())
    }
}

// ============ Gain computer ============

/// Peak level of one sample in dBFS, never below [`tb_core::DB_FLOOR`]
#[inline]
pub fn level_db(sample: Sample) -> f64 {
    Decibels::from_gain(sample).get()
}

/// Static soft-knee curve: gain in dB (<= 0) for an input level in dB.
///
/// Zero below the knee, the hard-knee law above it, and a quadratic through
/// the knee that meets both with matching value and slope. With a zero-width
/// knee the middle branch is never taken, so there is no division by zero.
#[inline]
pub fn static_gain_db(level_db: f64, threshold_db: f64, ratio: f64, knee_db: f64) -> f64 {
    let half_knee = knee_db / 2.0;

    if level_db <= threshold_db - half_knee {
        0.0
    } else if level_db >= threshold_db + half_knee {
        (threshold_db + (level_db - threshold_db) / ratio) - level_db
    } else {
        let x = level_db - threshold_db + half_knee;
        ((1.0 / ratio - 1.0) * x * x) / (2.0 * knee_db)
    }
}

/// One-pole coefficient for a time constant in ms
#[inline]
pub fn smoothing_coeff(time_ms: f64, sample_rate: f64) -> f64 {
    (-1.0 / (time_ms * 0.001 * sample_rate)).exp()
}

// ============ Envelope ============

/// Smoothed gain (dB) for one channel.
///
/// Holds the previous sample's value between samples and between blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnvelopeState {
    pub gain_db: f64,
}

impl EnvelopeState {
    #[inline(always)]
    fn advance(&mut self, target_db: f64, attack_coeff: f64, release_coeff: f64) -> f64 {
        let coeff = if target_db < self.gain_db {
            attack_coeff
        } else {
            release_coeff
        };
        self.gain_db = coeff * self.gain_db + (1.0 - coeff) * target_db;
        self.gain_db
    }
}

// ============ Dynamics unit ============

/// Soft-knee compressor for one band, any number of channels.
///
/// Channels are detected and smoothed independently (unlinked).
#[derive(Debug, Clone)]
pub struct DynamicsUnit {
    params: CompressorParams,
    sample_rate: f64,
    attack_coeff: f64,
    release_coeff: f64,
    envelopes: Vec<EnvelopeState>,
    prepared: bool,
}

impl DynamicsUnit {
    pub fn new() -> Self {
        let params = CompressorParams::default();
        let sample_rate = 48000.0;
        Self {
            params,
            sample_rate,
            attack_coeff: smoothing_coeff(params.attack_ms, sample_rate),
            release_coeff: smoothing_coeff(params.release_ms, sample_rate),
            envelopes: Vec::new(),
            prepared: false,
        }
    }

    /// Allocate zeroed per-channel envelopes for a new stream.
    pub fn prepare_to_play(&mut self, sample_rate: f64, block_size: usize, num_channels: usize) -> TbResult<()> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(TbError::InvalidSampleRate(sample_rate));
        }
        self.sample_rate = sample_rate;
        self.envelopes = vec![EnvelopeState::default(); num_channels];
        self.update_coefficients();
        self.prepared = true;

        log::trace!(
            "dynamics unit prepared: {} Hz, {} frames, {} channels",
            sample_rate,
            block_size,
            num_channels
        );
        Ok(())
    }

    /// Validate and store new settings. Invalid settings leave the old ones.
    pub fn set_parameters(
        &mut self,
        ratio: f64,
        threshold_db: f64,
        attack_ms: f64,
        release_ms: f64,
        makeup_gain: f64,
        knee_db: f64,
    ) -> TbResult<()> {
        self.set_params(CompressorParams {
            ratio,
            threshold_db,
            attack_ms,
            release_ms,
            makeup_gain,
            knee_db,
        })
    }

    pub fn set_params(&mut self, params: CompressorParams) -> TbResult<()> {
        params.validate()?;
        if params.attack_ms != self.params.attack_ms || params.release_ms != self.params.release_ms {
            self.params = params;
            self.update_coefficients();
        } else {
            self.params = params;
        }
        Ok(())
    }

    fn update_coefficients(&mut self) {
        self.attack_coeff = smoothing_coeff(self.params.attack_ms, self.sample_rate);
        self.release_coeff = smoothing_coeff(self.params.release_ms, self.sample_rate);
    }

    #[inline]
    pub fn params(&self) -> &CompressorParams {
        &self.params
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.envelopes.len()
    }

    /// Current smoothed gain of one channel in dB (<= 0 unless makeup is
    /// counted, which it is not). Zero for unknown channels.
    pub fn gain_reduction_db(&self, channel: usize) -> f64 {
        self.envelopes.get(channel).map_or(0.0, |e| e.gain_db)
    }

    /// Compress every channel of `buffer` in place.
    pub fn process_block(&mut self, buffer: &mut AudioBuffer) -> TbResult<()> {
        if !self.prepared {
            return Err(TbError::NotPrepared);
        }
        if buffer.num_channels() != self.envelopes.len() {
            return Err(TbError::ChannelMismatch {
                expected: self.envelopes.len(),
                actual: buffer.num_channels(),
            });
        }
        for (ch, samples) in buffer.channels_mut().enumerate() {
            self.process_channel(ch, samples);
        }
        Ok(())
    }

    /// Compress one channel's samples in place.
    ///
    /// `channel` must be below [`DynamicsUnit::num_channels`]; other values
    /// leave the samples untouched.
    pub fn process_channel(&mut self, channel: usize, samples: &mut [Sample]) {
        let CompressorParams {
            ratio,
            threshold_db,
            makeup_gain,
            knee_db,
            ..
        } = self.params;
        let (attack, release) = (self.attack_coeff, self.release_coeff);
        let Some(envelope) = self.envelopes.get_mut(channel) else {
            return;
        };

        for sample in samples.iter_mut() {
            let level = level_db(*sample);
            let target = static_gain_db(level, threshold_db, ratio, knee_db);
            let gain_db = envelope.advance(target, attack, release);
            *sample *= Decibels(gain_db).to_gain() * makeup_gain;
        }
    }
}

impl Default for DynamicsUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for DynamicsUnit {
    fn reset(&mut self) {
        for envelope in &mut self.envelopes {
            *envelope = EnvelopeState::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const SAMPLE_RATE: f64 = 48000.0;

    fn unit(ratio: f64, threshold: f64, attack: f64, release: f64, knee: f64) -> DynamicsUnit {
        let mut unit = DynamicsUnit::new();
        unit.prepare_to_play(SAMPLE_RATE, 512, 1).unwrap();
        unit.set_parameters(ratio, threshold, attack, release, 1.0, knee).unwrap();
        unit
    }

    #[test]
    fn test_no_gain_below_knee() {
        let (threshold, ratio, knee) = (-20.0, 4.0, 10.0);
        for level in [-120.0, -60.0, -30.0, -25.0] {
            assert_eq!(static_gain_db(level, threshold, ratio, knee), 0.0);
        }
    }

    #[test]
    fn test_hard_law_above_knee() {
        let (threshold, ratio, knee) = (-20.0, 4.0, 10.0);
        for level in [-15.0, -10.0, 0.0, 6.0] {
            let expected = (threshold + (level - threshold) / ratio) - level;
            assert_eq!(static_gain_db(level, threshold, ratio, knee), expected);
        }
    }

    #[test]
    fn test_knee_is_continuous_at_both_edges() {
        for (threshold, ratio, knee) in [(-20.0, 4.0, 10.0), (-60.0, 10.0, 100.0), (0.0, 1.5, 5.0)] {
            let half = knee / 2.0;
            let x = half * 2.0;
            let inner_low = ((1.0 / ratio - 1.0) * 0.0) / (2.0 * knee);
            let inner_high = ((1.0 / ratio - 1.0) * x * x) / (2.0 * knee);
            let lower_edge = threshold - half;
            let upper_edge = threshold + half;

            assert_abs_diff_eq!(static_gain_db(lower_edge, threshold, ratio, knee), inner_low, epsilon = 1e-12);
            assert_abs_diff_eq!(static_gain_db(upper_edge, threshold, ratio, knee), inner_high, epsilon = 1e-12);

            // Just inside the knee matches just outside it
            let eps = 1e-9;
            assert_abs_diff_eq!(
                static_gain_db(upper_edge - eps, threshold, ratio, knee),
                static_gain_db(upper_edge + eps, threshold, ratio, knee),
                epsilon = 1e-8
            );
            assert_abs_diff_eq!(
                static_gain_db(lower_edge + eps, threshold, ratio, knee),
                0.0,
                epsilon = 1e-8
            );
        }
    }

    #[test]
    fn test_zero_knee_is_hard_knee() {
        assert_eq!(static_gain_db(-20.0, -20.0, 4.0, 0.0), 0.0);
        assert_eq!(static_gain_db(-10.0, -20.0, 4.0, 0.0), -7.5);
        assert_eq!(static_gain_db(-30.0, -20.0, 4.0, 0.0), 0.0);
    }

    #[test]
    fn test_ratio_one_never_compresses() {
        for level in [-100.0, -20.0, -2.5, 0.0] {
            assert_eq!(static_gain_db(level, -20.0, 1.0, 5.0), 0.0);
        }
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        let mut unit = DynamicsUnit::new();
        assert!(unit.set_parameters(0.5, -20.0, 10.0, 100.0, 1.0, 6.0).is_err());
        assert!(unit.set_parameters(4.0, -20.0, 0.0, 100.0, 1.0, 6.0).is_err());
        assert!(unit.set_parameters(4.0, -20.0, 10.0, -1.0, 1.0, 6.0).is_err());
        assert!(unit.set_parameters(4.0, -20.0, 10.0, 100.0, 1.0, -1.0).is_err());
        assert!(unit.set_parameters(4.0, f64::NAN, 10.0, 100.0, 1.0, 6.0).is_err());
        assert_eq!(*unit.params(), CompressorParams::default());

        assert!(matches!(
            unit.set_parameters(0.9, -20.0, 10.0, 100.0, 1.0, 6.0),
            Err(TbError::InvalidParameter { name: "ratio", .. })
        ));
    }

    #[test]
    fn test_unprepared_unit_refuses_to_process() {
        let mut unit = DynamicsUnit::new();
        let mut buffer = AudioBuffer::new(1, 16);
        assert_eq!(unit.process_block(&mut buffer), Err(TbError::NotPrepared));
    }

    #[test]
    fn test_silence_stays_finite() {
        let mut unit = unit(10.0, -80.0, 5.0, 5.0, 100.0);
        let mut buffer = AudioBuffer::new(1, 512);
        unit.process_block(&mut buffer).unwrap();
        assert!(buffer.channel(0).iter().all(|x| x.is_finite() && *x == 0.0));
        assert!(unit.gain_reduction_db(0).is_finite());
    }

    #[test]
    fn test_attack_reaches_63_percent_after_one_time_constant() {
        let attack_ms = 10.0;
        let mut unit = unit(4.0, -20.0, attack_ms, 100.0, 0.0);
        let samples = (attack_ms * 0.001 * SAMPLE_RATE) as usize;
        let target = static_gain_db(0.0, -20.0, 4.0, 0.0);
        assert_eq!(target, -15.0);

        let mut step = vec![1.0; samples];
        unit.process_channel(0, &mut step);

        let fraction = unit.gain_reduction_db(0) / target;
        assert_relative_eq!(fraction, 1.0 - (-1.0f64).exp(), epsilon = 1e-9);
    }

    #[test]
    fn test_release_recovers_63_percent_after_one_time_constant() {
        let release_ms = 50.0;
        let mut unit = unit(4.0, -20.0, 1.0, release_ms, 0.0);

        // Settle fully into compression
        let mut loud = vec![1.0; 4800];
        unit.process_channel(0, &mut loud);
        let settled = unit.gain_reduction_db(0);
        assert_abs_diff_eq!(settled, -15.0, epsilon = 1e-6);

        let mut quiet = vec![0.0; (release_ms * 0.001 * SAMPLE_RATE) as usize];
        unit.process_channel(0, &mut quiet);

        let remaining = unit.gain_reduction_db(0) / settled;
        assert_relative_eq!(remaining, (-1.0f64).exp(), epsilon = 1e-6);
    }

    #[test]
    fn test_output_follows_envelope_and_makeup() {
        let mut unit = unit(4.0, -20.0, 1.0, 100.0, 0.0);
        unit.set_parameters(4.0, -20.0, 1.0, 100.0, 2.0, 0.0).unwrap();

        let mut block = vec![0.5; 4800];
        unit.process_channel(0, &mut block);

        let level = level_db(0.5);
        let gain = Decibels(static_gain_db(level, -20.0, 4.0, 0.0)).to_gain() * 2.0;
        assert_relative_eq!(block[4799], 0.5 * gain, epsilon = 1e-6);
    }

    #[test]
    fn test_envelope_persists_across_blocks() {
        let mut whole = unit(4.0, -30.0, 5.0, 50.0, 6.0);
        let mut chunked = unit(4.0, -30.0, 5.0, 50.0, 6.0);

        let signal: Vec<f64> = (0..1024).map(|i| (i as f64 * 0.05).sin() * 0.8).collect();
        let mut a = signal.clone();
        whole.process_channel(0, &mut a);

        let mut b = signal;
        for chunk in b.chunks_mut(100) {
            chunked.process_channel(0, chunk);
        }
        assert_eq!(a, b);
    }

    #[test]
    fn test_channels_are_independent() {
        let mut unit = DynamicsUnit::new();
        unit.prepare_to_play(SAMPLE_RATE, 256, 2).unwrap();
        unit.set_parameters(8.0, -30.0, 5.0, 50.0, 1.0, 0.0).unwrap();

        let mut buffer = AudioBuffer::from_channels(vec![vec![0.9; 256], vec![0.001; 256]]);
        unit.process_block(&mut buffer).unwrap();

        assert!(unit.gain_reduction_db(0) < -1.0);
        assert_eq!(unit.gain_reduction_db(1), 0.0);
        assert!(buffer.channel(1).iter().all(|&x| x == 0.001));
    }

    #[test]
    fn test_reset_zeroes_envelopes() {
        let mut unit = unit(4.0, -20.0, 1.0, 100.0, 0.0);
        let mut loud = vec![1.0; 480];
        unit.process_channel(0, &mut loud);
        assert!(unit.gain_reduction_db(0) < 0.0);

        unit.reset();
        assert_eq!(unit.gain_reduction_db(0), 0.0);
    }
}
