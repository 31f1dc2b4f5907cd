//! Three-band crossover
//!
//! Each band edge is a pair of identical second-order Butterworth sections
//! (24 dB/oct):
//! - low  = LP(low split) x2
//! - mid  = HP(low split) x2 then LP(high split) x2
//! - high = HP(high split) x2
//!
//! The low/mid/high outputs are not power complementary. Summed they
//! approximate the input only away from the split points; that is the
//! intended behaviour of this network, not a Linkwitz-Riley design.

use tb_core::{AudioBuffer, BandId, Sample, TbError, TbResult};

use crate::biquad::{BiquadCoeffs, BiquadTDF2, BUTTERWORTH_Q};
use crate::{MonoProcessor, Processor};

/// Second-order sections per filter
pub const SECTIONS_PER_FILTER: usize = 2;

// ============ Coefficients ============

/// Coefficients of the four filters that make up the network
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossoverCoeffs {
    pub low_lowpass: BiquadCoeffs,
    pub low_highpass: BiquadCoeffs,
    pub high_lowpass: BiquadCoeffs,
    pub high_highpass: BiquadCoeffs,
}

impl CrossoverCoeffs {
    /// Derive coefficients for a pair of split points.
    ///
    /// Rejects anything that would put a pole on or outside the unit circle:
    /// splits must be finite, inside (0, Nyquist) and strictly ordered.
    pub fn new(sample_rate: f64, low_split_hz: f64, high_split_hz: f64) -> TbResult<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(TbError::InvalidSampleRate(sample_rate));
        }
        let nyquist = sample_rate / 2.0;
        for (name, freq) in [("lowCutOff", low_split_hz), ("highCutOff", high_split_hz)] {
            if !freq.is_finite() || freq <= 0.0 || freq >= nyquist {
                return Err(TbError::invalid(name, freq, "must lie inside (0, sample_rate / 2)"));
            }
        }
        if low_split_hz >= high_split_hz {
            return Err(TbError::invalid("lowCutOff", low_split_hz, "must be below highCutOff"));
        }

        Ok(Self::compute(sample_rate, low_split_hz, high_split_hz))
    }

    fn compute(sample_rate: f64, low_split_hz: f64, high_split_hz: f64) -> Self {
        Self {
            low_lowpass: BiquadCoeffs::lowpass(low_split_hz, BUTTERWORTH_Q, sample_rate),
            low_highpass: BiquadCoeffs::highpass(low_split_hz, BUTTERWORTH_Q, sample_rate),
            high_lowpass: BiquadCoeffs::lowpass(high_split_hz, BUTTERWORTH_Q, sample_rate),
            high_highpass: BiquadCoeffs::highpass(high_split_hz, BUTTERWORTH_Q, sample_rate),
        }
    }
}

// ============ Cascade ============

/// Identical sections run in series
#[derive(Debug, Clone, Default)]
struct Cascade {
    stages: [BiquadTDF2; SECTIONS_PER_FILTER],
}

impl Cascade {
    fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        for stage in &mut self.stages {
            stage.set_coeffs(coeffs);
        }
    }

    /// Run each section over the whole block before the next one
    #[inline]
    fn process_block(&mut self, buffer: &mut [Sample]) {
        for stage in &mut self.stages {
            stage.process_block(buffer);
        }
    }

    fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }
}

/// Filter memory for one channel
#[derive(Debug, Clone, Default)]
struct ChannelFilters {
    low: Cascade,
    mid_highpass: Cascade,
    mid_lowpass: Cascade,
    high: Cascade,
}

impl ChannelFilters {
    fn set_coeffs(&mut self, coeffs: &CrossoverCoeffs) {
        self.low.set_coeffs(coeffs.low_lowpass);
        self.mid_highpass.set_coeffs(coeffs.low_highpass);
        self.mid_lowpass.set_coeffs(coeffs.high_lowpass);
        self.high.set_coeffs(coeffs.high_highpass);
    }

    fn reset(&mut self) {
        self.low.reset();
        self.mid_highpass.reset();
        self.mid_lowpass.reset();
        self.high.reset();
    }
}

// ============ Band buffers ============

/// One working buffer per band, allocated once and reused every block
#[derive(Debug, Clone)]
pub struct BandBuffers {
    pub low: AudioBuffer,
    pub mid: AudioBuffer,
    pub high: AudioBuffer,
}

impl BandBuffers {
    pub fn new(num_channels: usize, capacity: usize) -> Self {
        Self {
            low: AudioBuffer::new(num_channels, capacity),
            mid: AudioBuffer::new(num_channels, capacity),
            high: AudioBuffer::new(num_channels, capacity),
        }
    }

    #[inline]
    pub fn band(&self, band: BandId) -> &AudioBuffer {
        match band {
            BandId::Low => &self.low,
            BandId::Mid => &self.mid,
            BandId::High => &self.high,
        }
    }

    #[inline]
    pub fn band_mut(&mut self, band: BandId) -> &mut AudioBuffer {
        match band {
            BandId::Low => &mut self.low,
            BandId::Mid => &mut self.mid,
            BandId::High => &mut self.high,
        }
    }
}

// ============ Splitter ============

/// Streaming three-band splitter
///
/// Filter memory persists across calls to [`BandSplitter::split`] and across
/// coefficient changes; only [`Processor::reset`] clears it.
#[derive(Debug, Clone)]
pub struct BandSplitter {
    channels: Vec<ChannelFilters>,
    coeffs: CrossoverCoeffs,
    sample_rate: f64,
    low_split_hz: f64,
    high_split_hz: f64,
}

impl BandSplitter {
    /// Create a splitter at the default 450 Hz / 2500 Hz, 48 kHz
    pub fn new(num_channels: usize) -> Self {
        let (sample_rate, low, high) = (48000.0, 450.0, 2500.0);
        let mut splitter = Self {
            channels: vec![ChannelFilters::default(); num_channels],
            coeffs: CrossoverCoeffs::compute(sample_rate, low, high),
            sample_rate,
            low_split_hz: low,
            high_split_hz: high,
        };
        splitter.apply_coeffs();
        splitter
    }

    /// Recompute coefficients for the given rate and split points.
    ///
    /// Cheap enough to call every block. Invalid values are rejected and the
    /// previous coefficients stay in place.
    pub fn configure(&mut self, sample_rate: f64, low_split_hz: f64, high_split_hz: f64) -> TbResult<()> {
        let coeffs = CrossoverCoeffs::new(sample_rate, low_split_hz, high_split_hz)?;
        self.coeffs = coeffs;
        self.sample_rate = sample_rate;
        self.low_split_hz = low_split_hz;
        self.high_split_hz = high_split_hz;
        self.apply_coeffs();
        Ok(())
    }

    fn apply_coeffs(&mut self) {
        for channel in &mut self.channels {
            channel.set_coeffs(&self.coeffs);
        }
    }

    #[inline]
    pub fn coeffs(&self) -> &CrossoverCoeffs {
        &self.coeffs
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Current split points (Hz)
    pub fn splits(&self) -> (f64, f64) {
        (self.low_split_hz, self.high_split_hz)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Copy `input` into each band buffer and filter it in place.
    pub fn split(&mut self, input: &AudioBuffer, bands: &mut BandBuffers) -> TbResult<()> {
        if input.num_channels() != self.channels.len() {
            return Err(TbError::ChannelMismatch {
                expected: self.channels.len(),
                actual: input.num_channels(),
            });
        }
        for band in BandId::ALL {
            let buffer = bands.band(band);
            if buffer.num_channels() != self.channels.len() {
                return Err(TbError::ChannelMismatch {
                    expected: self.channels.len(),
                    actual: buffer.num_channels(),
                });
            }
            if buffer.capacity() < input.num_frames() {
                return Err(TbError::BlockTooLarge {
                    frames: input.num_frames(),
                    capacity: buffer.capacity(),
                });
            }
        }

        bands.low.copy_from(input);
        bands.mid.copy_from(input);
        bands.high.copy_from(input);

        for (ch, filters) in self.channels.iter_mut().enumerate() {
            filters.low.process_block(bands.low.channel_mut(ch));

            let mid = bands.mid.channel_mut(ch);
            filters.mid_highpass.process_block(mid);
            filters.mid_lowpass.process_block(mid);

            filters.high.process_block(bands.high.channel_mut(ch));
        }
        Ok(())
    }
}

impl Processor for BandSplitter {
    fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
    }
}
