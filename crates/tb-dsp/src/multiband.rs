//! Three-band dynamics engine
//!
//! Per block: split the input into low/mid/high, compress each enabled band
//! with its own [`DynamicsUnit`], then sum the bands at equal weight and
//! apply the output gain. Disabled bands are summed unprocessed.

use tb_core::{AudioBuffer, BandId, ParamSnapshot, SharedParams, TbError, TbResult};

use crate::crossover::{BandBuffers, BandSplitter};
use crate::dynamics::{CompressorParams, DynamicsUnit};
use crate::Processor;

/// Weight of each band in the output sum
pub const BAND_WEIGHT: f64 = 1.0 / 3.0;

/// Stream format fixed at prepare time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f64,
    pub max_block_size: usize,
    pub num_channels: usize,
}

impl EngineConfig {
    pub fn validate(&self) -> TbResult<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(TbError::InvalidSampleRate(self.sample_rate));
        }
        if self.num_channels == 0 {
            return Err(TbError::ChannelMismatch {
                expected: 1,
                actual: 0,
            });
        }
        Ok(())
    }
}

/// Splitter, three compressors and the band buffers they work in.
///
/// All storage is sized by [`MultibandEngine::prepare`]. After that,
/// [`MultibandEngine::process`] runs without allocating.
#[derive(Debug)]
pub struct MultibandEngine {
    config: Option<EngineConfig>,
    splitter: BandSplitter,
    units: [DynamicsUnit; 3],
    bands: BandBuffers,
    enabled: [bool; 3],
}

impl MultibandEngine {
    pub fn new() -> Self {
        Self {
            config: None,
            splitter: BandSplitter::new(0),
            units: Default::default(),
            bands: BandBuffers::new(0, 0),
            enabled: [true; 3],
        }
    }

    /// Size every buffer and reset all state for a new stream.
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize, num_channels: usize) -> TbResult<()> {
        let config = EngineConfig {
            sample_rate,
            max_block_size,
            num_channels,
        };
        config.validate()?;

        let defaults = ParamSnapshot::default();
        let mut splitter = BandSplitter::new(num_channels);
        splitter.configure(sample_rate, defaults.low_split_hz, defaults.high_split_hz)?;

        for unit in &mut self.units {
            unit.prepare_to_play(sample_rate, max_block_size, num_channels)?;
        }
        self.splitter = splitter;
        self.bands = BandBuffers::new(num_channels, max_block_size);
        self.enabled = [true; 3];
        self.config = Some(config);

        log::debug!(
            "multiband engine prepared: {} Hz, max {} frames, {} channels",
            sample_rate,
            max_block_size,
            num_channels
        );
        Ok(())
    }

    #[inline]
    pub fn config(&self) -> Option<&EngineConfig> {
        self.config.as_ref()
    }

    #[inline]
    pub fn splitter(&self) -> &BandSplitter {
        &self.splitter
    }

    /// Process one block in place with the given parameter values.
    ///
    /// Every check runs before the buffer is written, so on error the buffer
    /// holds exactly what the caller passed in.
    pub fn process(&mut self, buffer: &mut AudioBuffer, params: &ParamSnapshot) -> TbResult<()> {
        let config = self.config.ok_or(TbError::NotPrepared)?;

        if buffer.num_channels() != config.num_channels {
            return Err(TbError::ChannelMismatch {
                expected: config.num_channels,
                actual: buffer.num_channels(),
            });
        }
        if buffer.num_frames() > config.max_block_size {
            return Err(TbError::BlockTooLarge {
                frames: buffer.num_frames(),
                capacity: config.max_block_size,
            });
        }
        params.validate()?;

        self.splitter
            .configure(config.sample_rate, params.low_split_hz, params.high_split_hz)?;
        for band in BandId::ALL {
            let settings = params.band(band);
            self.units[band.index()].set_params(CompressorParams::from_band(settings, params.knee_width_db))?;
        }

        self.splitter.split(buffer, &mut self.bands)?;

        for band in BandId::ALL {
            let i = band.index();
            let enabled = params.band(band).enabled;
            if enabled {
                if !self.enabled[i] {
                    // Start from unity gain rather than a stale envelope
                    self.units[i].reset();
                }
                self.units[i].process_block(self.bands.band_mut(band))?;
            }
            self.enabled[i] = enabled;
        }

        buffer.clear();
        for band in BandId::ALL {
            buffer.add_from(self.bands.band(band), BAND_WEIGHT);
        }
        buffer.apply_gain(params.output_gain);
        Ok(())
    }

    /// Take a snapshot of `shared` and process with it
    pub fn process_shared(&mut self, buffer: &mut AudioBuffer, shared: &SharedParams) -> TbResult<()> {
        let snapshot = shared.snapshot();
        self.process(buffer, &snapshot)
    }

    /// Deepest current gain reduction of a band across channels, in dB.
    ///
    /// Reads 0 for a band that was disabled on the last block.
    pub fn gain_reduction_db(&self, band: BandId) -> f64 {
        let i = band.index();
        if !self.enabled[i] {
            return 0.0;
        }
        let unit = &self.units[i];
        (0..unit.num_channels())
            .map(|ch| unit.gain_reduction_db(ch))
            .fold(0.0, f64::min)
    }
}

impl Default for MultibandEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for MultibandEngine {
    fn reset(&mut self) {
        self.splitter.reset();
        for unit in &mut self.units {
            unit.reset();
        }
        log::debug!("multiband engine reset");
    }
}
