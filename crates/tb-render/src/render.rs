//! Offline rendering
//!
//! Drives the engine the way a host would: parameters are published once
//! into a [`SharedParams`] store, then the file is fed through in blocks no
//! longer than the prepared size, each block reading its own snapshot.

use std::path::Path;

use tb_core::{AudioBuffer, BandId, ParamSnapshot, SharedParams};
use tb_dsp::MultibandEngine;

use crate::error::{RenderError, RenderResult};
use crate::wav::WavAudio;

pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Command-line overrides applied on top of a preset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub bypass: [bool; 3],
    pub low_split_hz: Option<f64>,
    pub high_split_hz: Option<f64>,
    pub output_gain: Option<f64>,
}

impl Overrides {
    pub fn apply(&self, snapshot: &mut ParamSnapshot) {
        for band in BandId::ALL {
            if self.bypass[band.index()] {
                snapshot.band_mut(band).enabled = false;
            }
        }
        if let Some(hz) = self.low_split_hz {
            snapshot.low_split_hz = hz;
        }
        if let Some(hz) = self.high_split_hz {
            snapshot.high_split_hz = hz;
        }
        if let Some(gain) = self.output_gain {
            snapshot.output_gain = gain;
        }
    }
}

/// Summary of one render
#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    pub frames: usize,
    pub blocks: usize,
    /// Deepest gain reduction seen at any block boundary, per band (dB)
    pub peak_reduction_db: [f64; 3],
    pub input_peak: f64,
    pub output_peak: f64,
}

pub fn load_preset(path: &Path) -> RenderResult<ParamSnapshot> {
    let text = std::fs::read_to_string(path)?;
    let snapshot: ParamSnapshot = serde_json::from_str(&text)?;
    log::info!("Loaded preset {}", path.display());
    Ok(snapshot)
}

/// Run `input` through a freshly prepared engine.
///
/// `params` is published through [`SharedParams`], so out-of-range values
/// are clamped the way a host control would clamp them.
pub fn render(input: &WavAudio, params: &ParamSnapshot, block_size: usize) -> RenderResult<(WavAudio, RenderReport)> {
    if block_size == 0 {
        return Err(RenderError::InvalidBlockSize(block_size));
    }

    let shared = SharedParams::from_snapshot(params)?;
    let mut engine = MultibandEngine::new();
    engine.prepare(f64::from(input.sample_rate), block_size, input.channels)?;

    let mut buffer = AudioBuffer::new(input.channels, block_size);
    let mut samples = Vec::with_capacity(input.samples.len());
    let mut peak_reduction_db = [0.0f64; 3];
    let mut blocks = 0;

    for chunk in input.samples.chunks(block_size * input.channels) {
        buffer.copy_from_interleaved(chunk);
        engine.process_shared(&mut buffer, &shared)?;
        buffer.copy_to_interleaved(&mut samples);

        for band in BandId::ALL {
            let reduction = &mut peak_reduction_db[band.index()];
            *reduction = reduction.min(engine.gain_reduction_db(band));
        }
        blocks += 1;
    }

    let output = WavAudio {
        sample_rate: input.sample_rate,
        channels: input.channels,
        samples,
    };
    let report = RenderReport {
        frames: output.num_frames(),
        blocks,
        peak_reduction_db,
        input_peak: input.peak(),
        output_peak: output.peak(),
    };

    log::info!(
        "Rendered {} frames in {} blocks of up to {}",
        report.frames,
        report.blocks,
        block_size
    );
    for band in BandId::ALL {
        log::info!(
            "  {:>4} band peak gain reduction: {:.2} dB",
            band.name(),
            report.peak_reduction_db[band.index()]
        );
    }

    Ok((output, report))
}
