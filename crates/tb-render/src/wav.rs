//! WAV file I/O (via hound)
//!
//! Reads 16/24/32-bit integer and 32-bit float PCM, writes 32-bit float.

use std::io::{Read, Seek, Write};
use std::path::Path;

use crate::error::{RenderError, RenderResult};

/// Decoded audio, interleaved, normalized to [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct WavAudio {
    pub sample_rate: u32,
    pub channels: usize,
    pub samples: Vec<f64>,
}

impl WavAudio {
    pub fn num_frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    /// Largest absolute sample
    pub fn peak(&self) -> f64 {
        self.samples.iter().fold(0.0, |acc: f64, s| acc.max(s.abs()))
    }
}

pub fn read_wav(path: &Path) -> RenderResult<WavAudio> {
    let reader = hound::WavReader::open(path)?;
    decode(reader)
}

pub fn decode<R: Read>(reader: hound::WavReader<R>) -> RenderResult<WavAudio> {
    let spec = reader.spec();

    let samples: Vec<f64> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, bits @ (16 | 24 | 32)) => {
            let max_val = (1i64 << (bits - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f64 / max_val))
                .collect::<Result<_, _>>()?
        }
        (hound::SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>()?,
        (format, bits) => {
            return Err(RenderError::UnsupportedFormat {
                bits,
                format: match format {
                    hound::SampleFormat::Int => "integer",
                    hound::SampleFormat::Float => "float",
                },
            });
        }
    };

    Ok(WavAudio {
        sample_rate: spec.sample_rate,
        channels: spec.channels as usize,
        samples,
    })
}

pub fn write_wav(path: &Path, audio: &WavAudio) -> RenderResult<()> {
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    encode(file, audio)
}

/// Write `audio` as 32-bit float WAV
pub fn encode<W: Write + Seek>(writer: W, audio: &WavAudio) -> RenderResult<()> {
    let spec = hound::WavSpec {
        channels: audio.channels as u16,
        sample_rate: audio.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::new(writer, spec)?;
    for &sample in &audio.samples {
        writer.write_sample(sample as f32)?;
    }
    writer.finalize()?;
    Ok(())
}
