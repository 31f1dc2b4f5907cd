//! tb-dsp: Real-time DSP for the Triband multiband compressor
//!
//! ## Modules
//! - `biquad` - TDF-II second-order sections (lowpass, highpass)
//! - `crossover` - Three-band splitter built from cascaded sections
//! - `dynamics` - Soft-knee compressor with dB-domain ballistics
//! - `multiband` - Engine tying splitter, compressors and summation together
//!
//! Nothing reachable from a `process*` method allocates, locks or panics on
//! bad input. Storage is sized in `prepare`; errors come back as
//! [`tb_core::TbError`] values.

pub mod biquad;
pub mod crossover;
pub mod dynamics;
pub mod multiband;

pub use crossover::{BandBuffers, BandSplitter};
pub use dynamics::{CompressorParams, DynamicsUnit};
pub use multiband::{EngineConfig, MultibandEngine};

use tb_core::Sample;

/// Trait for all DSP processors
pub trait Processor: Send + Sync {
    /// Reset processor state
    fn reset(&mut self);

    /// Get latency in samples
    fn latency(&self) -> usize {
        0
    }
}

/// Mono processor trait
pub trait MonoProcessor: Processor {
    /// Process a single sample
    fn process_sample(&mut self, input: Sample) -> Sample;

    /// Process a block of samples
    fn process_block(&mut self, buffer: &mut [Sample]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }
}
