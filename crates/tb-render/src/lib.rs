//! tb-render: Offline host for the Triband engine
//!
//! Reads a WAV file, runs it through [`tb_dsp::MultibandEngine`] block by
//! block with parameters from a JSON preset, and writes 32-bit float WAV.

pub mod error;
pub mod render;
pub mod wav;

pub use error::{RenderError, RenderResult};
pub use render::{DEFAULT_BLOCK_SIZE, Overrides, RenderReport, load_preset, render};
pub use wav::{WavAudio, read_wav, write_wav};
