//! Error types for offline rendering

use thiserror::Error;

use tb_core::TbError;

/// Offline rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Unsupported WAV format: {bits}-bit {format}")]
    UnsupportedFormat { bits: u16, format: &'static str },

    #[error("Invalid preset: {0}")]
    Preset(#[from] serde_json::Error),

    #[error("Invalid block size: {0}")]
    InvalidBlockSize(usize),

    #[error("Engine error: {0}")]
    Engine(#[from] TbError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for rendering
pub type RenderResult<T> = Result<T, RenderError>;
