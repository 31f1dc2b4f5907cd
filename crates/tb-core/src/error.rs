//! Error types for Triband

use thiserror::Error;

/// Core error type
///
/// Every variant is built from `Copy` data so returning one from the audio
/// thread never allocates.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum TbError {
    #[error("Invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    #[error("Channel mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Block of {frames} frames exceeds prepared capacity of {capacity}")]
    BlockTooLarge { frames: usize, capacity: usize },

    #[error("Processor used before prepare")]
    NotPrepared,
}

impl TbError {
    #[inline]
    pub const fn invalid(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParameter { name, value, reason }
    }
}

/// Result type alias
pub type TbResult<T> = Result<T, TbError>;
