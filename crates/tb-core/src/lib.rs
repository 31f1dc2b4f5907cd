//! tb-core: Shared types for the Triband multiband dynamics engine
//!
//! Sample and buffer types, the error taxonomy, and the parameter layer that
//! carries control-thread values to the audio thread without locking.

mod sample;
mod params;
mod error;

pub use sample::*;
pub use params::*;
pub use error::*;

/// Lowest level the detectors report, in dB
pub const DB_FLOOR: f64 = -120.0;

/// Decibel value wrapper
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Decibels(pub f64);

impl Decibels {
    pub const ZERO: Self = Self(0.0);
    pub const FLOOR: Self = Self(DB_FLOOR);

    /// Convert a linear magnitude, clamped to [`DB_FLOOR`] so silence stays finite
    #[inline]
    pub fn from_gain(gain: f64) -> Self {
        let magnitude = gain.abs();
        if magnitude <= 1e-6 {
            Self::FLOOR
        } else {
            Self((20.0 * magnitude.log10()).max(DB_FLOOR))
        }
    }

    #[inline]
    pub fn to_gain(self) -> f64 {
        10.0_f64.powf(self.0 / 20.0)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for Decibels {
    fn default() -> Self {
        Self::ZERO
    }
}
