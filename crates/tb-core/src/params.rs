//! Parameter types for the multiband engine
//!
//! The control thread writes into [`SharedParams`]; the audio thread reads a
//! [`ParamSnapshot`] from it once per block. Every field is an independent
//! atomic, so neither side ever waits on the other.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::{TbError, TbResult};

// ============ Bands ============

/// One of the three frequency bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BandId {
    Low,
    Mid,
    High,
}

impl BandId {
    pub const ALL: [BandId; 3] = [BandId::Low, BandId::Mid, BandId::High];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Mid => 1,
            Self::High => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Mid => "mid",
            Self::High => "high",
        }
    }
}

/// Per-band parameter selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BandParam {
    Threshold,
    Ratio,
    Attack,
    Release,
    Gain,
}

impl BandParam {
    pub const ALL: [BandParam; 5] = [
        BandParam::Threshold,
        BandParam::Ratio,
        BandParam::Attack,
        BandParam::Release,
        BandParam::Gain,
    ];
}

// ============ Parameter IDs and ranges ============

/// Control range and default of one parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl ParamRange {
    pub const fn linear(min: f64, max: f64, default: f64) -> Self {
        Self { min, max, default }
    }

    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Every automatable parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    LowCutoff,
    HighCutoff,
    Band(BandId, BandParam),
    KneeWidth,
    OverallGain,
}

impl ParamId {
    pub const COUNT: usize = 19;

    /// All parameters in host-facing order
    pub fn all() -> impl Iterator<Item = ParamId> {
        let bands = BandId::ALL
            .into_iter()
            .flat_map(|band| BandParam::ALL.into_iter().map(move |p| ParamId::Band(band, p)));
        [ParamId::LowCutoff, ParamId::HighCutoff]
            .into_iter()
            .chain(bands)
            .chain([ParamId::KneeWidth, ParamId::OverallGain])
    }

    /// Stable string id used in presets and by hosts
    pub const fn id(self) -> &'static str {
        use BandId::*;
        use BandParam::*;
        match self {
            Self::LowCutoff => "lowCutOff",
            Self::HighCutoff => "highCutOff",
            Self::Band(Low, Threshold) => "lowThresh",
            Self::Band(Low, Ratio) => "lowRatio",
            Self::Band(Low, Attack) => "lowAttack",
            Self::Band(Low, Release) => "lowRelease",
            Self::Band(Low, Gain) => "lowGain",
            Self::Band(Mid, Threshold) => "midThresh",
            Self::Band(Mid, Ratio) => "midRatio",
            Self::Band(Mid, Attack) => "midAttack",
            Self::Band(Mid, Release) => "midRelease",
            Self::Band(Mid, Gain) => "midGain",
            Self::Band(High, Threshold) => "highThresh",
            Self::Band(High, Ratio) => "highRatio",
            Self::Band(High, Attack) => "highAttack",
            Self::Band(High, Release) => "highRelease",
            Self::Band(High, Gain) => "highGain",
            Self::KneeWidth => "kneeWidth",
            Self::OverallGain => "overallGain",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().find(|p| p.id() == id)
    }

    /// Documented control range and default
    pub const fn range(self) -> ParamRange {
        match self {
            Self::LowCutoff => ParamRange::linear(150.0, 600.0, 450.0),
            Self::HighCutoff => ParamRange::linear(1000.0, 4000.0, 2500.0),
            Self::Band(_, BandParam::Threshold) => ParamRange::linear(-80.0, 0.0, 0.0),
            Self::Band(_, BandParam::Ratio) => ParamRange::linear(1.0, 10.0, 1.0),
            Self::Band(_, BandParam::Attack) => ParamRange::linear(5.0, 100.0, 5.0),
            Self::Band(_, BandParam::Release) => ParamRange::linear(5.0, 100.0, 5.0),
            Self::Band(_, BandParam::Gain) => ParamRange::linear(0.0, 4.0, 1.0),
            Self::KneeWidth => ParamRange::linear(5.0, 100.0, 5.0),
            Self::OverallGain => ParamRange::linear(0.0, 4.0, 1.0),
        }
    }
}

// ============ Snapshot ============

/// Compressor settings for one band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BandParams {
    /// Threshold (dB)
    pub threshold_db: f64,
    /// Ratio (1 = no compression)
    pub ratio: f64,
    /// Attack (ms)
    pub attack_ms: f64,
    /// Release (ms)
    pub release_ms: f64,
    /// Makeup gain (linear)
    pub gain: f64,
    /// Run the compressor for this band
    pub enabled: bool,
}

impl Default for BandParams {
    fn default() -> Self {
        Self {
            threshold_db: 0.0,
            ratio: 1.0,
            attack_ms: 5.0,
            release_ms: 5.0,
            gain: 1.0,
            enabled: true,
        }
    }
}

impl BandParams {
    #[inline]
    pub fn get(&self, param: BandParam) -> f64 {
        match param {
            BandParam::Threshold => self.threshold_db,
            BandParam::Ratio => self.ratio,
            BandParam::Attack => self.attack_ms,
            BandParam::Release => self.release_ms,
            BandParam::Gain => self.gain,
        }
    }

    #[inline]
    pub fn set(&mut self, param: BandParam, value: f64) {
        match param {
            BandParam::Threshold => self.threshold_db = value,
            BandParam::Ratio => self.ratio = value,
            BandParam::Attack => self.attack_ms = value,
            BandParam::Release => self.release_ms = value,
            BandParam::Gain => self.gain = value,
        }
    }
}

/// Block-granularity view of every parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParamSnapshot {
    /// Low/mid crossover (Hz)
    pub low_split_hz: f64,
    /// Mid/high crossover (Hz)
    pub high_split_hz: f64,
    /// Knee width shared by all bands (dB)
    pub knee_width_db: f64,
    /// Output gain after summation (linear)
    pub output_gain: f64,
    pub low: BandParams,
    pub mid: BandParams,
    pub high: BandParams,
}

impl Default for ParamSnapshot {
    fn default() -> Self {
        Self {
            low_split_hz: 450.0,
            high_split_hz: 2500.0,
            knee_width_db: 5.0,
            output_gain: 1.0,
            low: BandParams::default(),
            mid: BandParams::default(),
            high: BandParams::default(),
        }
    }
}

impl ParamSnapshot {
    #[inline]
    pub fn band(&self, band: BandId) -> &BandParams {
        match band {
            BandId::Low => &self.low,
            BandId::Mid => &self.mid,
            BandId::High => &self.high,
        }
    }

    #[inline]
    pub fn band_mut(&mut self, band: BandId) -> &mut BandParams {
        match band {
            BandId::Low => &mut self.low,
            BandId::Mid => &mut self.mid,
            BandId::High => &mut self.high,
        }
    }

    pub fn get(&self, id: ParamId) -> f64 {
        match id {
            ParamId::LowCutoff => self.low_split_hz,
            ParamId::HighCutoff => self.high_split_hz,
            ParamId::Band(band, param) => self.band(band).get(param),
            ParamId::KneeWidth => self.knee_width_db,
            ParamId::OverallGain => self.output_gain,
        }
    }

    pub fn set(&mut self, id: ParamId, value: f64) {
        match id {
            ParamId::LowCutoff => self.low_split_hz = value,
            ParamId::HighCutoff => self.high_split_hz = value,
            ParamId::Band(band, param) => self.band_mut(band).set(param, value),
            ParamId::KneeWidth => self.knee_width_db = value,
            ParamId::OverallGain => self.output_gain = value,
        }
    }

    /// Check the values the engine depends on for stability.
    ///
    /// Nyquist is not known here; the crossover checks it against the
    /// sample rate when it is configured.
    pub fn validate(&self) -> TbResult<()> {
        for id in ParamId::all() {
            let value = self.get(id);
            if !value.is_finite() {
                return Err(TbError::invalid(id.id(), value, "must be finite"));
            }
        }
        if self.low_split_hz <= 0.0 {
            return Err(TbError::invalid("lowCutOff", self.low_split_hz, "must be positive"));
        }
        if self.low_split_hz >= self.high_split_hz {
            return Err(TbError::invalid(
                "lowCutOff",
                self.low_split_hz,
                "must be below highCutOff",
            ));
        }
        if self.knee_width_db < 0.0 {
            return Err(TbError::invalid("kneeWidth", self.knee_width_db, "must be >= 0"));
        }
        if self.output_gain < 0.0 {
            return Err(TbError::invalid("overallGain", self.output_gain, "must be >= 0"));
        }
        for band in BandId::ALL {
            let p = self.band(band);
            let id = |param| ParamId::Band(band, param).id();
            if p.ratio < 1.0 {
                return Err(TbError::invalid(id(BandParam::Ratio), p.ratio, "must be >= 1"));
            }
            if p.threshold_db > 0.0 {
                return Err(TbError::invalid(id(BandParam::Threshold), p.threshold_db, "must be <= 0 dB"));
            }
            if p.attack_ms <= 0.0 {
                return Err(TbError::invalid(id(BandParam::Attack), p.attack_ms, "must be positive"));
            }
            if p.release_ms <= 0.0 {
                return Err(TbError::invalid(id(BandParam::Release), p.release_ms, "must be positive"));
            }
            if p.gain < 0.0 {
                return Err(TbError::invalid(id(BandParam::Gain), p.gain, "must be >= 0"));
            }
        }
        Ok(())
    }
}

// ============ Lock-free publication ============

/// Atomic parameter for lock-free access
pub struct AtomicParam {
    bits: AtomicU64,
}

impl AtomicParam {
    pub fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    #[inline]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl Default for AtomicParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}

struct SharedBand {
    values: [AtomicParam; 5],
    enabled: AtomicBool,
}

impl SharedBand {
    fn new(params: &BandParams) -> Self {
        Self {
            values: BandParam::ALL.map(|p| AtomicParam::new(params.get(p))),
            enabled: AtomicBool::new(params.enabled),
        }
    }

    #[inline]
    fn slot(&self, param: BandParam) -> &AtomicParam {
        &self.values[param as usize]
    }

    fn load(&self) -> BandParams {
        let mut out = BandParams {
            enabled: self.enabled.load(Ordering::Relaxed),
            ..BandParams::default()
        };
        for p in BandParam::ALL {
            out.set(p, self.slot(p).get());
        }
        out
    }
}

/// Parameter store shared between the control thread and the audio thread
///
/// Values are clamped into their documented ranges on write. Those ranges
/// keep the low crossover strictly below the high one, so every snapshot
/// read back is valid for the engine.
pub struct SharedParams {
    low_cutoff: AtomicParam,
    high_cutoff: AtomicParam,
    knee_width: AtomicParam,
    overall_gain: AtomicParam,
    bands: [SharedBand; 3],
}

impl SharedParams {
    pub fn new() -> Self {
        let defaults = ParamSnapshot::default();
        Self {
            low_cutoff: AtomicParam::new(defaults.low_split_hz),
            high_cutoff: AtomicParam::new(defaults.high_split_hz),
            knee_width: AtomicParam::new(defaults.knee_width_db),
            overall_gain: AtomicParam::new(defaults.output_gain),
            bands: BandId::ALL.map(|b| SharedBand::new(defaults.band(b))),
        }
    }

    /// Build a store holding `snapshot`, clamped into the documented ranges
    pub fn from_snapshot(snapshot: &ParamSnapshot) -> TbResult<Self> {
        let params = Self::new();
        params.publish(snapshot)?;
        Ok(params)
    }

    #[inline]
    fn slot(&self, id: ParamId) -> &AtomicParam {
        match id {
            ParamId::LowCutoff => &self.low_cutoff,
            ParamId::HighCutoff => &self.high_cutoff,
            ParamId::Band(band, param) => self.bands[band.index()].slot(param),
            ParamId::KneeWidth => &self.knee_width,
            ParamId::OverallGain => &self.overall_gain,
        }
    }

    /// Store a value, returning what was actually stored after clamping
    pub fn set(&self, id: ParamId, value: f64) -> TbResult<f64> {
        if !value.is_finite() {
            return Err(TbError::invalid(id.id(), value, "must be finite"));
        }
        let range = id.range();
        let clamped = range.clamp(value);
        if clamped != value {
            log::debug!(
                "{} = {} outside [{}, {}], clamped to {}",
                id.id(),
                value,
                range.min,
                range.max,
                clamped
            );
        }
        self.slot(id).set(clamped);
        Ok(clamped)
    }

    #[inline]
    pub fn get(&self, id: ParamId) -> f64 {
        self.slot(id).get()
    }

    pub fn set_band_enabled(&self, band: BandId, enabled: bool) {
        self.bands[band.index()].enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn band_enabled(&self, band: BandId) -> bool {
        self.bands[band.index()].enabled.load(Ordering::Relaxed)
    }

    /// Store every value of `snapshot`.
    ///
    /// Stops at the first non-finite value; fields written before it keep
    /// their new values.
    pub fn publish(&self, snapshot: &ParamSnapshot) -> TbResult<()> {
        for id in ParamId::all() {
            self.set(id, snapshot.get(id))?;
        }
        for band in BandId::ALL {
            self.set_band_enabled(band, snapshot.band(band).enabled);
        }
        Ok(())
    }

    /// Read the latest published values. Wait-free; safe on the audio thread.
    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            low_split_hz: self.low_cutoff.get(),
            high_split_hz: self.high_cutoff.get(),
            knee_width_db: self.knee_width.get(),
            output_gain: self.overall_gain.get(),
            low: self.bands[0].load(),
            mid: self.bands[1].load(),
            high: self.bands[2].load(),
        }
    }
}

impl Default for SharedParams {
    fn default() -> Self {
        Self::new()
    }
}
