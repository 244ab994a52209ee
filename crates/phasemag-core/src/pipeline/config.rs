use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_FACTOR, DEFAULT_HIGH_FREQ, DEFAULT_LOW_FREQ, DEFAULT_MAX_FRAMES,
    DEFAULT_SAMPLING_RATE, DEFAULT_WINDOW_SIZE, FALLBACK_FRAME_RATE,
};
use crate::error::{PhasemagError, Result};
use crate::pyramid::PyramidConfig;
use crate::temporal::{FilterStrategy, PassBand};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(default)]
    pub magnification: MagnificationConfig,
}

/// Everything that shapes one magnification run, independent of where the
/// frames come from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagnificationConfig {
    pub pyramid: PyramidConfig,
    pub temporal: TemporalConfig,
    /// Phase magnification multiplier (>= 0).
    pub factor: f64,
    /// Cap on frames read from the source.
    pub max_frames: usize,
}

impl Default for MagnificationConfig {
    fn default() -> Self {
        Self {
            pyramid: PyramidConfig::default(),
            temporal: TemporalConfig::default(),
            factor: DEFAULT_FACTOR,
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// Frames kept in the coefficient window.
    pub window_size: usize,
    /// Hz used to design the band pass. `None` uses the source frame rate.
    pub sampling_rate: Option<f64>,
    pub low_freq: f64,
    pub high_freq: f64,
    pub strategy: FilterStrategy,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            sampling_rate: Some(DEFAULT_SAMPLING_RATE),
            low_freq: DEFAULT_LOW_FREQ,
            high_freq: DEFAULT_HIGH_FREQ,
            strategy: FilterStrategy::default(),
        }
    }
}

impl MagnificationConfig {
    /// Checks that do not depend on the source.
    pub fn validate(&self) -> Result<()> {
        self.pyramid.validate()?;
        if self.temporal.window_size == 0 {
            return Err(PhasemagError::InvalidConfig(
                "window_size must be at least 1".into(),
            ));
        }
        if !self.factor.is_finite() || self.factor < 0.0 {
            return Err(PhasemagError::InvalidConfig(format!(
                "factor must be finite and >= 0, got {}",
                self.factor
            )));
        }
        if self.max_frames == 0 {
            return Err(PhasemagError::InvalidConfig(
                "max_frames must be at least 1".into(),
            ));
        }
        if let Some(rate) = self.temporal.sampling_rate {
            self.pass_band_at(rate)?;
        }
        Ok(())
    }

    /// Pass band at the configured rate, else the source rate, else 30 Hz.
    pub fn resolve_pass_band(&self, source_rate: Option<f64>) -> Result<PassBand> {
        let rate = self
            .temporal
            .sampling_rate
            .or(source_rate.filter(|r| r.is_finite() && *r > 0.0))
            .unwrap_or(FALLBACK_FRAME_RATE);
        self.pass_band_at(rate)
    }

    fn pass_band_at(&self, rate: f64) -> Result<PassBand> {
        let band = PassBand::new(self.temporal.low_freq, self.temporal.high_freq, rate)?;
        if matches!(self.temporal.strategy, FilterStrategy::Butterworth { .. })
            && (band.low_freq <= 0.0 || band.high_freq >= band.nyquist())
        {
            return Err(PhasemagError::InvalidConfig(format!(
                "Butterworth band edges must lie strictly inside (0, {}) Hz",
                band.nyquist()
            )));
        }
        Ok(band)
    }
}
