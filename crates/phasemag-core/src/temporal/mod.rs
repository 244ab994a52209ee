pub mod butterworth;
pub mod ideal;
pub mod unwrap;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_BUTTERWORTH_ORDER, DEFAULT_ZERO_PAD_FACTOR};
use crate::error::{PhasemagError, Result};

pub use butterworth::ButterworthBandpass;
pub use ideal::IdealFilterWindowed;

/// Result of asking a temporal filter for its next output.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterOutput {
    /// One filtered phase value per band coefficient.
    Ready(Vec<f32>),
    /// Not enough samples yet, or the current output was already taken.
    NotReady,
}

impl FilterOutput {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn into_ready(self) -> Option<Vec<f32>> {
        match self {
            Self::Ready(values) => Some(values),
            Self::NotReady => None,
        }
    }
}

/// Temporal pass band in Hz, validated against the sampling rate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassBand {
    pub low_freq: f64,
    pub high_freq: f64,
    pub sampling_rate: f64,
}

impl PassBand {
    pub fn new(low_freq: f64, high_freq: f64, sampling_rate: f64) -> Result<Self> {
        if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
            return Err(PhasemagError::InvalidConfig(format!(
                "sampling rate must be positive, got {sampling_rate}"
            )));
        }
        let nyquist = sampling_rate / 2.0;
        if !(low_freq.is_finite() && high_freq.is_finite())
            || low_freq < 0.0
            || low_freq >= high_freq
            || high_freq > nyquist
        {
            return Err(PhasemagError::InvalidConfig(format!(
                "pass band must satisfy 0 <= low < high <= {nyquist} Hz, got {low_freq}..{high_freq} Hz"
            )));
        }
        Ok(Self {
            low_freq,
            high_freq,
            sampling_rate,
        })
    }

    pub fn nyquist(&self) -> f64 {
        self.sampling_rate / 2.0
    }
}

impl fmt::Display for PassBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}-{:.2} Hz @ {:.2} Hz",
            self.low_freq, self.high_freq, self.sampling_rate
        )
    }
}

/// Temporal filtering strategy, chosen once per run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FilterStrategy {
    /// Brick-wall band pass over a sliding window of phase samples.
    Ideal { zero_pad_factor: usize },
    /// Recursive IIR band pass.
    Butterworth { order: usize, settling_frames: usize },
}

impl Default for FilterStrategy {
    fn default() -> Self {
        Self::Ideal {
            zero_pad_factor: DEFAULT_ZERO_PAD_FACTOR,
        }
    }
}

impl FilterStrategy {
    pub fn butterworth() -> Self {
        Self::Butterworth {
            order: DEFAULT_BUTTERWORTH_ORDER,
            settling_frames: 0,
        }
    }
}

impl fmt::Display for FilterStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ideal { zero_pad_factor } => write!(f, "ideal (zero pad x{zero_pad_factor})"),
            Self::Butterworth { order, .. } => write!(f, "butterworth (order {order})"),
        }
    }
}

/// Per-coefficient temporal band-pass filter over phase samples.
pub enum TemporalFilter {
    Ideal(IdealFilterWindowed),
    Butterworth(ButterworthBandpass),
}

impl TemporalFilter {
    pub fn new(strategy: &FilterStrategy, window_size: usize, band: PassBand) -> Result<Self> {
        match *strategy {
            FilterStrategy::Ideal { zero_pad_factor } => Ok(Self::Ideal(
                IdealFilterWindowed::new(window_size, band, zero_pad_factor)?,
            )),
            FilterStrategy::Butterworth {
                order,
                settling_frames,
            } => Ok(Self::Butterworth(ButterworthBandpass::new(
                order,
                band,
                settling_frames,
            )?)),
        }
    }

    /// Append the newest phase sample, one value per band coefficient.
    pub fn update(&mut self, phases: &[f32]) -> Result<()> {
        match self {
            Self::Ideal(f) => f.update(phases),
            Self::Butterworth(f) => f.update(phases),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> FilterOutput {
        match self {
            Self::Ideal(f) => f.next(),
            Self::Butterworth(f) => f.next(),
        }
    }

    /// Frames between the newest sample and the frame an output belongs to.
    pub fn delay(&self) -> usize {
        match self {
            Self::Ideal(f) => f.delay(),
            Self::Butterworth(_) => 0,
        }
    }

    pub fn samples_seen(&self) -> usize {
        match self {
            Self::Ideal(f) => f.samples_seen(),
            Self::Butterworth(f) => f.samples_seen(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ideal(_) => "ideal",
            Self::Butterworth(_) => "butterworth",
        }
    }
}

fn check_len(expected: &mut Option<usize>, found: usize) -> Result<()> {
    match *expected {
        Some(len) if len != found => Err(PhasemagError::shape(
            format!("{len} phase values"),
            format!("{found} phase values"),
        )),
        Some(_) => Ok(()),
        None => {
            *expected = Some(found);
            Ok(())
        }
    }
}
