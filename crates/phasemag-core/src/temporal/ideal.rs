use num_complex::Complex;
use rayon::prelude::*;
use rustfft::FftPlanner;
use tracing::debug;

use crate::consts::PARALLEL_COEFFICIENT_THRESHOLD;
use crate::error::{PhasemagError, Result};

use super::unwrap::wrap_phase;
use super::{check_len, FilterOutput, PassBand};

/// Windowed ideal (brick-wall) band pass over per-coefficient phase series.
///
/// The filter looks at the last `window_size` phase samples and reports the
/// band-passed value at the oldest sample of the window, so an output always
/// belongs to the frame `window_size - 1` updates back.
///
/// Per coefficient the series is unwrapped in time, mean-removed, zero-padded,
/// masked in the frequency domain and transformed back. Everything after the
/// unwrap is linear, so it is folded into a tap kernel once at construction.
pub struct IdealFilterWindowed {
    band: PassBand,
    window_size: usize,
    fft_len: usize,
    kernel: Vec<f64>,
    /// Ring of phase samples; `slots[(cursor + t) % window_size]` is the t-th oldest once full.
    slots: Vec<Vec<f32>>,
    cursor: usize,
    coefficient_count: Option<usize>,
    samples_seen: usize,
    pending: bool,
}

impl IdealFilterWindowed {
    pub fn new(window_size: usize, band: PassBand, zero_pad_factor: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(PhasemagError::InvalidConfig(
                "window size must be at least 1".into(),
            ));
        }
        if zero_pad_factor == 0 {
            return Err(PhasemagError::InvalidConfig(
                "zero pad factor must be at least 1".into(),
            ));
        }

        let fft_len = (window_size * zero_pad_factor).next_power_of_two();
        let kernel = tap_kernel(window_size, fft_len, &band);
        debug!(
            window_size,
            fft_len,
            band = %band,
            "Ideal filter kernel computed"
        );

        Ok(Self {
            band,
            window_size,
            fft_len,
            kernel,
            slots: Vec::with_capacity(window_size),
            cursor: 0,
            coefficient_count: None,
            samples_seen: 0,
            pending: false,
        })
    }

    pub fn band(&self) -> &PassBand {
        &self.band
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn fft_len(&self) -> usize {
        self.fft_len
    }

    /// Weights applied to the unwrapped series, oldest sample first.
    pub fn kernel(&self) -> &[f64] {
        &self.kernel
    }

    pub fn delay(&self) -> usize {
        self.window_size - 1
    }

    pub fn samples_seen(&self) -> usize {
        self.samples_seen
    }

    pub fn update(&mut self, phases: &[f32]) -> Result<()> {
        check_len(&mut self.coefficient_count, phases.len())?;

        if self.slots.len() < self.window_size {
            self.slots.push(phases.to_vec());
        } else {
            self.slots[self.cursor].copy_from_slice(phases);
            self.cursor = (self.cursor + 1) % self.window_size;
        }
        self.samples_seen += 1;
        self.pending = self.samples_seen >= self.window_size;
        Ok(())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> FilterOutput {
        if !self.pending {
            return FilterOutput::NotReady;
        }
        self.pending = false;

        let count = self.coefficient_count.unwrap_or(0);
        let ordered: Vec<&[f32]> = (0..self.window_size)
            .map(|t| self.slots[(self.cursor + t) % self.window_size].as_slice())
            .collect();
        let kernel = &self.kernel;
        let filter = |i: usize| filter_coefficient(&ordered, kernel, i);

        let output = if count >= PARALLEL_COEFFICIENT_THRESHOLD {
            (0..count).into_par_iter().map(filter).collect()
        } else {
            (0..count).map(filter).collect()
        };
        FilterOutput::Ready(output)
    }
}

/// Unwrap one coefficient's series on the fly and apply the kernel.
fn filter_coefficient(ordered: &[&[f32]], kernel: &[f64], index: usize) -> f32 {
    let mut prev = ordered[0][index] as f64;
    let mut acc = prev;
    let mut sum = kernel[0] * acc;
    for (samples, &weight) in ordered.iter().zip(kernel).skip(1) {
        let raw = samples[index] as f64;
        acc += wrap_phase(raw - prev);
        prev = raw;
        sum += weight * acc;
    }
    sum as f32
}

/// Impulse response of the whole linear chain, read at tap 0.
fn tap_kernel(window_size: usize, fft_len: usize, band: &PassBand) -> Vec<f64> {
    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(fft_len);
    let inverse = planner.plan_fft_inverse(fft_len);

    let mask: Vec<f64> = (0..fft_len)
        .map(|k| {
            let signed = if k <= fft_len / 2 {
                k as f64
            } else {
                k as f64 - fft_len as f64
            };
            let freq = (signed * band.sampling_rate / fft_len as f64).abs();
            if freq >= band.low_freq && freq <= band.high_freq {
                1.0
            } else {
                0.0
            }
        })
        .collect();

    let mean_weight = 1.0 / window_size as f64;
    let keep_mean = band.low_freq == 0.0;
    let mut buffer = vec![Complex::new(0.0, 0.0); fft_len];

    (0..window_size)
        .map(|j| {
            buffer.fill(Complex::new(0.0, 0.0));
            for (t, value) in buffer.iter_mut().take(window_size).enumerate() {
                let impulse = if t == j { 1.0 } else { 0.0 };
                value.re = impulse - mean_weight;
            }
            forward.process(&mut buffer);
            for (value, &m) in buffer.iter_mut().zip(&mask) {
                *value *= m;
            }
            inverse.process(&mut buffer);
            let tap = buffer[0].re / fft_len as f64;
            if keep_mean {
                tap + mean_weight
            } else {
                tap
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(low: f64, high: f64, rate: f64) -> PassBand {
        PassBand::new(low, high, rate).unwrap()
    }

    #[test]
    fn kernel_rejects_constant_series() {
        let kernel = tap_kernel(8, 32, &band(4.0, 6.0, 30.0));
        let sum: f64 = kernel.iter().sum();
        assert!(sum.abs() < 1e-12);
    }

    #[test]
    fn full_band_kernel_is_identity_at_tap() {
        let kernel = tap_kernel(8, 32, &band(0.0, 15.0, 30.0));
        assert!((kernel[0] - 1.0).abs() < 1e-9);
        for &w in &kernel[1..] {
            assert!(w.abs() < 1e-9);
        }
    }

    #[test]
    fn fft_length_is_padded_power_of_two() {
        let f = IdealFilterWindowed::new(30, band(72.0, 92.0, 600.0), 4).unwrap();
        assert_eq!(f.fft_len(), 128);
        assert_eq!(f.delay(), 29);
    }
}
