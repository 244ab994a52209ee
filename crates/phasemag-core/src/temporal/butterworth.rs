use std::f64::consts::PI;

use num_complex::Complex;
use rayon::prelude::*;
use tracing::debug;

use crate::consts::PARALLEL_COEFFICIENT_THRESHOLD;
use crate::error::{PhasemagError, Result};

use super::unwrap::wrap_phase;
use super::{check_len, FilterOutput, PassBand};

/// Poles closer to the real axis than this are treated as real.
const REAL_POLE_TOLERANCE: f64 = 1e-9;

/// One second-order section, `a[0]` normalised to 1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Biquad {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

impl Biquad {
    fn response(&self, z: Complex<f64>) -> Complex<f64> {
        let zi = z.inv();
        let zi2 = zi * zi;
        let num = self.b[0] + zi * self.b[1] + zi2 * self.b[2];
        let den = self.a[0] + zi * self.a[1] + zi2 * self.a[2];
        num / den
    }

    /// Transposed direct form II step.
    #[inline]
    fn step(&self, x: f64, state: &mut [f64]) -> f64 {
        let y = self.b[0] * x + state[0];
        state[0] = self.b[1] * x - self.a[1] * y + state[1];
        state[1] = self.b[2] * x - self.a[2] * y;
        y
    }
}

/// Recursive Butterworth band pass applied independently to every coefficient.
///
/// Each coefficient's phase is unwrapped in time and taken relative to its
/// first sample, so a static scene sits in the zero steady state from the start.
pub struct ButterworthBandpass {
    band: PassBand,
    sections: Vec<Biquad>,
    settling_frames: usize,
    coefficient_count: Option<usize>,
    /// Last raw (wrapped) phase per coefficient.
    previous: Vec<f64>,
    /// Unwrapped phase relative to the first sample.
    unwrapped: Vec<f64>,
    /// Two state values per section per coefficient.
    state: Vec<f64>,
    output: Vec<f32>,
    samples_seen: usize,
    pending: bool,
}

impl ButterworthBandpass {
    pub fn new(order: usize, band: PassBand, settling_frames: usize) -> Result<Self> {
        if order == 0 {
            return Err(PhasemagError::InvalidConfig(
                "Butterworth order must be at least 1".into(),
            ));
        }
        if band.low_freq <= 0.0 || band.high_freq >= band.nyquist() {
            return Err(PhasemagError::InvalidConfig(format!(
                "Butterworth band edges must lie strictly inside (0, {}) Hz",
                band.nyquist()
            )));
        }

        let sections = design_sections(order, &band)?;
        debug!(order, band = %band, sections = sections.len(), "Butterworth filter designed");

        Ok(Self {
            band,
            sections,
            settling_frames,
            coefficient_count: None,
            previous: Vec::new(),
            unwrapped: Vec::new(),
            state: Vec::new(),
            output: Vec::new(),
            samples_seen: 0,
            pending: false,
        })
    }

    pub fn band(&self) -> &PassBand {
        &self.band
    }

    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    pub fn samples_seen(&self) -> usize {
        self.samples_seen
    }

    /// Magnitude response at `freq` Hz.
    pub fn gain_at(&self, freq: f64) -> f64 {
        let omega = 2.0 * PI * freq / self.band.sampling_rate;
        cascade_response(&self.sections, Complex::from_polar(1.0, omega)).norm()
    }

    pub fn update(&mut self, phases: &[f32]) -> Result<()> {
        check_len(&mut self.coefficient_count, phases.len())?;

        let stride = self.sections.len() * 2;
        if self.samples_seen == 0 {
            let n = phases.len();
            self.previous = phases.iter().map(|&p| p as f64).collect();
            self.unwrapped = vec![0.0; n];
            self.state = vec![0.0; n * stride];
        }
        self.output.resize(phases.len(), 0.0);

        let sections = &self.sections;
        let first = self.samples_seen == 0;
        let step = |(((out, &raw), (prev, acc)), state): (
            ((&mut f32, &f32), (&mut f64, &mut f64)),
            &mut [f64],
        )| {
            let raw = raw as f64;
            if !first {
                *acc += wrap_phase(raw - *prev);
            }
            *prev = raw;
            let mut x = *acc;
            for (section, s) in sections.iter().zip(state.chunks_exact_mut(2)) {
                x = section.step(x, s);
            }
            *out = x as f32;
        };

        if phases.len() >= PARALLEL_COEFFICIENT_THRESHOLD {
            self.output
                .par_iter_mut()
                .zip(phases.par_iter())
                .zip(self.previous.par_iter_mut().zip(self.unwrapped.par_iter_mut()))
                .zip(self.state.par_chunks_exact_mut(stride))
                .for_each(step);
        } else {
            self.output
                .iter_mut()
                .zip(phases.iter())
                .zip(self.previous.iter_mut().zip(self.unwrapped.iter_mut()))
                .zip(self.state.chunks_exact_mut(stride))
                .for_each(step);
        }

        self.samples_seen += 1;
        self.pending = self.samples_seen > self.settling_frames;
        Ok(())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> FilterOutput {
        if !self.pending {
            return FilterOutput::NotReady;
        }
        self.pending = false;
        FilterOutput::Ready(self.output.clone())
    }
}

fn cascade_response(sections: &[Biquad], z: Complex<f64>) -> Complex<f64> {
    sections
        .iter()
        .fold(Complex::new(1.0, 0.0), |acc, s| acc * s.response(z))
}

/// Band-pass design: analog prototype, prewarped LP->BP transform, bilinear map.
fn design_sections(order: usize, band: &PassBand) -> Result<Vec<Biquad>> {
    let fs = band.sampling_rate;
    let w1 = 2.0 * fs * (PI * band.low_freq / fs).tan();
    let w2 = 2.0 * fs * (PI * band.high_freq / fs).tan();
    let bw = w2 - w1;
    let w0 = (w1 * w2).sqrt();
    let n = order as f64;

    let mut complex_poles = Vec::new();
    let mut real_poles = Vec::new();
    for k in 0..order {
        let theta = PI * (2.0 * k as f64 + n + 1.0) / (2.0 * n);
        let prototype = Complex::from_polar(1.0, theta);
        let t = prototype * (bw / 2.0);
        let root = (t * t - w0 * w0).sqrt();
        for s in [t + root, t - root] {
            let z = (2.0 * fs + s) / (2.0 * fs - s);
            if z.im > REAL_POLE_TOLERANCE {
                complex_poles.push(z);
            } else if z.im.abs() <= REAL_POLE_TOLERANCE {
                real_poles.push(z.re);
            }
        }
    }

    let mut sections: Vec<Biquad> = complex_poles
        .iter()
        .map(|z| Biquad {
            b: [1.0, 0.0, -1.0],
            a: [1.0, -2.0 * z.re, z.norm_sqr()],
        })
        .collect();
    for pair in real_poles.chunks(2) {
        let (p, q) = match *pair {
            [p, q] => (p, q),
            [p] => (p, 0.0),
            _ => continue,
        };
        sections.push(Biquad {
            b: [1.0, 0.0, -1.0],
            a: [1.0, -(p + q), p * q],
        });
    }

    if sections.len() != order {
        return Err(PhasemagError::InvalidConfig(format!(
            "Butterworth design produced {} sections for order {order}",
            sections.len()
        )));
    }

    let center = 2.0 * (w0 / (2.0 * fs)).atan();
    let gain = cascade_response(&sections, Complex::from_polar(1.0, center)).norm();
    if !gain.is_finite() || gain <= 0.0 {
        return Err(PhasemagError::InvalidConfig(
            "Butterworth design has no gain at the centre frequency".into(),
        ));
    }
    let per_section = gain.powf(-1.0 / n);
    for section in &mut sections {
        section.b = [per_section, 0.0, -per_section];
    }
    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_are_stable() {
        let band = PassBand::new(72.0, 92.0, 600.0).unwrap();
        let f = ButterworthBandpass::new(3, band, 0).unwrap();
        assert_eq!(f.sections().len(), 3);
        for s in f.sections() {
            // Both roots of z^2 + a1 z + a2 lie inside the unit circle.
            assert!(s.a[2].abs() < 1.0);
            assert!(s.a[1].abs() < 1.0 + s.a[2]);
        }
    }

    #[test]
    fn odd_order_pairs_real_poles() {
        let band = PassBand::new(1.0, 12.0, 30.0).unwrap();
        let f = ButterworthBandpass::new(1, band, 0).unwrap();
        assert_eq!(f.sections().len(), 1);
    }
}
