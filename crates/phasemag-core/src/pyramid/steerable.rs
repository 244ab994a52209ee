use ndarray::{s, Array2, Zip};
use num_complex::Complex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_PYRAMID_ORIENTATIONS, DEFAULT_PYRAMID_SCALES};
use crate::error::{PhasemagError, Result};
use crate::frame::Frame;

use super::coefficients::{PyramidCoefficients, PyramidShape};
use super::fft::{spectrum, spectrum_real, synthesize, synthesize_real};
use super::filters::FilterBank;

/// Depth and orientation count of the complex steerable pyramid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PyramidConfig {
    /// Number of band-pass scales (excluding the two residuals).
    pub scales: usize,
    /// Orientations per scale, at least 2.
    pub orientations: usize,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            scales: DEFAULT_PYRAMID_SCALES,
            orientations: DEFAULT_PYRAMID_ORIENTATIONS,
        }
    }
}

impl PyramidConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scales == 0 {
            return Err(PhasemagError::InvalidConfig(
                "pyramid needs at least one scale".into(),
            ));
        }
        if self.orientations < 2 {
            return Err(PhasemagError::InvalidConfig(format!(
                "pyramid needs at least 2 orientations, got {}",
                self.orientations
            )));
        }
        Ok(())
    }
}

/// Complex steerable pyramid computed in the frequency domain.
///
/// The filter bank is built for the dimensions of the first frame passed to
/// [`build`](Self::build) and frozen for the rest of the run.
pub struct SteerablePyramid {
    config: PyramidConfig,
    bank: Option<FilterBank>,
}

impl SteerablePyramid {
    pub fn new(config: PyramidConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, bank: None })
    }

    pub fn config(&self) -> &PyramidConfig {
        &self.config
    }

    /// Shape frozen by the first frame, if any.
    pub fn shape(&self) -> Option<&PyramidShape> {
        self.bank.as_ref().map(|b| &b.shape)
    }

    pub fn is_frozen(&self) -> bool {
        self.bank.is_some()
    }

    /// Decompose a frame.
    pub fn build(&mut self, frame: &Frame) -> Result<PyramidCoefficients> {
        let data = frame.data.mapv(f64::from);
        self.build_array(&data)
    }

    /// Decompose a real 2-D array.
    pub fn build_array(&mut self, data: &Array2<f64>) -> Result<PyramidCoefficients> {
        let (h, w) = data.dim();
        let bank = self.frozen_bank(h, w)?;
        let phase = Complex::new(0.0, -1.0).powu(bank.order);

        let imdft = spectrum_real(&bank.full_fft, data);
        let highpass = synthesize_real(&bank.full_fft, &(&imdft * &bank.hi0_mask.mapv(real)));
        let mut lodft = imdft * bank.lo0_mask.mapv(real);

        let mut bands = Vec::with_capacity(bank.scales.len());
        for filters in &bank.scales {
            let orients: Vec<Array2<Complex<f64>>> = filters
                .analysis
                .par_iter()
                .map(|mask| {
                    let mut banddft = lodft.clone();
                    Zip::from(&mut banddft)
                        .and(mask)
                        .for_each(|c, &m| *c *= phase * m);
                    synthesize(&filters.fft, &banddft)
                })
                .collect();
            bands.push(orients);

            let (nh, nw) = filters.lo_mask.dim();
            let (r0, c0) = filters.crop_start;
            let mut next = lodft.slice(s![r0..r0 + nh, c0..c0 + nw]).to_owned();
            Zip::from(&mut next)
                .and(&filters.lo_mask)
                .for_each(|c, &m| *c *= m);
            lodft = next;
        }

        let lowpass = synthesize_real(&bank.lowpass_fft, &lodft);

        Ok(PyramidCoefficients {
            highpass,
            bands,
            lowpass,
        })
    }

    /// Recombine (possibly modified) coefficients into an unclamped real image.
    pub fn reconstruct(&self, coefficients: &PyramidCoefficients) -> Result<Array2<f64>> {
        let bank = self.bank.as_ref().ok_or_else(|| {
            PhasemagError::ReconstructionFailure(
                "no filter bank: reconstruct called before any frame was decomposed".into(),
            )
        })?;
        if !coefficients.matches(&bank.shape) {
            return Err(PhasemagError::shape(&bank.shape, coefficients.describe()));
        }
        let phase = Complex::new(0.0, 1.0).powu(bank.order);

        let mut dft = spectrum_real(&bank.lowpass_fft, &coefficients.lowpass);
        for (scale, filters) in bank.scales.iter().enumerate().rev() {
            let mut level = Array2::<Complex<f64>>::zeros(filters.dims);

            let (nh, nw) = filters.lo_mask.dim();
            let (r0, c0) = filters.crop_start;
            Zip::from(level.slice_mut(s![r0..r0 + nh, c0..c0 + nw]))
                .and(&dft)
                .and(&filters.lo_mask)
                .for_each(|o, &d, &m| *o = d * m);

            let oriented: Vec<Array2<Complex<f64>>> = coefficients.bands[scale]
                .par_iter()
                .zip(filters.synthesis.par_iter())
                .map(|(band, mask)| {
                    let mut banddft = spectrum(&filters.fft, band);
                    Zip::from(&mut banddft)
                        .and(mask)
                        .for_each(|c, &m| *c *= phase * m);
                    banddft
                })
                .collect();
            for banddft in &oriented {
                level += banddft;
            }
            dft = level;
        }

        let hidft = spectrum_real(&bank.full_fft, &coefficients.highpass);
        Zip::from(&mut dft)
            .and(&bank.lo0_mask)
            .and(&hidft)
            .and(&bank.hi0_mask)
            .for_each(|d, &lo, &hi, &hm| *d = *d * lo + hi * hm);

        let out = synthesize_real(&bank.full_fft, &dft);
        if let Some(bad) = out.iter().find(|v| !v.is_finite()) {
            return Err(PhasemagError::ReconstructionFailure(format!(
                "non-finite sample {bad} in reconstructed frame"
            )));
        }
        Ok(out)
    }

    fn frozen_bank(&mut self, height: usize, width: usize) -> Result<&FilterBank> {
        let bank = match self.bank.take() {
            Some(bank) => bank,
            None => FilterBank::new(height, width, self.config.scales, self.config.orientations)?,
        };
        let frozen = (bank.shape.height, bank.shape.width);
        let bank = self.bank.insert(bank);
        if frozen != (height, width) {
            return Err(PhasemagError::shape(
                format!("{}x{} frame", frozen.1, frozen.0),
                format!("{width}x{height} frame"),
            ));
        }
        Ok(&*bank)
    }
}

fn real(v: f64) -> Complex<f64> {
    Complex::new(v, 0.0)
}
