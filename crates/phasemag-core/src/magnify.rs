use ndarray::{Array2, Zip};
use num_complex::Complex;
use rayon::prelude::*;

use crate::consts::{DISPLAY_MAX, PARALLEL_COEFFICIENT_THRESHOLD};
use crate::error::{PhasemagError, Result};
use crate::frame::{ColorFrame, Frame};
use crate::pyramid::{PyramidCoefficients, SteerablePyramid};

/// Shift the phase of one coefficient by `factor * filtered`, keeping its amplitude.
#[inline]
pub fn magnify_coefficient(c: Complex<f64>, filtered: f32, factor: f64) -> Complex<f64> {
    Complex::from_polar(c.norm(), c.arg() + factor * filtered as f64)
}

/// Applies amplified band-passed phase to pyramid coefficients and turns the
/// result back into a displayable frame.
#[derive(Clone, Copy, Debug)]
pub struct MagnificationReconstructor {
    factor: f64,
}

impl MagnificationReconstructor {
    pub fn new(factor: f64) -> Result<Self> {
        if !factor.is_finite() || factor < 0.0 {
            return Err(PhasemagError::InvalidConfig(format!(
                "magnification factor must be finite and >= 0, got {factor}"
            )));
        }
        Ok(Self { factor })
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// New coefficients with every band phase shifted; residuals are copied.
    ///
    /// `filtered_phase` holds one value per band coefficient in canonical order.
    pub fn magnify(
        &self,
        original: &PyramidCoefficients,
        filtered_phase: &[f32],
    ) -> Result<PyramidCoefficients> {
        let expected = original.band_coefficient_count();
        if filtered_phase.len() != expected {
            return Err(PhasemagError::shape(
                format!("{expected} filtered phase values"),
                format!("{} values", filtered_phase.len()),
            ));
        }

        let mut out = original.clone();
        if self.factor == 0.0 {
            return Ok(out);
        }

        let factor = self.factor;
        let mut offset = 0;
        for band in out.iter_bands_mut() {
            let len = band.len();
            let phases = &filtered_phase[offset..offset + len];
            offset += len;
            shift_band(band, phases, factor)?;
        }
        Ok(out)
    }

    /// Reconstruct, clip to the display range and broadcast to three channels.
    pub fn to_frame(
        &self,
        pyramid: &SteerablePyramid,
        coefficients: &PyramidCoefficients,
    ) -> Result<ColorFrame> {
        let image = pyramid.reconstruct(coefficients)?;
        let frame = clamp_to_display(&image)?;
        Ok(ColorFrame::from_luminance(frame))
    }
}

fn shift_band(band: &mut Array2<Complex<f64>>, phases: &[f32], factor: f64) -> Result<()> {
    let Some(values) = band.as_slice_mut() else {
        return Err(PhasemagError::shape("contiguous band", "strided band"));
    };
    if values.len() >= PARALLEL_COEFFICIENT_THRESHOLD {
        values
            .par_iter_mut()
            .zip(phases.par_iter())
            .for_each(|(c, &p)| *c = magnify_coefficient(*c, p, factor));
    } else {
        for (c, &p) in values.iter_mut().zip(phases) {
            *c = magnify_coefficient(*c, p, factor);
        }
    }
    Ok(())
}

/// Hard-clip a reconstructed image to `[0, 255]`.
///
/// Non-finite samples mean the synthesis broke down and are reported as
/// [`PhasemagError::ReconstructionFailure`].
pub fn clamp_to_display(image: &Array2<f64>) -> Result<Frame> {
    if let Some(bad) = image.iter().find(|v| !v.is_finite()) {
        return Err(PhasemagError::ReconstructionFailure(format!(
            "non-finite sample {bad} in reconstructed frame"
        )));
    }
    let mut data = Array2::<f32>::zeros(image.raw_dim());
    Zip::from(&mut data)
        .and(image)
        .for_each(|d, &v| *d = v.clamp(0.0, DISPLAY_MAX) as f32);
    Ok(Frame::new(data, 8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficient_shift_preserves_amplitude() {
        let c = Complex::new(3.0, -4.0);
        let m = magnify_coefficient(c, 0.2, 10.0);
        assert!((m.norm() - 5.0).abs() < 1e-12);
        let expected = c.arg() + 10.0 * 0.2f32 as f64;
        assert!((m.arg() - expected).abs() < 1e-6);
    }

    #[test]
    fn negative_and_nan_factors_rejected() {
        assert!(MagnificationReconstructor::new(-1.0).is_err());
        assert!(MagnificationReconstructor::new(f64::NAN).is_err());
        assert!(MagnificationReconstructor::new(0.0).is_ok());
    }
}
