use std::fmt;

use ndarray::Array2;
use num_complex::Complex;

use crate::error::{PhasemagError, Result};

/// Geometry of a pyramid, fixed by the first frame of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PyramidShape {
    pub height: usize,
    pub width: usize,
    pub scales: usize,
    pub orientations: usize,
    /// (rows, cols) of the orientation bands at each scale, finest first.
    pub band_dims: Vec<(usize, usize)>,
    /// (rows, cols) of the low-pass residual.
    pub lowpass_dims: (usize, usize),
}

impl PyramidShape {
    /// Derive the per-scale geometry for a frame size.
    ///
    /// Each scale halves the previous size, rounding up. The depth is limited
    /// to `floor(log2(min(h, w))) - 2` so that DC never leaks into a band.
    pub fn derive(height: usize, width: usize, scales: usize, orientations: usize) -> Result<Self> {
        let max = max_scales(height, width);
        if scales > max {
            return Err(PhasemagError::InvalidDimensions {
                width: width as u32,
                height: height as u32,
            });
        }

        let mut band_dims = Vec::with_capacity(scales);
        let mut dims = (height, width);
        for _ in 0..scales {
            band_dims.push(dims);
            dims = (dims.0.div_ceil(2), dims.1.div_ceil(2));
        }

        Ok(Self {
            height,
            width,
            scales,
            orientations,
            band_dims,
            lowpass_dims: dims,
        })
    }

    /// Number of complex band coefficients across all scales and orientations.
    pub fn band_coefficient_count(&self) -> usize {
        self.band_dims
            .iter()
            .map(|&(h, w)| h * w * self.orientations)
            .sum()
    }

    /// Band coefficients plus both residuals.
    pub fn total_coefficient_count(&self) -> usize {
        self.band_coefficient_count()
            + self.height * self.width
            + self.lowpass_dims.0 * self.lowpass_dims.1
    }
}

impl fmt::Display for PyramidShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} frame, {} scales x {} orientations",
            self.width, self.height, self.scales, self.orientations
        )
    }
}

/// Deepest pyramid a frame of this size supports.
pub fn max_scales(height: usize, width: usize) -> usize {
    let min_dim = height.min(width);
    if min_dim < 2 {
        return 0;
    }
    (min_dim.ilog2() as usize).saturating_sub(2)
}

/// Output of one forward transform.
#[derive(Clone, Debug, PartialEq)]
pub struct PyramidCoefficients {
    /// Real high-pass residual at full resolution.
    pub highpass: Array2<f64>,
    /// Complex orientation bands, indexed `[scale][orientation]`.
    pub bands: Vec<Vec<Array2<Complex<f64>>>>,
    /// Real low-pass residual at the coarsest resolution.
    pub lowpass: Array2<f64>,
}

impl PyramidCoefficients {
    pub fn scales(&self) -> usize {
        self.bands.len()
    }

    pub fn orientations(&self) -> usize {
        self.bands.first().map_or(0, Vec::len)
    }

    pub fn band(&self, scale: usize, orientation: usize) -> &Array2<Complex<f64>> {
        &self.bands[scale][orientation]
    }

    /// Iterate bands in canonical order: scale-major, orientation-minor.
    pub fn iter_bands(&self) -> impl Iterator<Item = &Array2<Complex<f64>>> {
        self.bands.iter().flatten()
    }

    pub fn iter_bands_mut(&mut self) -> impl Iterator<Item = &mut Array2<Complex<f64>>> {
        self.bands.iter_mut().flatten()
    }

    pub fn band_coefficient_count(&self) -> usize {
        self.iter_bands().map(Array2::len).sum()
    }

    pub fn matches(&self, shape: &PyramidShape) -> bool {
        if self.highpass.dim() != (shape.height, shape.width)
            || self.lowpass.dim() != shape.lowpass_dims
            || self.bands.len() != shape.scales
        {
            return false;
        }
        self.bands
            .iter()
            .zip(&shape.band_dims)
            .all(|(orients, &dims)| {
                orients.len() == shape.orientations && orients.iter().all(|b| b.dim() == dims)
            })
    }

    /// Short human-readable shape summary for error messages.
    pub fn describe(&self) -> String {
        let (h, w) = self.highpass.dim();
        format!(
            "{}x{} frame, {} scales x {} orientations, lowpass {:?}",
            w,
            h,
            self.scales(),
            self.orientations(),
            self.lowpass.dim()
        )
    }
}
