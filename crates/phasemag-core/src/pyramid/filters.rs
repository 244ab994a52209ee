use std::f64::consts::{FRAC_PI_2, PI, TAU};

use ndarray::{s, Array2};
use rustfft::FftPlanner;
use tracing::debug;

use crate::error::Result;

use super::coefficients::PyramidShape;
use super::fft::Fft2d;

/// Log2-radius transition of the outer high/low split.
const OUTER_TRANSITION: f64 = -1.0;

/// Frequency masks for one band scale, in centred layout.
pub(crate) struct ScaleFilters {
    pub dims: (usize, usize),
    /// Analysis masks per orientation: one-sided angular lobe times the radial high-pass.
    pub analysis: Vec<Array2<f64>>,
    /// Synthesis masks per orientation: two-sided angular lobe times the radial high-pass.
    pub synthesis: Vec<Array2<f64>>,
    /// Radial low-pass on the cropped grid of the next scale.
    pub lo_mask: Array2<f64>,
    /// Top-left corner of the next scale's crop window.
    pub crop_start: (usize, usize),
    pub fft: Fft2d,
}

/// Frozen filter bank for one frame size.
pub(crate) struct FilterBank {
    pub shape: PyramidShape,
    pub hi0_mask: Array2<f64>,
    pub lo0_mask: Array2<f64>,
    pub scales: Vec<ScaleFilters>,
    pub full_fft: Fft2d,
    pub lowpass_fft: Fft2d,
    /// `order = orientations - 1` of the angular lobes.
    pub order: u32,
}

impl FilterBank {
    pub fn new(height: usize, width: usize, scales: usize, orientations: usize) -> Result<Self> {
        let shape = PyramidShape::derive(height, width, scales, orientations)?;
        let mut planner = FftPlanner::new();

        let (mut log_rad, mut angle) = polar_grid(height, width);
        let (hi0_mask, lo0_mask) = radial_masks(&log_rad, OUTER_TRANSITION);

        let order = orientations - 1;
        let lobe_gain = angular_constant(orientations).sqrt();

        let mut bank_scales = Vec::with_capacity(scales);
        for scale in 0..scales {
            let dims = shape.band_dims[scale];
            let transition = OUTER_TRANSITION - 1.0 - scale as f64;
            let (hi_mask, _) = radial_masks(&log_rad, transition);

            let mut analysis = Vec::with_capacity(orientations);
            let mut synthesis = Vec::with_capacity(orientations);
            for b in 0..orientations {
                let centre = PI * b as f64 / orientations as f64;
                let mut fwd = Array2::<f64>::zeros(dims);
                let mut inv = Array2::<f64>::zeros(dims);
                for ((idx, &theta), &hi) in angle.indexed_iter().zip(hi_mask.iter()) {
                    let diff = theta - centre;
                    let lobe = lobe_gain * diff.cos().powi(order as i32) * hi;
                    inv[idx] = lobe;
                    if wrap_angle(diff).abs() < FRAC_PI_2 {
                        fwd[idx] = 2.0 * lobe;
                    }
                }
                analysis.push(fwd);
                synthesis.push(inv);
            }

            let next = shape
                .band_dims
                .get(scale + 1)
                .copied()
                .unwrap_or(shape.lowpass_dims);
            let crop_start = (dims.0 / 2 - next.0 / 2, dims.1 / 2 - next.1 / 2);
            log_rad = crop(&log_rad, crop_start, next);
            angle = crop(&angle, crop_start, next);
            let (_, lo_mask) = radial_masks(&log_rad, transition);

            bank_scales.push(ScaleFilters {
                dims,
                analysis,
                synthesis,
                lo_mask,
                crop_start,
                fft: Fft2d::new(&mut planner, dims.0, dims.1),
            });
        }

        let full_fft = Fft2d::new(&mut planner, height, width);
        let lowpass_fft = Fft2d::new(&mut planner, shape.lowpass_dims.0, shape.lowpass_dims.1);

        debug!(%shape, "Steerable filter bank frozen");

        Ok(Self {
            shape,
            hi0_mask,
            lo0_mask,
            scales: bank_scales,
            full_fft,
            lowpass_fft,
            order: order as u32,
        })
    }
}

/// Log2 radius and angle of every frequency sample in centred layout.
///
/// Coordinates are normalised so the Nyquist frequency sits at radius 1.
/// The DC radius is replaced by its left neighbour to keep the log finite.
fn polar_grid(height: usize, width: usize) -> (Array2<f64>, Array2<f64>) {
    let ctr_r = height / 2;
    let ctr_c = width / 2;
    let half_h = height as f64 / 2.0;
    let half_w = width as f64 / 2.0;

    let mut rad = Array2::<f64>::zeros((height, width));
    let mut angle = Array2::<f64>::zeros((height, width));
    for row in 0..height {
        let y = (row as f64 - ctr_r as f64) / half_h;
        for col in 0..width {
            let x = (col as f64 - ctr_c as f64) / half_w;
            rad[[row, col]] = (x * x + y * y).sqrt();
            angle[[row, col]] = y.atan2(x);
        }
    }
    rad[[ctr_r, ctr_c]] = rad[[ctr_r, ctr_c - 1]];

    (rad.mapv(f64::log2), angle)
}

/// Raised-cosine high/low pair over the log2-radius interval `[a, a + 1]`.
///
/// `hi^2 + lo^2 == 1` everywhere.
fn radial_masks(log_rad: &Array2<f64>, a: f64) -> (Array2<f64>, Array2<f64>) {
    let hi = log_rad.mapv(|r| {
        if r <= a {
            0.0
        } else if r >= a + 1.0 {
            1.0
        } else {
            (FRAC_PI_2 * (a + 1.0 - r)).cos()
        }
    });
    let lo = log_rad.mapv(|r| {
        if r <= a {
            1.0
        } else if r >= a + 1.0 {
            0.0
        } else {
            (FRAC_PI_2 * (a + 1.0 - r)).sin()
        }
    });
    (hi, lo)
}

/// Normalisation making `sum_b c * cos^(2 order)(theta - pi b / K)` equal 1.
fn angular_constant(orientations: usize) -> f64 {
    let order = orientations - 1;
    let numerator = 2f64.powi(2 * order as i32) * factorial(order).powi(2);
    numerator / (orientations as f64 * factorial(2 * order))
}

fn factorial(n: usize) -> f64 {
    (1..=n).map(|k| k as f64).product()
}

fn wrap_angle(theta: f64) -> f64 {
    (theta + PI).rem_euclid(TAU) - PI
}

fn crop(data: &Array2<f64>, start: (usize, usize), dims: (usize, usize)) -> Array2<f64> {
    data.slice(s![start.0..start.0 + dims.0, start.1..start.1 + dims.1])
        .to_owned()
}
