use std::sync::Arc;

use ndarray::Array2;
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Forward and inverse 2-D FFT plans for one array size.
///
/// Rows are transformed first, then columns. The inverse is normalised by
/// `1 / (h * w)` so `inverse(forward(x)) == x`.
pub struct Fft2d {
    height: usize,
    width: usize,
    row_fwd: Arc<dyn Fft<f64>>,
    col_fwd: Arc<dyn Fft<f64>>,
    row_inv: Arc<dyn Fft<f64>>,
    col_inv: Arc<dyn Fft<f64>>,
}

impl Fft2d {
    pub fn new(planner: &mut FftPlanner<f64>, height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            row_fwd: planner.plan_fft_forward(width),
            col_fwd: planner.plan_fft_forward(height),
            row_inv: planner.plan_fft_inverse(width),
            col_inv: planner.plan_fft_inverse(height),
        }
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn forward(&self, data: &mut Array2<Complex<f64>>) {
        debug_assert_eq!(data.dim(), self.dims());
        process_rows(data, self.row_fwd.as_ref());
        process_cols(data, self.col_fwd.as_ref());
    }

    pub fn inverse(&self, data: &mut Array2<Complex<f64>>) {
        debug_assert_eq!(data.dim(), self.dims());
        process_cols(data, self.col_inv.as_ref());
        process_rows(data, self.row_inv.as_ref());
        let scale = 1.0 / (self.height * self.width) as f64;
        data.mapv_inplace(|v| v * scale);
    }
}

fn process_rows(data: &mut Array2<Complex<f64>>, fft: &dyn Fft<f64>) {
    let mut buf = vec![Complex::new(0.0, 0.0); data.ncols()];
    for mut row in data.rows_mut() {
        for (dst, src) in buf.iter_mut().zip(row.iter()) {
            *dst = *src;
        }
        fft.process(&mut buf);
        for (dst, src) in row.iter_mut().zip(buf.iter()) {
            *dst = *src;
        }
    }
}

fn process_cols(data: &mut Array2<Complex<f64>>, fft: &dyn Fft<f64>) {
    let mut buf = vec![Complex::new(0.0, 0.0); data.nrows()];
    for mut col in data.columns_mut() {
        for (dst, src) in buf.iter_mut().zip(col.iter()) {
            *dst = *src;
        }
        fft.process(&mut buf);
        for (dst, src) in col.iter_mut().zip(buf.iter()) {
            *dst = *src;
        }
    }
}

/// Move the zero-frequency sample to the centre (`d / 2`) of each axis.
pub fn fftshift<T: Clone>(data: &Array2<T>) -> Array2<T> {
    let (h, w) = data.dim();
    Array2::from_shape_fn((h, w), |(r, c)| {
        data[[(r + h - h / 2) % h, (c + w - w / 2) % w]].clone()
    })
}

/// Inverse of [`fftshift`], also for odd sizes.
pub fn ifftshift<T: Clone>(data: &Array2<T>) -> Array2<T> {
    let (h, w) = data.dim();
    Array2::from_shape_fn((h, w), |(r, c)| data[[(r + h / 2) % h, (c + w / 2) % w]].clone())
}

/// Forward transform of a complex array, returned in centred layout.
pub fn spectrum(fft: &Fft2d, data: &Array2<Complex<f64>>) -> Array2<Complex<f64>> {
    let mut work = data.clone();
    fft.forward(&mut work);
    fftshift(&work)
}

/// Forward transform of a real array, returned in centred layout.
pub fn spectrum_real(fft: &Fft2d, data: &Array2<f64>) -> Array2<Complex<f64>> {
    let mut work = data.mapv(|v| Complex::new(v, 0.0));
    fft.forward(&mut work);
    fftshift(&work)
}

/// Inverse transform of a centred spectrum.
pub fn synthesize(fft: &Fft2d, centred: &Array2<Complex<f64>>) -> Array2<Complex<f64>> {
    let mut work = ifftshift(centred);
    fft.inverse(&mut work);
    work
}

/// Inverse transform of a centred spectrum, keeping the real part.
pub fn synthesize_real(fft: &Fft2d, centred: &Array2<Complex<f64>>) -> Array2<f64> {
    synthesize(fft, centred).mapv(|v| v.re)
}
