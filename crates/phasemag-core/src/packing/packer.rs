use std::fmt;
use std::ops::Range;

use ndarray::Array2;
use num_complex::Complex;
use tracing::debug;

use crate::error::{PhasemagError, Result};
use crate::frame::FrameMetadata;
use crate::pyramid::PyramidCoefficients;

use super::window::CoefficientWindow;

/// Which part of the pyramid a packed segment holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    Band { scale: usize, orientation: usize },
    Highpass,
    Lowpass,
}

/// One contiguous run of a packed array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub dims: (usize, usize),
    pub offset: usize,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.dims.0 * self.dims.1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len()
    }
}

/// Canonical flat ordering of a coefficient set.
///
/// Bands come first (scale-major, orientation-minor, row-major inside a
/// band), then the high-pass residual, then the low-pass residual.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedLayout {
    segments: Vec<Segment>,
    band_len: usize,
    total_len: usize,
}

impl PackedLayout {
    pub fn from_coefficients(coefficients: &PyramidCoefficients) -> Self {
        let mut segments = Vec::new();
        let mut offset = 0;
        for (scale, orients) in coefficients.bands.iter().enumerate() {
            for (orientation, band) in orients.iter().enumerate() {
                segments.push(Segment {
                    kind: SegmentKind::Band { scale, orientation },
                    dims: band.dim(),
                    offset,
                });
                offset += band.len();
            }
        }
        let band_len = offset;

        for (kind, dims) in [
            (SegmentKind::Highpass, coefficients.highpass.dim()),
            (SegmentKind::Lowpass, coefficients.lowpass.dim()),
        ] {
            let segment = Segment { kind, dims, offset };
            offset += segment.len();
            segments.push(segment);
        }

        Self {
            segments,
            band_len,
            total_len: offset,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of complex band coefficients (the phase-filtered prefix).
    pub fn band_len(&self) -> usize {
        self.band_len
    }

    pub fn total_len(&self) -> usize {
        self.total_len
    }

    fn matches(&self, coefficients: &PyramidCoefficients) -> bool {
        *self == Self::from_coefficients(coefficients)
    }

    fn segment(&self, kind: SegmentKind) -> Option<&Segment> {
        self.segments.iter().find(|s| s.kind == kind)
    }
}

impl fmt::Display for PackedLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} segments ({} band + {} residual coefficients)",
            self.segments.len(),
            self.band_len,
            self.total_len - self.band_len
        )
    }
}

/// Flat buffer of one frame's coefficients in canonical order.
///
/// Residuals are stored with a zero imaginary part.
#[derive(Clone, Debug, PartialEq)]
pub struct PackedArray {
    data: Vec<Complex<f64>>,
    band_len: usize,
}

impl PackedArray {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[Complex<f64>] {
        &self.data
    }

    /// The complex band coefficients.
    pub fn bands(&self) -> &[Complex<f64>] {
        &self.data[..self.band_len]
    }

    /// Phase angle of every band coefficient.
    pub fn band_phases(&self) -> Vec<f32> {
        self.bands().iter().map(|c| c.arg() as f32).collect()
    }
}

/// Flattens pyramid coefficients and owns the temporal window of packed frames.
pub struct CoefficientPacker {
    layout: Option<PackedLayout>,
    window: CoefficientWindow,
}

impl CoefficientPacker {
    pub fn new(window_size: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(PhasemagError::InvalidConfig(
                "window size must be at least 1".into(),
            ));
        }
        Ok(Self {
            layout: None,
            window: CoefficientWindow::new(window_size),
        })
    }

    /// Layout frozen by the first [`pack`](Self::pack) call.
    pub fn layout(&self) -> Option<&PackedLayout> {
        self.layout.as_ref()
    }

    pub fn band_len(&self) -> Option<usize> {
        self.layout.as_ref().map(PackedLayout::band_len)
    }

    pub fn window(&self) -> &CoefficientWindow {
        &self.window
    }

    pub fn pack(&mut self, coefficients: &PyramidCoefficients) -> Result<PackedArray> {
        self.pack_into(coefficients, None)
    }

    /// Pack, reusing the allocation of `buffer` (typically an evicted window entry).
    pub fn pack_into(
        &mut self,
        coefficients: &PyramidCoefficients,
        buffer: Option<PackedArray>,
    ) -> Result<PackedArray> {
        let layout = self.freeze(coefficients)?;

        let mut data = buffer.map(|p| p.data).unwrap_or_default();
        data.clear();
        data.reserve(layout.total_len());
        for band in coefficients.iter_bands() {
            data.extend(band.iter().copied());
        }
        data.extend(coefficients.highpass.iter().map(|&v| Complex::new(v, 0.0)));
        data.extend(coefficients.lowpass.iter().map(|&v| Complex::new(v, 0.0)));

        Ok(PackedArray {
            data,
            band_len: layout.band_len(),
        })
    }

    /// Rebuild the coefficient structure from a packed array.
    pub fn unpack(&self, packed: &PackedArray) -> Result<PyramidCoefficients> {
        let layout = self.layout.as_ref().ok_or_else(|| {
            PhasemagError::shape("a frozen packing layout", "no frame packed yet")
        })?;
        if packed.len() != layout.total_len() || packed.band_len != layout.band_len() {
            return Err(PhasemagError::shape(
                format!("{} coefficients", layout.total_len()),
                format!("{} coefficients", packed.len()),
            ));
        }

        let mut bands: Vec<Vec<Array2<Complex<f64>>>> = Vec::new();
        for segment in layout.segments() {
            if let SegmentKind::Band { scale, .. } = segment.kind {
                if bands.len() <= scale {
                    bands.push(Vec::new());
                }
                let band = to_array(segment, packed.data[segment.range()].to_vec())?;
                bands[scale].push(band);
            }
        }

        let highpass = residual(layout, SegmentKind::Highpass, packed)?;
        let lowpass = residual(layout, SegmentKind::Lowpass, packed)?;

        Ok(PyramidCoefficients {
            highpass,
            bands,
            lowpass,
        })
    }

    /// Insert a packed frame into the window, evicting the oldest when full.
    ///
    /// Returns the evicted array so its allocation can be reused.
    pub fn push_to_window(
        &mut self,
        packed: PackedArray,
        metadata: FrameMetadata,
    ) -> Result<Option<PackedArray>> {
        if let Some(ref layout) = self.layout {
            if packed.len() != layout.total_len() {
                return Err(PhasemagError::shape(layout, format!("{} coefficients", packed.len())));
            }
        }
        self.window.push(packed, metadata)
    }

    fn freeze(&mut self, coefficients: &PyramidCoefficients) -> Result<&PackedLayout> {
        let layout = match self.layout.take() {
            Some(layout) => layout,
            None => {
                let layout = PackedLayout::from_coefficients(coefficients);
                debug!(%layout, "Packing layout frozen");
                layout
            }
        };
        let layout = self.layout.insert(layout);
        if !layout.matches(coefficients) {
            return Err(PhasemagError::shape(&*layout, coefficients.describe()));
        }
        Ok(&*layout)
    }
}

fn to_array<T>(segment: &Segment, values: Vec<T>) -> Result<Array2<T>> {
    Array2::from_shape_vec(segment.dims, values)
        .map_err(|e| PhasemagError::shape(format!("{:?} segment", segment.dims), e))
}

fn residual(layout: &PackedLayout, kind: SegmentKind, packed: &PackedArray) -> Result<Array2<f64>> {
    let segment = layout
        .segment(kind)
        .ok_or_else(|| PhasemagError::shape(format!("{kind:?} segment"), "missing segment"))?;
    let values = packed.data[segment.range()].iter().map(|c| c.re).collect();
    to_array(segment, values)
}
