pub mod coefficients;
pub mod fft;
mod filters;
pub mod steerable;

pub use coefficients::{PyramidCoefficients, PyramidShape};
pub use steerable::{PyramidConfig, SteerablePyramid};
