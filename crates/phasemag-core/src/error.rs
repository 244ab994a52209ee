use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhasemagError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid SER file: {0}")]
    InvalidSer(String),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Frame index {index} out of range (total: {total})")]
    FrameIndexOutOfRange { index: usize, total: usize },

    /// A frame, coefficient set or packed array disagrees with the shape
    /// frozen on first use. Fatal for the run.
    #[error("Shape mismatch: expected {expected}, got {found}")]
    ShapeMismatch { expected: String, found: String },

    /// Non-finite values or a missing filter bank during synthesis. Fatal.
    #[error("Reconstruction failed: {0}")]
    ReconstructionFailure(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to decode frame {index}: {reason}")]
    FrameDecode { index: usize, reason: String },

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Empty frame sequence")]
    EmptySequence,
}

impl PhasemagError {
    pub(crate) fn shape(expected: impl std::fmt::Display, found: impl std::fmt::Display) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PhasemagError>;
