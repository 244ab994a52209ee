use std::path::{Path, PathBuf};

use crate::error::{PhasemagError, Result};
use crate::frame::{Frame, SourceInfo};

use super::image_io::{list_images, load_image};
use super::ser::SerReader;

/// Sequential supplier of luminance frames.
pub trait FrameSource {
    /// Total number of frames, when known up front.
    fn frame_count(&self) -> Option<usize>;

    /// Native frame rate in Hz, when the container records one.
    fn frame_rate(&self) -> Option<f64>;

    /// Frame size as `(width, height)`, when known before decoding.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Next frame, `Ok(None)` at end of stream, `Err` when a frame cannot be decoded.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn frame_count(&self) -> Option<usize> {
        (**self).frame_count()
    }

    fn frame_rate(&self) -> Option<f64> {
        (**self).frame_rate()
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        (**self).dimensions()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }
}

/// Frames of a SER video, read in order.
pub struct SerFrameSource {
    reader: SerReader,
    path: PathBuf,
    next_index: usize,
}

impl SerFrameSource {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            reader: SerReader::open(path)?,
            path: path.to_path_buf(),
            next_index: 0,
        })
    }

    pub fn info(&self) -> SourceInfo {
        self.reader.source_info(&self.path)
    }
}

impl FrameSource for SerFrameSource {
    fn frame_count(&self) -> Option<usize> {
        Some(self.reader.frame_count())
    }

    fn frame_rate(&self) -> Option<f64> {
        self.reader.frame_rate()
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.reader.header.width, self.reader.header.height))
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.next_index >= self.reader.frame_count() {
            return Ok(None);
        }
        let index = self.next_index;
        self.next_index += 1;
        self.reader.read_frame(index).map(Some)
    }
}

/// A sorted directory of still images treated as consecutive frames.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next_index: usize,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> Result<Self> {
        Ok(Self {
            paths: list_images(dir)?,
            next_index: 0,
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl FrameSource for ImageSequenceSource {
    fn frame_count(&self) -> Option<usize> {
        Some(self.paths.len())
    }

    fn frame_rate(&self) -> Option<f64> {
        None
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        image::image_dimensions(self.paths.first()?).ok()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.paths.get(self.next_index) else {
            return Ok(None);
        };
        let index = self.next_index;
        self.next_index += 1;
        let frame = load_image(path).map_err(|e| PhasemagError::FrameDecode {
            index,
            reason: format!("{}: {e}", path.display()),
        })?;
        Ok(Some(frame.with_index(index)))
    }
}
