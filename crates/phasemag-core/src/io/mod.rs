pub mod image_io;
pub mod memory;
pub mod ser;
pub mod ser_writer;
pub mod sink;
pub mod source;

use std::path::Path;

use crate::error::Result;

pub use memory::{MemorySink, MemorySource};
pub use sink::{FrameSink, ImageSequenceSink, SerFrameSink};
pub use source::{FrameSource, ImageSequenceSource, SerFrameSource};

fn is_ser(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ser"))
}

/// Open a SER video, or a directory of images.
pub fn open_source(path: &Path) -> Result<Box<dyn FrameSource>> {
    if path.is_dir() {
        Ok(Box::new(ImageSequenceSource::open(path)?))
    } else {
        Ok(Box::new(SerFrameSource::open(path)?))
    }
}

/// Create a SER writer for `.ser` paths, otherwise a PNG sequence directory.
pub fn open_sink(path: &Path, width: u32, height: u32) -> Result<Box<dyn FrameSink>> {
    if is_ser(path) {
        Ok(Box::new(SerFrameSink::create(path, width, height)?))
    } else {
        Ok(Box::new(ImageSequenceSink::create(path)?))
    }
}
