use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::frame::ColorFrame;

use super::image_io::save_color_png;
use super::ser::SerHeader;
use super::ser_writer::SerWriter;

/// Destination for magnified frames.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &ColorFrame) -> Result<()>;

    /// Flush and close. Called once after the last frame.
    fn finish(&mut self) -> Result<()>;

    fn frames_written(&self) -> usize;
}

impl<K: FrameSink + ?Sized> FrameSink for Box<K> {
    fn write_frame(&mut self, frame: &ColorFrame) -> Result<()> {
        (**self).write_frame(frame)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }

    fn frames_written(&self) -> usize {
        (**self).frames_written()
    }
}

/// 8-bit RGB SER output.
///
/// Timestamps of the incoming frames are collected and written as the
/// trailer when every frame carried one.
pub struct SerFrameSink {
    writer: Option<SerWriter>,
    path: PathBuf,
    timestamps: Vec<Option<u64>>,
    written: usize,
}

impl SerFrameSink {
    pub fn create(path: &Path, width: u32, height: u32) -> Result<Self> {
        let writer = SerWriter::create(path, &SerHeader::rgb8(width, height))?;
        Ok(Self {
            writer: Some(writer),
            path: path.to_path_buf(),
            timestamps: Vec::new(),
            written: 0,
        })
    }
}

impl FrameSink for SerFrameSink {
    fn write_frame(&mut self, frame: &ColorFrame) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(std::io::Error::other("SER sink already finished").into());
        };
        writer.write_rgb_frame(frame)?;
        self.timestamps.push(frame.red.metadata.timestamp_us);
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        let ticks: Option<Vec<u64>> = self
            .timestamps
            .iter()
            .map(|ts| ts.map(|us| us * 10))
            .collect();
        if let Some(ticks) = ticks.filter(|t| !t.is_empty()) {
            writer.write_timestamps(&ticks)?;
        }
        writer.finalize()?;
        debug!(path = %self.path.display(), frames = self.written, "SER output finalized");
        Ok(())
    }

    fn frames_written(&self) -> usize {
        self.written
    }
}

/// Numbered PNG files (`frame_000000.png`, ...) in a directory.
pub struct ImageSequenceSink {
    dir: PathBuf,
    written: usize,
}

impl ImageSequenceSink {
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: 0,
        })
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.png"))
    }
}

impl FrameSink for ImageSequenceSink {
    fn write_frame(&mut self, frame: &ColorFrame) -> Result<()> {
        save_color_png(frame, &self.frame_path(frame.frame_index()))?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    fn frames_written(&self) -> usize {
        self.written
    }
}
