use std::collections::VecDeque;

use crate::error::{PhasemagError, Result};
use crate::frame::{ColorFrame, Frame};

use super::sink::FrameSink;
use super::source::FrameSource;

/// Frames held in memory. An `Err` entry simulates an undecodable frame.
pub struct MemorySource {
    frames: VecDeque<Result<Frame>>,
    total: usize,
    frame_rate: Option<f64>,
    dimensions: Option<(u32, u32)>,
    next_index: usize,
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self::from_results(frames.into_iter().map(Ok).collect())
    }

    pub fn from_results(frames: Vec<Result<Frame>>) -> Self {
        let dimensions = frames.iter().find_map(|f| {
            f.as_ref()
                .ok()
                .map(|f| (f.width() as u32, f.height() as u32))
        });
        Self {
            total: frames.len(),
            frames: frames.into(),
            frame_rate: None,
            dimensions,
            next_index: 0,
        }
    }

    pub fn with_frame_rate(mut self, rate: f64) -> Self {
        self.frame_rate = Some(rate);
        self
    }

    /// An error entry that fails like a corrupt frame.
    pub fn decode_error(index: usize) -> PhasemagError {
        PhasemagError::FrameDecode {
            index,
            reason: "simulated decode failure".into(),
        }
    }
}

impl FrameSource for MemorySource {
    fn frame_count(&self) -> Option<usize> {
        Some(self.total)
    }

    fn frame_rate(&self) -> Option<f64> {
        self.frame_rate
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(next) = self.frames.pop_front() else {
            return Ok(None);
        };
        let index = self.next_index;
        self.next_index += 1;
        next.map(|mut frame| {
            frame.metadata.frame_index = index;
            Some(frame)
        })
    }
}

/// Collects written frames.
#[derive(Default)]
pub struct MemorySink {
    pub frames: Vec<ColorFrame>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: &ColorFrame) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }

    fn frames_written(&self) -> usize {
        self.frames.len()
    }
}
