use std::fmt;

/// Orchestrator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// Frames are read but the filter has not produced output yet.
    Warmup,
    /// Every read frame yields one output frame.
    Steady,
    /// Input is over; buffered frames are flushed.
    Draining,
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warmup => write!(f, "warmup"),
            Self::Steady => write!(f, "steady"),
            Self::Draining => write!(f, "draining"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Magnifying,
    Draining,
    Finalizing,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Magnifying => write!(f, "Magnifying frames"),
            Self::Draining => write!(f, "Flushing window"),
            Self::Finalizing => write!(f, "Finalizing output"),
        }
    }
}

/// Summary of a finished run.
#[derive(Clone, Debug, PartialEq)]
pub struct MagnifyReport {
    pub frames_read: usize,
    pub frames_written: usize,
    /// Read iterations plus drain iterations.
    pub iterations: usize,
    /// Zero-based iteration that produced the first output frame.
    pub first_output_iteration: Option<usize>,
    /// Reading ended before the frame budget because of end of stream or a decode failure.
    pub read_stopped_early: bool,
    pub final_state: PipelineState,
    /// Rate the temporal filter was designed for.
    pub sampling_rate: f64,
    pub filter: &'static str,
}

/// Thread-safe progress reporting for the pipeline.
///
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started; `total_items` is its frame count, if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// `items_done` work items of the current stage are complete.
    fn advance(&self, _items_done: usize) {}

    fn finish_stage(&self) {}
}

/// Reporter that ignores everything.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
