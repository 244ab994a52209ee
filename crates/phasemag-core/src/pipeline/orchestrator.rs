use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{PhasemagError, Result};
use crate::frame::Frame;
use crate::io::{open_sink, open_source, FrameSink, FrameSource};
use crate::magnify::MagnificationReconstructor;
use crate::packing::{CoefficientPacker, PackedArray};
use crate::pyramid::SteerablePyramid;
use crate::temporal::{FilterOutput, TemporalFilter};

use super::config::{MagnificationConfig, PipelineConfig};
use super::types::{MagnifyReport, NoOpReporter, PipelineStage, PipelineState, ProgressReporter};

/// Per-run components and counters.
struct MagnifyRun {
    pyramid: SteerablePyramid,
    packer: CoefficientPacker,
    filter: TemporalFilter,
    reconstructor: MagnificationReconstructor,
    state: PipelineState,
    frames_read: usize,
    frames_written: usize,
    iterations: usize,
    first_output_iteration: Option<usize>,
    read_stopped_early: bool,
    next_emit: usize,
    filter_ready: bool,
    newest_phases: Vec<f32>,
    recycled: Option<PackedArray>,
}

impl MagnifyRun {
    fn transition(&mut self, next: PipelineState) {
        debug!(from = %self.state, to = %next, iteration = self.iterations, "Pipeline state change");
        self.state = next;
    }

    /// Read, decompose, pack and filter one source frame.
    fn ingest<K: FrameSink + ?Sized>(&mut self, frame: Frame, sink: &mut K) -> Result<()> {
        let coefficients = self.pyramid.build(&frame)?;
        let packed = self.packer.pack_into(&coefficients, self.recycled.take())?;
        self.newest_phases = packed.band_phases();
        self.recycled = self.packer.push_to_window(packed, frame.metadata)?;
        self.filter.update(&self.newest_phases)?;
        self.frames_read += 1;
        self.emit(sink)
    }

    /// Feed the newest phases again so buffered frames come out.
    fn drain_step<K: FrameSink + ?Sized>(&mut self, sink: &mut K) -> Result<()> {
        self.filter.update(&self.newest_phases)?;
        self.emit(sink)
    }

    fn drained(&self) -> bool {
        self.filter.samples_seen() >= self.frames_read + self.filter.delay()
    }

    /// Magnify and write the frame the filter output belongs to, if any.
    ///
    /// Frames whose filter output is still settling are written unmagnified.
    fn emit<K: FrameSink + ?Sized>(&mut self, sink: &mut K) -> Result<()> {
        let output = self.filter.next();
        let Some(index) = self.filter.samples_seen().checked_sub(1 + self.filter.delay()) else {
            return Ok(());
        };
        if index < self.next_emit {
            return Ok(());
        }

        let (metadata, packed) = self.packer.window().get(index).ok_or_else(|| {
            PhasemagError::ReconstructionFailure(format!("frame {index} is no longer in the window"))
        })?;
        let metadata = metadata.clone();
        let original = self.packer.unpack(packed)?;
        let magnified = match output {
            FilterOutput::Ready(filtered) => {
                self.filter_ready = true;
                self.reconstructor.magnify(&original, &filtered)?
            }
            FilterOutput::NotReady => original,
        };
        let mut color = self.reconstructor.to_frame(&self.pyramid, &magnified)?;
        for channel in [&mut color.red, &mut color.green, &mut color.blue] {
            channel.metadata = metadata.clone();
        }

        sink.write_frame(&color)?;
        self.frames_written += 1;
        self.next_emit = index + 1;
        if self.first_output_iteration.is_none() {
            self.first_output_iteration = Some(self.iterations - 1);
        }
        Ok(())
    }
}

/// Magnify every frame of `source` into `sink`.
pub fn run_magnification<S, K>(
    source: &mut S,
    sink: &mut K,
    config: &MagnificationConfig,
) -> Result<MagnifyReport>
where
    S: FrameSource + ?Sized,
    K: FrameSink + ?Sized,
{
    run_magnification_reported(source, sink, config, Arc::new(NoOpReporter))
}

/// Magnify with a thread-safe progress reporter.
///
/// The sink is finished even when the run fails; the first error wins.
pub fn run_magnification_reported<S, K>(
    source: &mut S,
    sink: &mut K,
    config: &MagnificationConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<MagnifyReport>
where
    S: FrameSource + ?Sized,
    K: FrameSink + ?Sized,
{
    config.validate()?;
    let band = config.resolve_pass_band(source.frame_rate())?;
    let window_size = config.temporal.window_size;

    let mut run = MagnifyRun {
        pyramid: SteerablePyramid::new(config.pyramid.clone())?,
        packer: CoefficientPacker::new(window_size)?,
        filter: TemporalFilter::new(&config.temporal.strategy, window_size, band)?,
        reconstructor: MagnificationReconstructor::new(config.factor)?,
        state: PipelineState::Warmup,
        frames_read: 0,
        frames_written: 0,
        iterations: 0,
        first_output_iteration: None,
        read_stopped_early: false,
        next_emit: 0,
        filter_ready: false,
        newest_phases: Vec::new(),
        recycled: None,
    };

    let frame_budget = source
        .frame_count()
        .map_or(config.max_frames, |n| n.min(config.max_frames));
    let iteration_budget = frame_budget + window_size;

    info!(
        frames = frame_budget,
        window_size,
        factor = config.factor,
        band = %band,
        filter = run.filter.name(),
        scales = config.pyramid.scales,
        orientations = config.pyramid.orientations,
        "Starting motion magnification"
    );

    let outcome = drive(&mut run, source, sink, frame_budget, iteration_budget, &reporter);

    reporter.begin_stage(PipelineStage::Finalizing, None);
    let finished = sink.finish();
    reporter.finish_stage();
    outcome?;
    finished?;

    if run.frames_read == 0 {
        return Err(PhasemagError::EmptySequence);
    }

    info!(
        read = run.frames_read,
        written = run.frames_written,
        iterations = run.iterations,
        "Motion magnification complete"
    );

    Ok(MagnifyReport {
        frames_read: run.frames_read,
        frames_written: run.frames_written,
        iterations: run.iterations,
        first_output_iteration: run.first_output_iteration,
        read_stopped_early: run.read_stopped_early,
        final_state: run.state,
        sampling_rate: band.sampling_rate,
        filter: run.filter.name(),
    })
}

fn drive<S, K>(
    run: &mut MagnifyRun,
    source: &mut S,
    sink: &mut K,
    frame_budget: usize,
    iteration_budget: usize,
    reporter: &Arc<dyn ProgressReporter>,
) -> Result<()>
where
    S: FrameSource + ?Sized,
    K: FrameSink + ?Sized,
{
    reporter.begin_stage(PipelineStage::Magnifying, Some(frame_budget));

    while run.state != PipelineState::Done {
        if run.iterations >= iteration_budget {
            debug!(iterations = run.iterations, "Iteration budget exhausted");
            run.transition(PipelineState::Done);
            break;
        }

        match run.state {
            PipelineState::Warmup | PipelineState::Steady => {
                if run.frames_read >= frame_budget {
                    start_draining(run, reporter);
                    continue;
                }
                let frame = match source.next_frame() {
                    Ok(Some(frame)) => frame,
                    Ok(None) => {
                        run.read_stopped_early = true;
                        start_draining(run, reporter);
                        continue;
                    }
                    Err(e) => {
                        warn!(frame = run.frames_read, error = %e, "Frame could not be decoded, draining");
                        run.read_stopped_early = true;
                        start_draining(run, reporter);
                        continue;
                    }
                };

                run.iterations += 1;
                run.ingest(frame, sink)?;
                reporter.advance(run.frames_read);
                if run.state == PipelineState::Warmup && run.filter_ready {
                    run.transition(PipelineState::Steady);
                }
            }
            PipelineState::Draining => {
                if run.frames_read == 0 || run.drained() {
                    run.transition(PipelineState::Done);
                    continue;
                }
                run.iterations += 1;
                run.drain_step(sink)?;
                reporter.advance(run.frames_written);
            }
            PipelineState::Done => {}
        }
    }

    reporter.finish_stage();
    Ok(())
}

fn start_draining(run: &mut MagnifyRun, reporter: &Arc<dyn ProgressReporter>) {
    run.transition(PipelineState::Draining);
    reporter.finish_stage();
    reporter.begin_stage(PipelineStage::Draining, Some(run.frames_read));
}

/// Run the full pipeline from file paths with a thread-safe progress reporter.
pub fn run_pipeline_reported(
    config: &PipelineConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<MagnifyReport> {
    let mut source = open_source(&config.input)?;
    let (width, height) = source
        .dimensions()
        .ok_or(PhasemagError::InvalidDimensions { width: 0, height: 0 })?;
    info!(
        input = %config.input.display(),
        output = %config.output.display(),
        width,
        height,
        total_frames = ?source.frame_count(),
        "Opened frame source"
    );
    let mut sink = open_sink(&config.output, width, height)?;
    run_magnification_reported(
        source.as_mut(),
        sink.as_mut(),
        &config.magnification,
        reporter,
    )
}

/// Run the full pipeline from file paths.
pub fn run_pipeline(config: &PipelineConfig) -> Result<MagnifyReport> {
    run_pipeline_reported(config, Arc::new(NoOpReporter))
}
