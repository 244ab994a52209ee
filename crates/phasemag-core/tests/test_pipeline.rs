mod common;

use std::sync::{Arc, Mutex};

use ndarray::Array2;

use phasemag_core::error::PhasemagError;
use phasemag_core::frame::{ColorFrame, Frame};
use phasemag_core::io::ser::SerReader;
use phasemag_core::io::{MemorySink, MemorySource};
use phasemag_core::pipeline::{
    run_magnification, run_magnification_reported, run_pipeline, MagnificationConfig,
    PipelineConfig, PipelineStage, PipelineState, ProgressReporter, TemporalConfig,
};
use phasemag_core::pyramid::PyramidConfig;
use phasemag_core::temporal::FilterStrategy;

/// Small-frame config: 30 Hz video, 4-6 Hz band.
fn config(window_size: usize, factor: f64) -> MagnificationConfig {
    MagnificationConfig {
        pyramid: PyramidConfig {
            scales: 2,
            orientations: 4,
        },
        temporal: TemporalConfig {
            window_size,
            sampling_rate: Some(30.0),
            low_freq: 4.0,
            high_freq: 6.0,
            strategy: FilterStrategy::default(),
        },
        factor,
        max_frames: 60_000,
    }
}

fn run(frames: Vec<Frame>, config: &MagnificationConfig) -> (MemorySink, MagnifyResult) {
    let mut source = MemorySource::new(frames);
    let mut sink = MemorySink::new();
    let result = run_magnification(&mut source, &mut sink, config);
    (sink, result)
}

type MagnifyResult = phasemag_core::error::Result<phasemag_core::pipeline::MagnifyReport>;

fn luma(frame: &ColorFrame) -> &Array2<f32> {
    &frame.red.data
}

// ---------------------------------------------------------------------------
// Identity and latency
// ---------------------------------------------------------------------------

#[test]
fn test_zero_factor_reproduces_input() {
    let frames = common::oscillating_grating_sequence(6, 32, 32, 5.0, 30.0);
    let (sink, result) = run(frames.clone(), &config(3, 0.0));
    let report = result.unwrap();

    assert_eq!(report.frames_read, 6);
    assert_eq!(report.frames_written, 6);
    assert_eq!(sink.frames.len(), 6);
    for (out, inp) in sink.frames.iter().zip(&frames) {
        for (a, b) in luma(out).iter().zip(inp.data.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }
}

#[test]
fn test_latency_and_order() {
    let frames = common::static_sequence(8, 32, 32);
    let (sink, result) = run(frames, &config(4, 10.0));
    let report = result.unwrap();

    assert_eq!(report.first_output_iteration, Some(3));
    assert_eq!(report.frames_written, report.frames_read);
    assert_eq!(report.iterations, 8 + 3);
    assert_eq!(report.final_state, PipelineState::Done);
    assert!(!report.read_stopped_early);
    assert!(sink.finished);
    let indices: Vec<usize> = sink.frames.iter().map(ColorFrame::frame_index).collect();
    assert_eq!(indices, (0..8).collect::<Vec<_>>());
}

#[test]
fn test_static_scene_unchanged_under_magnification() {
    let frames = common::static_sequence(5, 32, 32);
    let expected = frames[0].data.clone();
    let (sink, result) = run(frames, &config(3, 25.0));
    result.unwrap();
    for out in &sink.frames {
        for (a, b) in luma(out).iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-2);
        }
    }
}

#[test]
fn test_source_shorter_than_window() {
    let frames = common::static_sequence(3, 32, 32);
    let (sink, result) = run(frames, &config(5, 10.0));
    let report = result.unwrap();
    assert_eq!(report.frames_written, 3);
    // The first output appears while draining, after window_size samples.
    assert_eq!(report.first_output_iteration, Some(4));
    assert_eq!(sink.frames.len(), 3);
}

// ---------------------------------------------------------------------------
// Budgets and failures
// ---------------------------------------------------------------------------

#[test]
fn test_max_frames_cap() {
    let frames = common::static_sequence(10, 32, 32);
    let mut c = config(3, 10.0);
    c.max_frames = 6;
    let (sink, result) = run(frames, &c);
    let report = result.unwrap();
    assert_eq!(report.frames_read, 6);
    assert_eq!(report.frames_written, 6);
    assert!(!report.read_stopped_early);
    assert_eq!(sink.frames.len(), 6);
}

#[test]
fn test_shape_mismatch_halts_run() {
    let mut frames = common::static_sequence(5, 32, 32);
    frames.push(common::textured_frame(32, 40));
    frames.push(common::textured_frame(32, 32));
    let (sink, result) = run(frames, &config(3, 10.0));

    assert!(matches!(result, Err(PhasemagError::ShapeMismatch { .. })));
    // Frames 0..=2 were emitted before the bad frame; nothing after it.
    assert_eq!(sink.frames.len(), 3);
    assert!(sink.finished);
}

#[test]
fn test_decode_failure_drains_buffered_frames() {
    let mut entries: Vec<_> = common::static_sequence(4, 32, 32)
        .into_iter()
        .map(Ok)
        .collect();
    entries.push(Err(MemorySource::decode_error(4)));
    entries.push(Ok(common::textured_frame(32, 32)));

    let mut source = MemorySource::from_results(entries);
    let mut sink = MemorySink::new();
    let report = run_magnification(&mut source, &mut sink, &config(3, 10.0)).unwrap();

    assert_eq!(report.frames_read, 4);
    assert_eq!(report.frames_written, 4);
    assert!(report.read_stopped_early);
    assert_eq!(report.final_state, PipelineState::Done);
}

#[test]
fn test_empty_source() {
    let (sink, result) = run(Vec::new(), &config(3, 10.0));
    assert!(matches!(result, Err(PhasemagError::EmptySequence)));
    assert!(sink.finished);
}

#[test]
fn test_invalid_config_rejected_before_reading() {
    let (sink, result) = run(common::static_sequence(2, 32, 32), &config(0, 10.0));
    assert!(matches!(result, Err(PhasemagError::InvalidConfig(_))));
    assert!(sink.frames.is_empty());
}

#[test]
fn test_sampling_rate_from_source() {
    let mut c = config(3, 5.0);
    c.temporal.sampling_rate = None;

    let mut source = MemorySource::new(common::static_sequence(4, 32, 32)).with_frame_rate(24.0);
    let mut sink = MemorySink::new();
    let report = run_magnification(&mut source, &mut sink, &c).unwrap();
    assert_eq!(report.sampling_rate, 24.0);

    let mut source = MemorySource::new(common::static_sequence(4, 32, 32));
    let mut sink = MemorySink::new();
    let report = run_magnification(&mut source, &mut sink, &c).unwrap();
    assert_eq!(report.sampling_rate, 30.0);
}

// ---------------------------------------------------------------------------
// Motion amplification
// ---------------------------------------------------------------------------

fn temporal_std(frames: &[ColorFrame], rows: std::ops::Range<usize>, cols: std::ops::Range<usize>) -> f64 {
    let n = frames.len() as f64;
    let mut total = 0.0;
    let mut count = 0.0;
    for r in rows {
        for c in cols.clone() {
            let series: Vec<f64> = frames.iter().map(|f| luma(f)[[r, c]] as f64).collect();
            let mean = series.iter().sum::<f64>() / n;
            let var = series.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            total += var.sqrt();
            count += 1.0;
        }
    }
    total / count
}

fn mean_max_delta(
    a: &[ColorFrame],
    b: &[ColorFrame],
    rows: std::ops::Range<usize>,
    cols: std::ops::Range<usize>,
) -> f64 {
    let mut total = 0.0;
    let mut count = 0.0;
    for r in rows {
        for c in cols.clone() {
            let max = a
                .iter()
                .zip(b)
                .map(|(x, y)| (luma(x)[[r, c]] - luma(y)[[r, c]]).abs() as f64)
                .fold(0.0, f64::max);
            total += max;
            count += 1.0;
        }
    }
    total / count
}

#[test]
fn test_end_to_end_motion_is_amplified_locally() {
    let frames = common::oscillating_grating_sequence(10, 64, 64, 5.0, 30.0);
    let (still, r0) = run(frames.clone(), &config(8, 0.0));
    let (moving, r10) = run(frames, &config(8, 10.0));
    assert_eq!(r0.unwrap().frames_written, 10);
    assert_eq!(r10.unwrap().frames_written, 10);

    let near = 14..27;
    let far = 48..56;
    let std0 = temporal_std(&still.frames, near.clone(), near.clone());
    let std10 = temporal_std(&moving.frames, near.clone(), near.clone());
    assert!(std10 > 1.5 * std0, "std0 = {std0}, std10 = {std10}");

    let near_delta = mean_max_delta(&moving.frames, &still.frames, near.clone(), near);
    let far_delta = mean_max_delta(&moving.frames, &still.frames, far.clone(), far);
    assert!(
        far_delta < 0.1 * near_delta,
        "near = {near_delta}, far = {far_delta}"
    );
}

#[test]
fn test_end_to_end_brightness_ripple_is_amplified_in_region() {
    let frames = common::ripple_sequence(10, 64, 64, 30.0, 5.0, 30.0);
    let (still, r0) = run(frames.clone(), &config(8, 0.0));
    let (moving, r10) = run(frames.clone(), &config(8, 10.0));
    assert_eq!(r0.unwrap().frames_written, 10);
    assert_eq!(r10.unwrap().frames_written, 10);

    for (out, inp) in still.frames.iter().zip(&frames) {
        for (a, b) in luma(out).iter().zip(inp.data.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    let region = common::RIPPLE_REGION;
    let around = 12..36;
    let std0 = temporal_std(&still.frames, around.clone(), around.clone());
    let std10 = temporal_std(&moving.frames, around.clone(), around);
    assert!(std10 > std0, "std0 = {std0}, std10 = {std10}");

    let far = 48..56;
    let near_delta = mean_max_delta(&moving.frames, &still.frames, region.clone(), region);
    let far_delta = mean_max_delta(&moving.frames, &still.frames, far.clone(), far);
    assert!(near_delta > 1.0, "near = {near_delta}");
    assert!(
        far_delta < 0.1 * near_delta,
        "near = {near_delta}, far = {far_delta}"
    );
}

#[test]
fn test_butterworth_run() {
    let frames = common::oscillating_grating_sequence(12, 32, 32, 5.0, 30.0);
    let mut c = config(4, 10.0);
    c.temporal.strategy = FilterStrategy::butterworth();
    let (sink, result) = run(frames, &c);
    let report = result.unwrap();

    assert_eq!(report.filter, "butterworth");
    assert_eq!(report.first_output_iteration, Some(0));
    assert_eq!(report.frames_written, 12);
    assert_eq!(report.iterations, 12);
    assert!(sink
        .frames
        .iter()
        .all(|f| luma(f).iter().all(|v| (0.0..=255.0).contains(v))));
}

#[test]
fn test_butterworth_settling_frames_pass_through() {
    let frames = common::oscillating_grating_sequence(8, 32, 32, 5.0, 30.0);
    let mut c = config(4, 10.0);
    c.temporal.strategy = FilterStrategy::Butterworth {
        order: 3,
        settling_frames: 2,
    };
    let (sink, result) = run(frames.clone(), &c);
    let report = result.unwrap();

    assert_eq!(report.frames_read, 8);
    assert_eq!(report.frames_written, 8);
    assert_eq!(report.first_output_iteration, Some(0));
    assert_eq!(report.iterations, 8);
    assert_eq!(report.final_state, PipelineState::Done);

    let indices: Vec<usize> = sink.frames.iter().map(|f| f.frame_index()).collect();
    assert_eq!(indices, (0..8).collect::<Vec<_>>());

    // Settling frames are reconstructed without magnification.
    for (out, inp) in sink.frames.iter().zip(&frames).take(2) {
        for (a, b) in luma(out).iter().zip(inp.data.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Recorder {
    stages: Mutex<Vec<PipelineStage>>,
}

impl ProgressReporter for Recorder {
    fn begin_stage(&self, stage: PipelineStage, _total_items: Option<usize>) {
        self.stages.lock().unwrap().push(stage);
    }
}

#[test]
fn test_progress_stages() {
    let recorder = Arc::new(Recorder::default());
    let mut source = MemorySource::new(common::static_sequence(4, 32, 32));
    let mut sink = MemorySink::new();
    run_magnification_reported(&mut source, &mut sink, &config(3, 1.0), recorder.clone()).unwrap();

    let stages = recorder.stages.lock().unwrap().clone();
    assert_eq!(
        stages,
        vec![
            PipelineStage::Magnifying,
            PipelineStage::Draining,
            PipelineStage::Finalizing
        ]
    );
}

// ---------------------------------------------------------------------------
// File pipeline
// ---------------------------------------------------------------------------

#[test]
fn test_ser_to_ser_pipeline() {
    let frames: Vec<Vec<u8>> = common::oscillating_grating_sequence(6, 32, 32, 5.0, 30.0)
        .iter()
        .map(|f| f.data.iter().map(|v| v.round() as u8).collect())
        .collect();
    let mut ser = common::build_ser_with_frames(32, 32, &frames);
    common::append_timestamps(&mut ser, 6, 30.0);
    let input = common::write_test_ser(&ser);
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("magnified.ser");

    let mut magnification = config(3, 5.0);
    magnification.temporal.sampling_rate = None;
    let report = run_pipeline(&PipelineConfig {
        input: input.path().to_path_buf(),
        output: output.clone(),
        magnification,
    })
    .unwrap();
    assert_eq!(report.frames_written, 6);
    assert!((report.sampling_rate - 30.0).abs() < 1e-3);

    let reader = SerReader::open(&output).unwrap();
    assert_eq!(reader.frame_count(), 6);
    assert_eq!((reader.header.width, reader.header.height), (32, 32));
    assert!((reader.frame_rate().unwrap() - 30.0).abs() < 0.01);
}

#[test]
fn test_ser_to_png_directory_pipeline() {
    let frames: Vec<Vec<u8>> = (0..4).map(|_| vec![90u8; 16 * 16]).collect();
    let input = common::write_test_ser(&common::build_ser_with_frames(16, 16, &frames));
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("png_out");

    let mut magnification = config(2, 3.0);
    magnification.pyramid.scales = 1;
    let report = run_pipeline(&PipelineConfig {
        input: input.path().to_path_buf(),
        output: output.clone(),
        magnification,
    })
    .unwrap();
    assert_eq!(report.frames_written, 4);
    for i in 0..4 {
        assert!(output.join(format!("frame_{i:06}.png")).exists());
    }
}
