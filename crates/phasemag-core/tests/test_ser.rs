mod common;

use ndarray::Array2;

use phasemag_core::error::PhasemagError;
use phasemag_core::frame::{ColorFrame, ColorMode, Frame};
use phasemag_core::io::ser::{SerHeader, SerReader};
use phasemag_core::io::ser_writer::SerWriter;
use phasemag_core::io::{FrameSink, FrameSource, SerFrameSink, SerFrameSource};

#[test]
fn test_parse_8bit_mono() {
    let frame_data: Vec<u8> = (0u8..12).map(|v| v * 20).collect();
    let ser = common::build_ser_with_frames(4, 3, &[frame_data]);
    let tmp = common::write_test_ser(&ser);

    let reader = SerReader::open(tmp.path()).unwrap();
    assert_eq!(reader.frame_count(), 1);
    assert_eq!(reader.header.width, 4);
    assert_eq!(reader.header.height, 3);
    assert_eq!(reader.header.color_mode(), ColorMode::Mono);
    assert_eq!(reader.header.observer, "Test");
    assert_eq!(reader.header.telescope, "MyScope");

    let frame = reader.read_frame(0).unwrap();
    assert_eq!(frame.width(), 4);
    assert_eq!(frame.height(), 3);
    // 8-bit samples map directly to display units.
    assert_eq!(frame.data[[0, 0]], 0.0);
    assert_eq!(frame.data[[0, 1]], 20.0);
    assert_eq!(frame.data[[2, 3]], 220.0);
}

#[test]
fn test_16bit_scaled_to_display_range() {
    let mut ser = common::build_ser_header_full(2, 1, 16, 1, 0);
    ser.extend_from_slice(&65535u16.to_le_bytes());
    ser.extend_from_slice(&0u16.to_le_bytes());
    let tmp = common::write_test_ser(&ser);

    let frame = SerReader::open(tmp.path()).unwrap().read_frame(0).unwrap();
    assert!((frame.data[[0, 0]] - 255.0).abs() < 1e-3);
    assert_eq!(frame.data[[0, 1]], 0.0);
    assert_eq!(frame.original_bit_depth, 16);
}

#[test]
fn test_rgb_and_bgr_luminance() {
    for (color_id, pixel) in [(100, [200u8, 100, 50]), (101, [50u8, 100, 200])] {
        let mut ser = common::build_ser_header_full(1, 1, 8, 1, color_id);
        ser.extend_from_slice(&pixel);
        let tmp = common::write_test_ser(&ser);
        let frame = SerReader::open(tmp.path()).unwrap().read_frame(0).unwrap();
        let expected = 0.299 * 200.0 + 0.587 * 100.0 + 0.114 * 50.0;
        assert!((frame.data[[0, 0]] - expected).abs() < 1e-3);
    }
}

#[test]
fn test_frame_rate_from_timestamps() {
    let frames: Vec<Vec<u8>> = (0..5).map(|_| vec![0u8; 4]).collect();
    let mut ser = common::build_ser_with_frames(2, 2, &frames);
    common::append_timestamps(&mut ser, 5, 50.0);
    let tmp = common::write_test_ser(&ser);

    let reader = SerReader::open(tmp.path()).unwrap();
    let rate = reader.frame_rate().unwrap();
    assert!((rate - 50.0).abs() < 1e-6);
    let frame = reader.read_frame(1).unwrap();
    assert!(frame.metadata.timestamp_us.is_some());
    assert_eq!(reader.source_info(tmp.path()).frame_rate, Some(rate));
}

#[test]
fn test_source_info_header_text() {
    let ser = common::build_ser_with_frames(2, 2, &[vec![0u8; 4], vec![1u8; 4]]);
    let tmp = common::write_test_ser(&ser);

    let info = SerFrameSource::open(tmp.path()).unwrap().info();
    assert_eq!(info.total_frames, 2);
    assert_eq!(info.observer.as_deref(), Some("Test"));
    assert_eq!(info.telescope.as_deref(), Some("MyScope"));
    // Blank header fields are reported as absent.
    assert_eq!(info.instrument, None);
    assert_eq!(info.frame_rate, None);
}

#[test]
fn test_no_timestamps_no_rate() {
    let ser = common::build_ser_with_frames(2, 2, &[vec![0u8; 4], vec![1u8; 4]]);
    let tmp = common::write_test_ser(&ser);
    let reader = SerReader::open(tmp.path()).unwrap();
    assert!(reader.frame_rate().is_none());
}

#[test]
fn test_truncated_file_rejected() {
    let mut ser = common::build_ser_header(4, 4, 2);
    ser.extend_from_slice(&[0u8; 20]);
    let tmp = common::write_test_ser(&ser);
    assert!(matches!(
        SerReader::open(tmp.path()),
        Err(PhasemagError::InvalidSer(_))
    ));
}

#[test]
fn test_bad_magic_rejected() {
    let mut ser = common::build_ser_header(1, 1, 1);
    ser[0] = b'X';
    ser.push(0);
    let tmp = common::write_test_ser(&ser);
    assert!(SerReader::open(tmp.path()).is_err());
}

#[test]
fn test_unsupported_depth_rejected() {
    let mut ser = common::build_ser_header_full(1, 1, 24, 1, 0);
    ser.extend_from_slice(&[0u8; 8]);
    let tmp = common::write_test_ser(&ser);
    assert!(matches!(
        SerReader::open(tmp.path()),
        Err(PhasemagError::InvalidSer(_))
    ));
}

#[test]
fn test_frame_index_out_of_range() {
    let ser = common::build_ser_with_frames(2, 2, &[vec![0u8; 4]]);
    let tmp = common::write_test_ser(&ser);
    let reader = SerReader::open(tmp.path()).unwrap();
    assert!(matches!(
        reader.read_frame(1),
        Err(PhasemagError::FrameIndexOutOfRange { index: 1, total: 1 })
    ));
}

#[test]
fn test_source_streams_frames_in_order() {
    let frames: Vec<Vec<u8>> = (0..3u8).map(|i| vec![i * 10; 6]).collect();
    let ser = common::build_ser_with_frames(3, 2, &frames);
    let tmp = common::write_test_ser(&ser);

    let mut source = SerFrameSource::open(tmp.path()).unwrap();
    assert_eq!(source.frame_count(), Some(3));
    assert_eq!(source.dimensions(), Some((3, 2)));
    for i in 0..3 {
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(frame.metadata.frame_index, i);
        assert_eq!(frame.data[[1, 2]], (i * 10) as f32);
    }
    assert!(source.next_frame().unwrap().is_none());
}

#[test]
fn test_writer_patches_frame_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.ser");

    let mut writer = SerWriter::create(&path, &SerHeader::rgb8(2, 2)).unwrap();
    let luma = Frame::new(Array2::from_elem((2, 2), 77.0), 8);
    let color = ColorFrame::from_luminance(luma);
    writer.write_rgb_frame(&color).unwrap();
    writer.write_rgb_frame(&color).unwrap();
    writer.finalize().unwrap();

    let reader = SerReader::open(&path).unwrap();
    assert_eq!(reader.frame_count(), 2);
    assert_eq!(reader.header.color_mode(), ColorMode::RGB);
    assert_eq!(reader.frame_raw(1).unwrap(), &[77u8; 12][..]);
    // Equal channels reduce to the same luminance.
    assert!((reader.read_frame(0).unwrap().data[[1, 1]] - 77.0).abs() < 1e-3);
}

#[test]
fn test_writer_rejects_wrong_frame_size() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = SerWriter::create(&dir.path().join("x.ser"), &SerHeader::rgb8(2, 2)).unwrap();
    let color = ColorFrame::from_luminance(Frame::new(Array2::zeros((3, 2)), 8));
    assert!(matches!(
        writer.write_rgb_frame(&color),
        Err(PhasemagError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_ser_sink_writes_timestamp_trailer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ts.ser");
    let mut sink = SerFrameSink::create(&path, 2, 1).unwrap();
    for i in 0..3u64 {
        let mut luma = Frame::new(Array2::from_elem((1, 2), 10.0), 8);
        luma.metadata.timestamp_us = Some(1_000_000 + i * 40_000);
        sink.write_frame(&ColorFrame::from_luminance(luma)).unwrap();
    }
    sink.finish().unwrap();
    assert_eq!(sink.frames_written(), 3);

    let reader = SerReader::open(&path).unwrap();
    assert_eq!(reader.frame_count(), 3);
    assert!((reader.frame_rate().unwrap() - 25.0).abs() < 1e-6);
}
