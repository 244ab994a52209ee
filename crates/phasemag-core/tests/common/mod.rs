#![allow(dead_code)]

use std::f32::consts::PI;

use ndarray::Array2;

use phasemag_core::frame::Frame;
use phasemag_core::io::ser::SER_HEADER_SIZE;

/// Build a SER file header for mono 8-bit frames.
///
/// Returns a `Vec<u8>` containing just the 178-byte header.
/// Append frame pixel data after calling this function.
pub fn build_ser_header(width: u32, height: u32, num_frames: usize) -> Vec<u8> {
    build_ser_header_full(width, height, 8, num_frames, 0)
}

/// Build a SER file header with configurable bit depth and color mode.
///
/// `color_id`: 0=MONO, 8=BAYER_RGGB, 9=BAYER_GRBG, 10=BAYER_GBRG, 11=BAYER_BGGR,
///             100=RGB, 101=BGR
pub fn build_ser_header_full(
    width: u32,
    height: u32,
    bit_depth: u32,
    num_frames: usize,
    color_id: i32,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SER_HEADER_SIZE);

    buf.extend_from_slice(b"LUCAM-RECORDER");
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&color_id.to_le_bytes());
    // LittleEndian = 0 (little-endian)
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&(width as i32).to_le_bytes());
    buf.extend_from_slice(&(height as i32).to_le_bytes());
    buf.extend_from_slice(&(bit_depth as i32).to_le_bytes());
    buf.extend_from_slice(&(num_frames as i32).to_le_bytes());
    // Observer, instrument, telescope (40 bytes each)
    let mut observer = [0u8; 40];
    observer[..4].copy_from_slice(b"Test");
    buf.extend_from_slice(&observer);
    buf.extend_from_slice(&[0u8; 40]);
    let mut telescope = [0u8; 40];
    telescope[..7].copy_from_slice(b"MyScope");
    buf.extend_from_slice(&telescope);
    // DateTime, DateTimeUTC
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes());

    assert_eq!(buf.len(), SER_HEADER_SIZE);
    buf
}

/// Build a complete synthetic mono 8-bit SER file with the given frame data.
pub fn build_ser_with_frames(width: u32, height: u32, frames: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = build_ser_header(width, height, frames.len());
    for frame in frames {
        buf.extend_from_slice(frame);
    }
    buf
}

/// Append a timestamp trailer spaced `1 / fps` seconds apart (100 ns ticks).
pub fn append_timestamps(buf: &mut Vec<u8>, num_frames: usize, fps: f64) {
    let step = (10_000_000.0 / fps).round() as u64;
    let start = 638_000_000_000_000_000u64;
    for i in 0..num_frames as u64 {
        buf.extend_from_slice(&(start + i * step).to_le_bytes());
    }
}

/// Write a SER buffer to a temporary file and return the temp file handle.
///
/// The file stays alive as long as the returned `NamedTempFile` is not dropped.
pub fn write_test_ser(data: &[u8]) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut f = tempfile::NamedTempFile::new().expect("create temp file");
    f.write_all(data).expect("write SER data");
    f.flush().expect("flush");
    f
}

/// Deterministic pseudo-random frame in [0, 255] (LCG, no external RNG).
pub fn noise_frame(height: usize, width: usize, seed: u64) -> Frame {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let data = Array2::from_shape_fn((height, width), |_| {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 33) % 256) as f32
    });
    Frame::new(data, 8)
}

/// Smooth textured frame; the same for every call.
pub fn textured_frame(height: usize, width: usize) -> Frame {
    let data = Array2::from_shape_fn((height, width), |(r, c)| {
        let (y, x) = (r as f32, c as f32);
        128.0 + 50.0 * (2.0 * PI * x / 9.0).sin() * (2.0 * PI * y / 13.0).cos()
            + 20.0 * (2.0 * PI * (x + y) / 6.0).sin()
    });
    Frame::new(data, 8)
}

/// `n` copies of one textured frame.
pub fn static_sequence(n: usize, height: usize, width: usize) -> Vec<Frame> {
    let frame = textured_frame(height, width);
    (0..n)
        .map(|i| frame.clone().with_index(i))
        .collect()
}

/// Centre of the moving patch in [`oscillating_grating_sequence`].
pub const PATCH_CENTRE: (f32, f32) = (20.0, 20.0);

/// A Gaussian-windowed vertical grating whose phase oscillates at `freq` Hz.
///
/// Frame `t` of a `fps` video: `128 + 60 env sin(2 pi x / 8 + 0.3 sin(2 pi freq t / fps))`,
/// with the envelope centred on [`PATCH_CENTRE`]. Far from the patch the frame is flat.
pub fn oscillating_grating_sequence(
    n: usize,
    height: usize,
    width: usize,
    freq: f32,
    fps: f32,
) -> Vec<Frame> {
    (0..n)
        .map(|t| {
            let shift = 0.3 * (2.0 * PI * freq * t as f32 / fps).sin();
            let data = Array2::from_shape_fn((height, width), |(r, c)| {
                let dy = r as f32 - PATCH_CENTRE.0;
                let dx = c as f32 - PATCH_CENTRE.1;
                let env = (-(dx * dx + dy * dy) / (2.0 * 6.0 * 6.0)).exp();
                128.0 + 60.0 * env * (2.0 * PI * c as f32 / 8.0 + shift).sin()
            });
            Frame::new(data, 8).with_index(t)
        })
        .collect()
}

/// Square region of [`ripple_sequence`]: rows and columns `16..32`.
pub const RIPPLE_REGION: std::ops::Range<usize> = 16..32;

/// Flat grey frames whose [`RIPPLE_REGION`] square brightens and darkens
/// by `amplitude sin(2 pi freq t / fps)`.
pub fn ripple_sequence(
    n: usize,
    height: usize,
    width: usize,
    amplitude: f32,
    freq: f32,
    fps: f32,
) -> Vec<Frame> {
    (0..n)
        .map(|t| {
            let ripple = amplitude * (2.0 * PI * freq * t as f32 / fps).sin();
            let data = Array2::from_shape_fn((height, width), |(r, c)| {
                if RIPPLE_REGION.contains(&r) && RIPPLE_REGION.contains(&c) {
                    128.0 + ripple
                } else {
                    128.0
                }
            });
            Frame::new(data, 8).with_index(t)
        })
        .collect()
}

/// Convert a frame to f64 for pyramid tests.
pub fn to_f64(frame: &Frame) -> Array2<f64> {
    frame.data.mapv(|v| v as f64)
}
