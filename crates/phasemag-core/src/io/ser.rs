use std::fs::File;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;
use ndarray::Array2;

use crate::consts::{DISPLAY_MAX, LUMINANCE_B, LUMINANCE_G, LUMINANCE_R, SER_TICKS_PER_SECOND};
use crate::error::{PhasemagError, Result};
use crate::frame::{ColorMode, Frame, FrameMetadata, SourceInfo};

pub const SER_HEADER_SIZE: usize = 178;
pub const SER_MAGIC: &[u8; 14] = b"LUCAM-RECORDER";

/// SER file header (178 bytes).
#[derive(Clone, Debug)]
pub struct SerHeader {
    pub color_id: i32,
    pub little_endian: bool,
    pub width: u32,
    pub height: u32,
    pub pixel_depth: u32,
    pub frame_count: u32,
    pub observer: String,
    pub instrument: String,
    pub telescope: String,
    pub date_time: u64,
    pub date_time_utc: u64,
}

impl SerHeader {
    /// Bytes per pixel plane (1 for 8-bit, 2 for 9-16 bit).
    pub fn bytes_per_pixel_plane(&self) -> usize {
        if self.pixel_depth <= 8 { 1 } else { 2 }
    }

    /// Number of planes per pixel (1 for mono/bayer, 3 for RGB/BGR).
    pub fn planes_per_pixel(&self) -> usize {
        match self.color_id {
            100 | 101 => 3,
            _ => 1,
        }
    }

    /// Total bytes per frame. `None` on overflow.
    pub fn frame_byte_size(&self) -> Option<usize> {
        let bytes_per_pixel = self.bytes_per_pixel_plane() * self.planes_per_pixel();
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(bytes_per_pixel)
    }

    pub fn color_mode(&self) -> ColorMode {
        match self.color_id {
            0 => ColorMode::Mono,
            8 => ColorMode::BayerRGGB,
            9 => ColorMode::BayerGRBG,
            10 => ColorMode::BayerGBRG,
            11 => ColorMode::BayerBGGR,
            100 => ColorMode::RGB,
            101 => ColorMode::BGR,
            _ => ColorMode::Mono,
        }
    }
}

/// Memory-mapped SER file reader.
pub struct SerReader {
    mmap: Mmap,
    frame_size: usize,
    pub header: SerHeader,
}

impl SerReader {
    /// Open a SER file and parse its header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only and the file is not modified while mapped.
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < SER_HEADER_SIZE {
            return Err(PhasemagError::InvalidSer(
                "File too small for SER header".into(),
            ));
        }

        if &mmap[0..14] != SER_MAGIC {
            return Err(PhasemagError::InvalidSer(
                "Missing LUCAM-RECORDER magic".into(),
            ));
        }

        let header = parse_header(&mmap[..SER_HEADER_SIZE])?;
        let frame_size = header
            .frame_byte_size()
            .ok_or_else(|| PhasemagError::InvalidSer("Frame size overflows".into()))?;

        let expected_data_size = frame_size
            .checked_mul(header.frame_count as usize)
            .and_then(|n| n.checked_add(SER_HEADER_SIZE))
            .ok_or_else(|| PhasemagError::InvalidSer("Data size overflows".into()))?;
        if mmap.len() < expected_data_size {
            return Err(PhasemagError::InvalidSer(format!(
                "File truncated: expected at least {} bytes, got {}",
                expected_data_size,
                mmap.len()
            )));
        }

        Ok(Self {
            mmap,
            frame_size,
            header,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.header.frame_count as usize
    }

    /// Get the raw bytes for a single frame (zero-copy from mmap).
    pub fn frame_raw(&self, index: usize) -> Result<&[u8]> {
        let count = self.frame_count();
        if index >= count {
            return Err(PhasemagError::FrameIndexOutOfRange {
                index,
                total: count,
            });
        }
        let offset = SER_HEADER_SIZE + index * self.frame_size;
        Ok(&self.mmap[offset..offset + self.frame_size])
    }

    /// Read a single frame as luminance in [0, 255].
    ///
    /// Bayer data is read as mono; RGB/BGR is reduced with BT.601 weights.
    pub fn read_frame(&self, index: usize) -> Result<Frame> {
        let raw = self.frame_raw(index)?;
        let h = self.header.height as usize;
        let w = self.header.width as usize;
        let decoder = SampleDecoder::new(&self.header);

        let data = match self.header.color_mode() {
            ColorMode::RGB => decode_luminance(raw, h, w, &decoder, [0, 1, 2]),
            ColorMode::BGR => decode_luminance(raw, h, w, &decoder, [2, 1, 0]),
            _ => decode_mono_plane(raw, h, w, &decoder),
        };

        let mut frame = Frame::new(data, decoder.bytes as u8 * 8);
        frame.metadata = FrameMetadata {
            frame_index: index,
            timestamp_us: self.read_timestamp(index).map(|ticks| ticks / 10),
        };
        Ok(frame)
    }

    /// Raw per-frame timestamp (100 ns ticks) from the optional trailer.
    fn read_timestamp(&self, index: usize) -> Option<u64> {
        let trailer_offset = SER_HEADER_SIZE + self.frame_size * self.frame_count();
        let ts_offset = trailer_offset + index * 8;
        let bytes = self.mmap.get(ts_offset..ts_offset + 8)?;
        Some(u64::from_le_bytes(bytes.try_into().ok()?))
    }

    /// Frames per second from the first and last trailer timestamps.
    pub fn frame_rate(&self) -> Option<f64> {
        let count = self.frame_count();
        if count < 2 {
            return None;
        }
        let first = self.read_timestamp(0)?;
        let last = self.read_timestamp(count - 1)?;
        if last <= first {
            return None;
        }
        let seconds = (last - first) as f64 / SER_TICKS_PER_SECOND;
        Some((count - 1) as f64 / seconds)
    }

    /// Build SourceInfo from the header.
    pub fn source_info(&self, path: &Path) -> SourceInfo {
        SourceInfo {
            filename: path.to_path_buf(),
            total_frames: self.frame_count(),
            width: self.header.width,
            height: self.header.height,
            bit_depth: self.header.pixel_depth as u8,
            color_mode: self.header.color_mode(),
            frame_rate: self.frame_rate(),
            observer: non_empty(&self.header.observer),
            telescope: non_empty(&self.header.telescope),
            instrument: non_empty(&self.header.instrument),
        }
    }

    /// Iterator over all frames.
    pub fn frames(&self) -> impl Iterator<Item = Result<Frame>> + '_ {
        (0..self.frame_count()).map(move |i| self.read_frame(i))
    }
}

fn parse_header(buf: &[u8]) -> Result<SerHeader> {
    let mut cursor = std::io::Cursor::new(&buf[14..]); // skip magic

    let _lu_id = cursor.read_i32::<LittleEndian>()?;
    let color_id = cursor.read_i32::<LittleEndian>()?;
    let le_flag = cursor.read_i32::<LittleEndian>()?;
    let width = cursor.read_i32::<LittleEndian>()? as u32;
    let height = cursor.read_i32::<LittleEndian>()? as u32;
    let pixel_depth = cursor.read_i32::<LittleEndian>()? as u32;
    let frame_count = cursor.read_i32::<LittleEndian>()? as u32;

    let observer = read_fixed_string(&buf[42..82]);
    let instrument = read_fixed_string(&buf[82..122]);
    let telescope = read_fixed_string(&buf[122..162]);

    let mut cursor = std::io::Cursor::new(&buf[162..]);
    let date_time = cursor.read_u64::<LittleEndian>()?;
    let date_time_utc = cursor.read_u64::<LittleEndian>()?;

    if width == 0 || height == 0 {
        return Err(PhasemagError::InvalidDimensions { width, height });
    }
    if !(1..=16).contains(&pixel_depth) {
        return Err(PhasemagError::InvalidSer(format!(
            "Unsupported pixel depth {pixel_depth}"
        )));
    }

    // Treat 0 as little-endian, as most capture software writes it.
    let little_endian = le_flag != 1;

    Ok(SerHeader {
        color_id,
        little_endian,
        width,
        height,
        pixel_depth,
        frame_count,
        observer,
        instrument,
        telescope,
        date_time,
        date_time_utc,
    })
}

fn read_fixed_string(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// Reads one sample and scales it to display units.
struct SampleDecoder {
    bytes: usize,
    little_endian: bool,
    scale: f32,
}

impl SampleDecoder {
    fn new(header: &SerHeader) -> Self {
        let max_val = ((1u32 << header.pixel_depth) - 1) as f32;
        Self {
            bytes: header.bytes_per_pixel_plane(),
            little_endian: header.little_endian,
            scale: DISPLAY_MAX as f32 / max_val,
        }
    }

    #[inline]
    fn sample(&self, raw: &[u8], idx: usize) -> f32 {
        let val = if self.bytes == 1 {
            raw[idx] as f32
        } else {
            let pair = [raw[idx], raw[idx + 1]];
            if self.little_endian {
                u16::from_le_bytes(pair) as f32
            } else {
                u16::from_be_bytes(pair) as f32
            }
        };
        (val * self.scale).min(DISPLAY_MAX as f32)
    }
}

fn decode_mono_plane(raw: &[u8], height: usize, width: usize, dec: &SampleDecoder) -> Array2<f32> {
    Array2::from_shape_fn((height, width), |(row, col)| {
        dec.sample(raw, (row * width + col) * dec.bytes)
    })
}

/// `order` maps the stored planes to (red, green, blue).
fn decode_luminance(
    raw: &[u8],
    height: usize,
    width: usize,
    dec: &SampleDecoder,
    order: [usize; 3],
) -> Array2<f32> {
    let stride = 3 * dec.bytes;
    Array2::from_shape_fn((height, width), |(row, col)| {
        let base = (row * width + col) * stride;
        let r = dec.sample(raw, base + order[0] * dec.bytes);
        let g = dec.sample(raw, base + order[1] * dec.bytes);
        let b = dec.sample(raw, base + order[2] * dec.bytes);
        LUMINANCE_R * r + LUMINANCE_G * g + LUMINANCE_B * b
    })
}
