use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{PhasemagError, Result};
use crate::frame::ColorFrame;
use crate::io::ser::{SerHeader, SER_HEADER_SIZE, SER_MAGIC};

/// Byte offset of the FrameCount field inside the header.
const FRAME_COUNT_OFFSET: u64 = 38;

/// SER color id for interleaved RGB.
const COLOR_ID_RGB: i32 = 100;

impl SerHeader {
    /// Header for an 8-bit RGB stream; the frame count is filled in on finalize.
    pub fn rgb8(width: u32, height: u32) -> Self {
        Self {
            color_id: COLOR_ID_RGB,
            little_endian: true,
            width,
            height,
            pixel_depth: 8,
            frame_count: 0,
            observer: String::new(),
            instrument: "phasemag".into(),
            telescope: String::new(),
            date_time: 0,
            date_time_utc: 0,
        }
    }
}

/// Writes a valid SER file at the raw byte level.
pub struct SerWriter {
    writer: BufWriter<File>,
    header: SerHeader,
    frame_size: usize,
    frames_written: u32,
}

impl SerWriter {
    /// Create a new SER file and write the header.
    pub fn create(path: &Path, header: &SerHeader) -> Result<Self> {
        let frame_size = header
            .frame_byte_size()
            .ok_or_else(|| PhasemagError::InvalidSer("Frame size overflows".into()))?;
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        write_header(&mut writer, header)?;
        Ok(Self {
            writer,
            header: header.clone(),
            frame_size,
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u32 {
        self.frames_written
    }

    /// Write a single raw frame; its length must match the header's frame size.
    pub fn write_raw_frame(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != self.frame_size {
            return Err(PhasemagError::shape(
                format!("{} bytes per frame", self.frame_size),
                format!("{} bytes", data.len()),
            ));
        }
        self.writer.write_all(data)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Quantise a color frame to 8-bit interleaved RGB and write it.
    pub fn write_rgb_frame(&mut self, color: &ColorFrame) -> Result<()> {
        let (w, h) = (self.header.width as usize, self.header.height as usize);
        if color.width() != w || color.height() != h {
            return Err(PhasemagError::shape(
                format!("{w}x{h} frame"),
                format!("{}x{} frame", color.width(), color.height()),
            ));
        }
        let mut bytes = Vec::with_capacity(self.frame_size);
        for ((r, g), b) in color
            .red
            .data
            .iter()
            .zip(color.green.data.iter())
            .zip(color.blue.data.iter())
        {
            bytes.extend_from_slice(&[to_u8(*r), to_u8(*g), to_u8(*b)]);
        }
        self.write_raw_frame(&bytes)
    }

    /// Write the optional timestamp trailer (one u64 per frame, little-endian).
    pub fn write_timestamps(&mut self, timestamps: &[u64]) -> Result<()> {
        for &ts in timestamps {
            self.writer.write_all(&ts.to_le_bytes())?;
        }
        Ok(())
    }

    /// Patch the frame count into the header, flush and close the file.
    pub fn finalize(mut self) -> Result<()> {
        self.writer.seek(SeekFrom::Start(FRAME_COUNT_OFFSET))?;
        self.writer
            .write_all(&(self.frames_written as i32).to_le_bytes())?;
        self.writer.seek(SeekFrom::End(0))?;
        self.writer.flush()?;
        Ok(())
    }
}

#[inline]
fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn write_header(w: &mut impl Write, header: &SerHeader) -> Result<()> {
    // Magic (14 bytes)
    w.write_all(SER_MAGIC)?;
    // LuID (4 bytes)
    w.write_all(&0i32.to_le_bytes())?;
    // ColorID (4 bytes)
    w.write_all(&header.color_id.to_le_bytes())?;
    // LittleEndian flag: 0 = little-endian
    let le_flag: i32 = if header.little_endian { 0 } else { 1 };
    w.write_all(&le_flag.to_le_bytes())?;
    w.write_all(&(header.width as i32).to_le_bytes())?;
    w.write_all(&(header.height as i32).to_le_bytes())?;
    w.write_all(&(header.pixel_depth as i32).to_le_bytes())?;
    // FrameCount (4 bytes at offset 38)
    w.write_all(&(header.frame_count as i32).to_le_bytes())?;
    write_fixed_string(w, &header.observer, 40)?;
    write_fixed_string(w, &header.instrument, 40)?;
    write_fixed_string(w, &header.telescope, 40)?;
    w.write_all(&header.date_time.to_le_bytes())?;
    w.write_all(&header.date_time_utc.to_le_bytes())?;

    debug_assert_eq!(
        14 + 4 + 4 + 4 + 4 + 4 + 4 + 4 + 40 + 40 + 40 + 8 + 8,
        SER_HEADER_SIZE
    );
    Ok(())
}

fn write_fixed_string(w: &mut impl Write, s: &str, len: usize) -> Result<()> {
    let bytes = s.as_bytes();
    let to_write = bytes.len().min(len);
    w.write_all(&bytes[..to_write])?;
    w.write_all(&vec![0u8; len - to_write])?;
    Ok(())
}
