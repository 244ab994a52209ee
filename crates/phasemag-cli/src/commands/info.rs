use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use phasemag_core::io::ser::SerReader;
use phasemag_core::io::ImageSequenceSource;

#[derive(Args)]
pub struct InfoArgs {
    /// Input SER file or image sequence directory
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    if args.file.is_dir() {
        return print_sequence_info(args);
    }

    let reader = SerReader::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let info = reader.source_info(&args.file);

    println!("File:        {}", info.filename.display());
    println!("Frames:      {}", info.total_frames);
    println!("Dimensions:  {}x{}", info.width, info.height);
    println!("Bit depth:   {}", info.bit_depth);
    println!("Color mode:  {:?}", info.color_mode);
    match info.frame_rate {
        Some(fps) => println!("Frame rate:  {:.3} fps", fps),
        None => println!("Frame rate:  unknown (no timestamps)"),
    }

    if let Some(ref obs) = info.observer {
        println!("Observer:    {}", obs);
    }
    if let Some(ref tel) = info.telescope {
        println!("Telescope:   {}", tel);
    }
    if let Some(ref inst) = info.instrument {
        println!("Instrument:  {}", inst);
    }

    if let Some(frame_bytes) = reader.header.frame_byte_size() {
        let total_mb = (frame_bytes * info.total_frames) as f64 / (1024.0 * 1024.0);
        println!("Data size:   {:.1} MB", total_mb);
    }

    Ok(())
}

fn print_sequence_info(args: &InfoArgs) -> Result<()> {
    let source = ImageSequenceSource::open(&args.file)
        .with_context(|| format!("Failed to list images in {}", args.file.display()))?;
    let paths = source.paths();

    println!("Directory:   {}", args.file.display());
    println!("Frames:      {}", paths.len());
    if let (Some(first), Some(last)) = (paths.first(), paths.last()) {
        println!("First:       {}", first.display());
        println!("Last:        {}", last.display());
    }
    println!("Frame rate:  unknown (image sequence)");

    Ok(())
}
