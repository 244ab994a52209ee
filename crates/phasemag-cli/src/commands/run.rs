use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use phasemag_core::pipeline::{
    run_pipeline_reported, MagnificationConfig, PipelineConfig, PipelineStage, ProgressReporter,
    TemporalConfig,
};
use phasemag_core::pyramid::PyramidConfig;
use phasemag_core::temporal::FilterStrategy;
use tracing::debug;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FilterArg {
    Ideal,
    Butterworth,
}

#[derive(Args)]
pub struct RunArgs {
    /// Input SER file or image sequence directory
    pub input: PathBuf,

    /// Output SER file, or directory for a PNG sequence
    #[arg(short, long, default_value = "magnified.ser")]
    pub output: PathBuf,

    /// Pipeline config file (TOML); input/output arguments override its paths
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Frames held in the temporal window
    #[arg(long, default_value = "30")]
    pub window: usize,

    /// Phase magnification factor
    #[arg(long, default_value = "30")]
    pub factor: f64,

    /// Sampling rate in Hz used to design the band pass
    #[arg(long, default_value = "600", conflicts_with = "source_rate")]
    pub fps: f64,

    /// Use the frame rate recorded in the input instead of --fps
    #[arg(long)]
    pub source_rate: bool,

    /// Lower pass band edge in Hz
    #[arg(long, default_value = "72")]
    pub low: f64,

    /// Upper pass band edge in Hz
    #[arg(long, default_value = "92")]
    pub high: f64,

    /// Temporal filter
    #[arg(long, value_enum, default_value = "ideal")]
    pub filter: FilterArg,

    /// Butterworth order
    #[arg(long, default_value = "3")]
    pub order: usize,

    /// Butterworth frames written unmagnified while the filter settles
    #[arg(long, default_value = "0")]
    pub settling: usize,

    /// Ideal filter zero padding multiple
    #[arg(long, default_value = "4")]
    pub zero_pad: usize,

    /// Pyramid band-pass scales
    #[arg(long, default_value = "2")]
    pub scales: usize,

    /// Pyramid orientations per scale
    #[arg(long, default_value = "4")]
    pub orientations: usize,

    /// Maximum frames to read
    #[arg(long, default_value = "60000")]
    pub max_frames: usize,
}

/// Drives an indicatif bar from pipeline stage events.
struct BarReporter {
    pb: ProgressBar,
}

impl BarReporter {
    fn new() -> Result<Self> {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg:20} [{bar:40}] {pos}/{len}")?
                .progress_chars("=> "),
        );
        Ok(Self { pb })
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        self.pb.set_message(stage.to_string());
        self.pb.set_length(total_items.unwrap_or(0) as u64);
        self.pb.set_position(0);
    }

    fn advance(&self, items_done: usize) {
        self.pb.set_position(items_done as u64);
    }

    fn finish_stage(&self) {
        self.pb.tick();
    }
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        let mut config: PipelineConfig =
            toml::from_str(&contents).context("Invalid pipeline config")?;
        config.input = args.input.clone();
        config.output = args.output.clone();
        if args.source_rate {
            config.magnification.temporal.sampling_rate = None;
        }
        config
    } else {
        build_config_from_args(args)
    };
    debug!(?config, "Resolved pipeline config");

    crate::summary::print_pipeline_summary(&config);

    let reporter = Arc::new(BarReporter::new()?);
    let report = run_pipeline_reported(&config, reporter.clone())
        .with_context(|| format!("Magnification of {} failed", config.input.display()));
    reporter.pb.finish_with_message("Done");
    let report = report?;

    crate::summary::print_report(&report, &config);

    Ok(())
}

fn build_config_from_args(args: &RunArgs) -> PipelineConfig {
    let strategy = match args.filter {
        FilterArg::Ideal => FilterStrategy::Ideal {
            zero_pad_factor: args.zero_pad,
        },
        FilterArg::Butterworth => FilterStrategy::Butterworth {
            order: args.order,
            settling_frames: args.settling,
        },
    };

    PipelineConfig {
        input: args.input.clone(),
        output: args.output.clone(),
        magnification: MagnificationConfig {
            pyramid: PyramidConfig {
                scales: args.scales,
                orientations: args.orientations,
            },
            temporal: TemporalConfig {
                window_size: args.window,
                sampling_rate: (!args.source_rate).then_some(args.fps),
                low_freq: args.low,
                high_freq: args.high,
                strategy,
            },
            factor: args.factor,
            max_frames: args.max_frames,
        },
    }
}
