pub mod config;
mod orchestrator;
mod types;

pub use config::{MagnificationConfig, PipelineConfig, TemporalConfig};
pub use orchestrator::{
    run_magnification, run_magnification_reported, run_pipeline, run_pipeline_reported,
};
pub use types::{MagnifyReport, NoOpReporter, PipelineStage, PipelineState, ProgressReporter};
