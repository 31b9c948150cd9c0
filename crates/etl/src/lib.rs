pub mod config;
pub mod pipeline;

pub use config::{ConfigError, PipelineConfig};
pub use pipeline::{run, transform, PipelineError, RunReport, Transformed};
