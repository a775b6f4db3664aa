use std::path::PathBuf;
use storage::SinkError;
use thiserror::Error;

/// Errors that end a run. Per-item problems never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot scan {dir}: {message}")]
    Scan { dir: PathBuf, message: String },
    #[error("sink failed: {0}")]
    Sink(#[from] SinkError),
    #[error("invalid configuration: {0}")]
    Config(String),
}
