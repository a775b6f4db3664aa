//! Storage layer: result records and the sinks a finished batch is delivered to.
//!
//! Two sinks exist: a CSV dataset rewritten in full on every run, and a remote
//! collection endpoint that receives the whole batch as one JSON document.

use std::path::PathBuf;
use thiserror::Error;

pub mod dataset;
pub mod models;
pub mod remote;

pub use dataset::CsvDatasetSink;
pub use models::{GeoCoordinate, ResultRecord};
pub use remote::RemoteSink;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("dataset {path} has columns {found:?}, expected {expected:?}")]
    SchemaMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("dataset {0} is locked by another writer")]
    Locked(PathBuf),
    #[error("malformed row {row} in {path}: {message}")]
    MalformedRow {
        path: PathBuf,
        row: usize,
        message: String,
    },
    #[error("delivery request failed: {0}")]
    Request(String),
    #[error("endpoint rejected batch with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl SinkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SinkError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkReceipt {
    /// Acknowledgement text returned by a remote endpoint.
    Acknowledged(String),
    Written {
        path: PathBuf,
        appended: usize,
        total_rows: usize,
    },
}

#[async_trait::async_trait]
pub trait ResultSink: Send + Sync {
    async fn deliver(&self, records: &[ResultRecord]) -> Result<SinkReceipt, SinkError>;

    fn describe(&self) -> String;
}
