use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use storage::SinkReceipt;

pub use storage::models::{CoordinateError, GeoCoordinate, ResultRecord};

/// An eligible input discovered by the directory scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFile {
    pub name: String,
    pub path: PathBuf,
}

/// Stage an item was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStage {
    Loading,
    Classifying,
    Formatting,
}

impl fmt::Display for ItemStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemStage::Loading => "loading",
            ItemStage::Classifying => "classifying",
            ItemStage::Formatting => "formatting",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub file: String,
    pub stage: ItemStage,
    pub message: String,
}

/// Result of one folder run.
#[derive(Debug, Clone, Default)]
pub struct BatchRun {
    /// Eligible files found by the scan.
    pub scanned: usize,
    /// Assembled records, in scan order.
    pub records: Vec<ResultRecord>,
    pub failures: Vec<ItemFailure>,
    /// `None` when nothing was delivered.
    pub receipt: Option<SinkReceipt>,
}

impl BatchRun {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
