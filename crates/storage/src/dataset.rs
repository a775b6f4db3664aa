//! CSV dataset sink: read the existing table, append the new batch after it,
//! rewrite the file in full.
//!
//! Cell encoding: timestamps are RFC 3339, an empty latitude/longitude cell is
//! null, labels and scores are JSON arrays, and the embedding is a JSON array or
//! an empty cell. Existing rows are carried over byte-for-byte and never
//! re-encoded.

use crate::models::ResultRecord;
use crate::{ResultSink, SinkError, SinkReceipt};
use chrono::{DateTime, SecondsFormat, Utc};
use csv::StringRecord;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const COLUMNS: [&str; 8] = [
    "file",
    "timestamp",
    "latitude",
    "longitude",
    "labels",
    "scores",
    "report",
    "embedding",
];

/// Exclusive claim on a dataset for one read-merge-write cycle.
///
/// Backed by a `<dataset>.lock` file created with `create_new`; removed on drop.
/// A crashed writer leaves the lock behind and it must be deleted by hand.
#[derive(Debug)]
pub struct DatasetLock {
    path: PathBuf,
}

impl DatasetLock {
    pub fn acquire(dataset: &Path) -> Result<Self, SinkError> {
        let path = sibling(dataset, ".lock");
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                debug!(lock = %path.display(), "dataset lock acquired");
                Ok(Self { path })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(SinkError::Locked(dataset.to_path_buf()))
            }
            Err(e) => Err(SinkError::io(path, e)),
        }
    }
}

impl Drop for DatasetLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), error = %e, "failed to release dataset lock");
        }
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("dataset"));
    name.push(suffix);
    path.with_file_name(name)
}

fn ensure_parent(path: &Path) -> Result<(), SinkError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| SinkError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Rows of an existing dataset, verbatim. A missing or empty file has none.
fn read_rows(path: &Path) -> Result<Vec<StringRecord>, SinkError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SinkError::io(path, e)),
    };
    let mut reader = csv::Reader::from_reader(file);
    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Ok(Vec::new());
    }
    if !headers.iter().eq(COLUMNS.iter().copied()) {
        return Err(SinkError::SchemaMismatch {
            path: path.to_path_buf(),
            expected: COLUMNS.iter().map(|c| c.to_string()).collect(),
            found: headers.iter().map(str::to_string).collect(),
        });
    }
    let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn format_float(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn encode_record(record: &ResultRecord) -> Result<Vec<String>, SinkError> {
    let embedding = match &record.embedding {
        Some(vector) => serde_json::to_string(vector)?,
        None => String::new(),
    };
    Ok(vec![
        record.file.clone(),
        record.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        format_float(record.latitude),
        format_float(record.longitude),
        serde_json::to_string(&record.labels)?,
        serde_json::to_string(&record.scores)?,
        record.report.clone(),
        embedding,
    ])
}

fn decode_row(path: &Path, index: usize, row: &StringRecord) -> Result<ResultRecord, SinkError> {
    let malformed = |message: String| SinkError::MalformedRow {
        path: path.to_path_buf(),
        row: index + 1,
        message,
    };
    let cell = |i: usize| row.get(i).unwrap_or("");
    let parse_float = |i: usize| -> Result<Option<f64>, SinkError> {
        let raw = cell(i);
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse::<f64>()
            .map(Some)
            .map_err(|e| malformed(format!("{}: {}", COLUMNS[i], e)))
    };

    let timestamp = DateTime::parse_from_rfc3339(cell(1))
        .map_err(|e| malformed(format!("timestamp: {}", e)))?
        .with_timezone(&Utc);
    let labels = serde_json::from_str(cell(4)).map_err(|e| malformed(format!("labels: {}", e)))?;
    let scores = serde_json::from_str(cell(5)).map_err(|e| malformed(format!("scores: {}", e)))?;
    let embedding = match cell(7) {
        "" => None,
        raw => Some(serde_json::from_str(raw).map_err(|e| malformed(format!("embedding: {}", e)))?),
    };

    Ok(ResultRecord {
        file: cell(0).to_string(),
        timestamp,
        latitude: parse_float(2)?,
        longitude: parse_float(3)?,
        labels,
        scores,
        report: cell(6).to_string(),
        embedding,
    })
}

/// Reads every record of a dataset back. A missing file yields an empty list.
pub fn read_records(path: &Path) -> Result<Vec<ResultRecord>, SinkError> {
    read_rows(path)?
        .iter()
        .enumerate()
        .map(|(i, row)| decode_row(path, i, row))
        .collect()
}

fn write_rows(
    dest: &Path,
    existing: &[StringRecord],
    records: &[ResultRecord],
) -> Result<(), SinkError> {
    let mut writer = csv::Writer::from_path(dest)?;
    writer.write_record(COLUMNS)?;
    for row in existing {
        writer.write_record(row)?;
    }
    for record in records {
        writer.write_record(encode_record(record)?)?;
    }
    writer.flush().map_err(|e| SinkError::io(dest, e))?;
    Ok(())
}

/// Appends `records` after the rows already in `path` and rewrites the file.
///
/// Holds a [`DatasetLock`] for the whole read-merge-write sequence; a second
/// writer gets `SinkError::Locked` instead of silently dropping rows.
pub fn append_records(path: &Path, records: &[ResultRecord]) -> Result<SinkReceipt, SinkError> {
    ensure_parent(path)?;
    let _lock = DatasetLock::acquire(path)?;

    let existing = read_rows(path)?;
    let tmp = sibling(path, ".tmp");
    if let Err(e) = write_rows(&tmp, &existing, records) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path).map_err(|e| SinkError::io(path, e))?;

    let total_rows = existing.len() + records.len();
    info!(
        dataset = %path.display(),
        appended = records.len(),
        total_rows,
        "dataset rewritten"
    );
    Ok(SinkReceipt::Written {
        path: path.to_path_buf(),
        appended: records.len(),
        total_rows,
    })
}

#[derive(Debug, Clone)]
pub struct CsvDatasetSink {
    path: PathBuf,
}

impl CsvDatasetSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl ResultSink for CsvDatasetSink {
    async fn deliver(&self, records: &[ResultRecord]) -> Result<SinkReceipt, SinkError> {
        let path = self.path.clone();
        let records = records.to_vec();
        tokio::task::spawn_blocking(move || append_records(&path, &records))
            .await
            .map_err(|e| SinkError::io(&self.path, std::io::Error::new(ErrorKind::Other, e)))?
    }

    fn describe(&self) -> String {
        format!("csv dataset {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_keeps_extension() {
        assert_eq!(
            sibling(Path::new("out/survey.csv"), ".lock"),
            PathBuf::from("out/survey.csv.lock")
        );
        assert_eq!(
            sibling(Path::new("survey.csv"), ".tmp"),
            PathBuf::from("survey.csv.tmp")
        );
    }

    #[test]
    fn float_cells() {
        assert_eq!(format_float(Some(-111.83)), "-111.83");
        assert_eq!(format_float(None), "");
    }
}
