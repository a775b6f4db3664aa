use chrono::Utc;
use std::fs;
use storage::dataset::{append_records, read_records, DatasetLock, COLUMNS};
use storage::{CsvDatasetSink, ResultRecord, ResultSink, SinkError, SinkReceipt};

fn record(file: &str, location: Option<(f64, f64)>) -> ResultRecord {
    ResultRecord {
        file: file.to_string(),
        timestamp: Utc::now(),
        latitude: location.map(|l| l.0),
        longitude: location.map(|l| l.1),
        labels: vec!["amphora".into(), "jar, storage".into(), "bowl".into()],
        scores: vec![0.875, 0.0625, 0.03125],
        report: "Top identifications: amphora (0.90); \"jar, storage\" (0.08)\nsecond line".into(),
        embedding: Some(vec![0.25, -1.5, 0.001953125]),
    }
}

#[test]
fn first_write_creates_dataset_with_header() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("nested").join("survey.csv");

    let receipt = append_records(&path, &[record("a.jpg", None)]).unwrap();
    assert_eq!(
        receipt,
        SinkReceipt::Written {
            path: path.clone(),
            appended: 1,
            total_rows: 1
        }
    );

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with(&COLUMNS.join(",")));
    assert!(!temp.path().join("nested").join("survey.csv.lock").exists());
    assert!(!temp.path().join("nested").join("survey.csv.tmp").exists());
}

#[test]
fn round_trip_preserves_every_field() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("survey.csv");
    let with_location = record("a.jpg", Some((41.75, -111.83)));
    let mut without = record("b.png", None);
    without.embedding = None;

    append_records(&path, &[with_location.clone(), without.clone()]).unwrap();
    let back = read_records(&path).unwrap();
    assert_eq!(back, vec![with_location, without]);
}

#[test]
fn repeated_runs_append_without_touching_prior_rows() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("survey.csv");
    let batch = vec![record("a.jpg", None), record("b.jpg", None)];

    append_records(&path, &batch).unwrap();
    let after_first = fs::read_to_string(&path).unwrap();

    let receipt = append_records(&path, &batch).unwrap();
    assert!(matches!(receipt, SinkReceipt::Written { total_rows: 4, appended: 2, .. }));

    let after_second = fs::read_to_string(&path).unwrap();
    assert!(after_second.starts_with(&after_first));

    let rows = read_records(&path).unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(&rows[..2], &batch[..]);
    assert_eq!(&rows[2..], &batch[..]);
}

#[test]
fn mismatched_schema_is_rejected_and_left_alone() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("survey.csv");
    fs::write(&path, "name,score\nx,1\n").unwrap();

    let err = append_records(&path, &[record("a.jpg", None)]).unwrap_err();
    assert!(matches!(err, SinkError::SchemaMismatch { .. }), "{err:?}");
    assert_eq!(fs::read_to_string(&path).unwrap(), "name,score\nx,1\n");
}

#[test]
fn held_lock_blocks_second_writer() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("survey.csv");

    let lock = DatasetLock::acquire(&path).unwrap();
    let err = append_records(&path, &[record("a.jpg", None)]).unwrap_err();
    assert!(matches!(err, SinkError::Locked(_)));
    assert!(!path.exists());

    drop(lock);
    append_records(&path, &[record("a.jpg", None)]).unwrap();
    assert_eq!(read_records(&path).unwrap().len(), 1);
}

#[test]
fn missing_dataset_reads_empty() {
    let temp = tempfile::tempdir().unwrap();
    assert!(read_records(&temp.path().join("none.csv")).unwrap().is_empty());
}

#[tokio::test]
async fn sink_delivers_through_blocking_pool() {
    let temp = tempfile::tempdir().unwrap();
    let sink = CsvDatasetSink::new(temp.path().join("survey.csv"));

    let receipt = sink.deliver(&[record("a.jpg", None)]).await.unwrap();
    assert!(matches!(receipt, SinkReceipt::Written { total_rows: 1, .. }));
    assert!(sink.describe().contains("survey.csv"));
}
