use chrono::Utc;
use std::time::Duration;
use storage::remote::RemoteConfig;
use storage::{RemoteSink, ResultRecord, ResultSink, SinkError, SinkReceipt};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record(file: &str) -> ResultRecord {
    ResultRecord {
        file: file.to_string(),
        timestamp: Utc::now(),
        latitude: Some(34.0219),
        longitude: Some(-118.4814),
        labels: vec!["coin".into()],
        scores: vec![0.75],
        report: "Top identifications: coin (0.75)".into(),
        embedding: None,
    }
}

fn sink(server: &MockServer, fallback: Option<std::path::PathBuf>) -> RemoteSink {
    RemoteSink::new(RemoteConfig {
        url: format!("{}/exec", server.uri()),
        fallback_path: fallback,
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn posts_whole_batch_in_one_document() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/exec"))
        .and(body_partial_json(serde_json::json!({
            "batch": [
                { "file": "a.jpg", "latitude": 34.0219, "labels": ["coin"] },
                { "file": "b.jpg" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("Saved 2 rows"))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = sink(&server, None)
        .deliver(&[record("a.jpg"), record("b.jpg")])
        .await
        .unwrap();
    assert_eq!(receipt, SinkReceipt::Acknowledged("Saved 2 rows".into()));
}

#[tokio::test]
async fn rejection_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("script error"))
        .mount(&server)
        .await;

    match sink(&server, None).deliver(&[record("a.jpg")]).await {
        Err(SinkError::Rejected { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "script error");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn fallback_copy_survives_failed_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let temp = tempfile::tempdir().unwrap();
    let fallback = temp.path().join("pending").join("batch.json");
    let result = sink(&server, Some(fallback.clone()))
        .deliver(&[record("a.jpg")])
        .await;
    assert!(result.is_err());

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&fallback).unwrap()).unwrap();
    assert_eq!(saved["batch"][0]["file"], "a.jpg");
    assert_eq!(saved["batch"].as_array().unwrap().len(), 1);
}
