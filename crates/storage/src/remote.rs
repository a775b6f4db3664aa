use crate::models::ResultRecord;
use crate::{ResultSink, SinkError, SinkReceipt};
use reqwest::Client;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone)]
pub struct RemoteConfig {
    pub url: String,
    /// Local copy of the batch document written before the POST.
    pub fallback_path: Option<PathBuf>,
    pub timeout: Duration,
}

/// Delivers a whole batch as one `{"batch": [...]}` POST. No retries.
#[derive(Clone)]
pub struct RemoteSink {
    client: Client,
    cfg: RemoteConfig,
}

#[derive(Serialize)]
struct BatchDocument<'a> {
    batch: &'a [ResultRecord],
}

impl RemoteSink {
    pub fn new(cfg: RemoteConfig) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| SinkError::Request(e.to_string()))?;
        Ok(Self { client, cfg })
    }

    async fn write_fallback(&self, document: &BatchDocument<'_>) -> Result<(), SinkError> {
        let Some(path) = &self.cfg.fallback_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SinkError::io(parent, e))?;
        }
        let body = serde_json::to_vec_pretty(document)?;
        tokio::fs::write(path, body)
            .await
            .map_err(|e| SinkError::io(path, e))?;
        info!(path = %path.display(), records = document.batch.len(), "fallback copy written");
        Ok(())
    }
}

#[async_trait::async_trait]
impl ResultSink for RemoteSink {
    async fn deliver(&self, records: &[ResultRecord]) -> Result<SinkReceipt, SinkError> {
        let document = BatchDocument { batch: records };
        self.write_fallback(&document).await?;

        let resp = self
            .client
            .post(&self.cfg.url)
            .json(&document)
            .send()
            .await
            .map_err(|e| SinkError::Request(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            warn!(status = status.as_u16(), "remote endpoint rejected batch");
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(records = records.len(), ack = %body, "batch delivered");
        Ok(SinkReceipt::Acknowledged(body))
    }

    fn describe(&self) -> String {
        format!("remote endpoint {}", self.cfg.url)
    }
}
