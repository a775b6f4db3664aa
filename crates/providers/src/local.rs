use crate::{
    ensure_success, http_client, ClassifyResponse, ImageClassifier, Prediction, ProviderError,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct LocalConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// Identification model served by a local inference server.
///
/// The server takes raw image bytes and answers with a ranked
/// `[{"label": .., "score": ..}]` array. It carries no embedding.
#[derive(Clone)]
pub struct LocalClassifier {
    client: Client,
    cfg: Arc<LocalConfig>,
}

impl LocalClassifier {
    pub fn new(cfg: LocalConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(cfg.timeout)?,
            cfg: Arc::new(cfg),
        })
    }
}

#[async_trait::async_trait]
impl ImageClassifier for LocalClassifier {
    async fn classify(&self, image: &[u8]) -> Result<ClassifyResponse, ProviderError> {
        if image.is_empty() {
            return Err(ProviderError::InvalidInput("empty image payload".into()));
        }
        let url = format!(
            "{}/models/{}",
            self.cfg.base_url.trim_end_matches('/'),
            self.cfg.model
        );
        let mut builder = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec());
        if let Some(key) = &self.cfg.api_key {
            builder = builder.bearer_auth(key);
        }
        let resp = builder
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let resp = ensure_success(resp).await?;

        let predictions: Vec<Prediction> = resp
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        if predictions.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "response contained no predictions".into(),
            ));
        }

        Ok(ClassifyResponse {
            predictions,
            embedding: None,
        })
    }

    fn model_name(&self) -> &str {
        &self.cfg.model
    }
}
