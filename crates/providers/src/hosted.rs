use crate::{
    ensure_success, http_client, pair_predictions, ClassifyResponse, ImageClassifier,
    ProviderError,
};
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Clone)]
pub struct HostedConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

/// Multimodal classification behind a hosted inference router.
#[derive(Clone)]
pub struct HostedClassifier {
    client: Client,
    cfg: Arc<HostedConfig>,
}

impl HostedClassifier {
    pub fn new(cfg: HostedConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(cfg.timeout)?,
            cfg: Arc::new(cfg),
        })
    }
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    model: &'a str,
    inputs: InferenceInputs,
}

#[derive(Serialize)]
struct InferenceInputs {
    image: String,
}

#[derive(Deserialize)]
struct InferenceResponse {
    #[serde(default)]
    outputs: Vec<InferenceOutput>,
}

#[derive(Deserialize)]
struct InferenceOutput {
    labels: Vec<String>,
    scores: Vec<f32>,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

#[async_trait::async_trait]
impl ImageClassifier for HostedClassifier {
    async fn classify(&self, image: &[u8]) -> Result<ClassifyResponse, ProviderError> {
        if image.is_empty() {
            return Err(ProviderError::InvalidInput("empty image payload".into()));
        }
        let body = InferenceRequest {
            model: &self.cfg.model,
            inputs: InferenceInputs {
                image: base64::engine::general_purpose::STANDARD.encode(image),
            },
        };

        let mut builder = self
            .client
            .post(format!("{}/inference", self.cfg.base_url.trim_end_matches('/')))
            .json(&body);
        if let Some(key) = &self.cfg.api_key {
            builder = builder.bearer_auth(key);
        }
        let resp = builder
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let resp = ensure_success(resp).await?;

        let parsed: InferenceResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        let output = parsed
            .outputs
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("response has no outputs".into()))?;

        if output.labels.len() != output.scores.len() {
            debug!(
                labels = output.labels.len(),
                scores = output.scores.len(),
                "label/score count mismatch, truncating"
            );
        }
        let predictions = pair_predictions(&output.labels, &output.scores);
        if predictions.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "response contained no predictions".into(),
            ));
        }

        Ok(ClassifyResponse {
            predictions,
            embedding: output.embedding,
        })
    }

    fn model_name(&self) -> &str {
        &self.cfg.model
    }
}
