//! Provider abstractions for image classification and text generation backends.

use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod fetch;
pub mod hosted;
pub mod local;
pub mod openai;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// One ranked label from a classification backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub score: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifyResponse {
    /// Backend order, usually highest score first. Never re-sorted here.
    pub predictions: Vec<Prediction>,
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait::async_trait]
pub trait ImageClassifier: Send + Sync {
    async fn classify(&self, image: &[u8]) -> Result<ClassifyResponse, ProviderError>;

    fn model_name(&self) -> &str;
}

#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, req: &GenerationRequest) -> Result<String, ProviderError>;

    fn model_name(&self) -> &str;
}

/// Zips parallel label/score lists, truncating to the shorter one.
pub fn pair_predictions(labels: &[String], scores: &[f32]) -> Vec<Prediction> {
    labels
        .iter()
        .zip(scores.iter())
        .map(|(label, score)| Prediction::new(label.clone(), *score))
        .collect()
}

pub fn http_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::RequestFailed(e.to_string()))
}

/// Maps non-success responses onto `ProviderError`, passing successful ones through.
pub async fn ensure_success(resp: Response) -> Result<Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.bytes().await.unwrap_or(Bytes::from_static(b""));
    let body = String::from_utf8_lossy(&body).into_owned();
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(ProviderError::Unauthorized(format!("status {} body {}", status, body)));
    }
    Err(ProviderError::Status {
        status: status.as_u16(),
        body,
    })
}
