use providers::{ImageClassifier, Prediction, ProviderError};

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationOutcome {
    /// First `k` predictions in backend order.
    pub predictions: Vec<Prediction>,
    pub embedding: Option<Vec<f32>>,
}

impl ClassificationOutcome {
    pub fn labels(&self) -> Vec<String> {
        self.predictions.iter().map(|p| p.label.clone()).collect()
    }

    pub fn scores(&self) -> Vec<f32> {
        self.predictions.iter().map(|p| p.score).collect()
    }
}

/// Positional prefix of `predictions`. Never re-sorts.
pub fn top_k(mut predictions: Vec<Prediction>, k: usize) -> Vec<Prediction> {
    predictions.truncate(k);
    predictions
}

pub async fn classify(
    image: &[u8],
    classifier: &dyn ImageClassifier,
    k: usize,
) -> Result<ClassificationOutcome, ProviderError> {
    let resp = classifier.classify(image).await?;
    if resp.predictions.is_empty() {
        return Err(ProviderError::MalformedResponse(format!(
            "{} returned no predictions",
            classifier.model_name()
        )));
    }
    Ok(ClassificationOutcome {
        predictions: top_k(resp.predictions, k),
        embedding: resp.embedding,
    })
}
