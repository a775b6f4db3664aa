//! Turns the top-K predictions for one image into report text.

use providers::{GenerationRequest, Prediction, ProviderError, TextGenerator};
use std::sync::Arc;

#[async_trait::async_trait]
pub trait ReportFormatter: Send + Sync {
    async fn format(&self, predictions: &[Prediction]) -> Result<String, ProviderError>;
}

/// `Top identifications: A (0.90); B (0.80)`, with the configured delimiter.
#[derive(Debug, Clone)]
pub struct DeterministicFormatter {
    delimiter: String,
}

impl DeterministicFormatter {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
        }
    }
}

impl Default for DeterministicFormatter {
    fn default() -> Self {
        Self::new("; ")
    }
}

fn pair_text(label: &str, score: f32) -> String {
    format!("{} ({:.2})", label, score)
}

/// Formats parallel label/score lists; extra entries on either side are dropped.
pub fn format_pairs(labels: &[String], scores: &[f32], delimiter: &str) -> String {
    let pairs: Vec<String> = labels
        .iter()
        .zip(scores.iter())
        .map(|(label, score)| pair_text(label, *score))
        .collect();
    if pairs.is_empty() {
        return "No identifications".to_string();
    }
    format!("Top identifications: {}", pairs.join(delimiter))
}

#[async_trait::async_trait]
impl ReportFormatter for DeterministicFormatter {
    async fn format(&self, predictions: &[Prediction]) -> Result<String, ProviderError> {
        let labels: Vec<String> = predictions.iter().map(|p| p.label.clone()).collect();
        let scores: Vec<f32> = predictions.iter().map(|p| p.score).collect();
        Ok(format_pairs(&labels, &scores, &self.delimiter))
    }
}

#[derive(Debug, Clone)]
pub struct NarrativeSettings {
    pub persona: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Output cap stated to the backend. Not verified on the reply.
    pub max_chars: usize,
}

/// Long-form analysis written by a text generation backend.
pub struct NarrativeFormatter {
    generator: Arc<dyn TextGenerator>,
    settings: NarrativeSettings,
}

impl NarrativeFormatter {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: NarrativeSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }
}

const ANALYSIS_TOPICS: &[&str] = &[
    "What the object most likely is",
    "Probable cultural origin",
    "Estimated time period",
    "Materials and crafting techniques",
    "Decoration meaning (symbols, engravings, motifs)",
    "Historical context",
    "Comparison to similar real artifacts",
    "Preservation state and risks",
    "How professionals would examine/determine authenticity",
    "Scientific methods (XRF, carbon dating, CT scanning)",
    "Excavation context",
    "Final probability and confidence ranking",
];

pub fn build_prompt(predictions: &[Prediction], persona: &str, max_chars: usize) -> String {
    let pairs: Vec<String> = predictions
        .iter()
        .map(|p| pair_text(&p.label, p.score))
        .collect();
    let topics: Vec<String> = ANALYSIS_TOPICS.iter().map(|t| format!("- {}", t)).collect();

    format!(
        "You are {persona}.\n\n\
         These are the image classifier's top identifications:\n{pairs}\n\n\
         Write an extremely detailed analysis including:\n\n{topics}\n\n\
         Write 12 to 18 paragraphs.\n\
         Your report must not exceed {max_chars} characters.",
        persona = persona,
        pairs = pairs.join("\n"),
        topics = topics.join("\n"),
        max_chars = max_chars,
    )
}

#[async_trait::async_trait]
impl ReportFormatter for NarrativeFormatter {
    async fn format(&self, predictions: &[Prediction]) -> Result<String, ProviderError> {
        let req = GenerationRequest {
            prompt: build_prompt(predictions, &self.settings.persona, self.settings.max_chars),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };
        self.generator.generate(&req).await
    }
}
