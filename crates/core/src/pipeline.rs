use crate::config::{
    self, AppConfig, ClassifierBackend, ClassifierConfig, ReportConfig, ReportStrategy,
    SinkConfig, SinkKind,
};
use crate::error::PipelineError;
use crate::models::{BatchRun, GeoCoordinate};
use crate::processor::{self, ItemContext};
use crate::report::{
    DeterministicFormatter, NarrativeFormatter, NarrativeSettings, ReportFormatter,
};
use crate::scanner;
use anyhow::Context;
use providers::hosted::{HostedClassifier, HostedConfig};
use providers::local::{LocalClassifier, LocalConfig};
use providers::openai::{ChatGenerator, OpenAiConfig};
use providers::ImageClassifier;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use storage::remote::RemoteConfig;
use storage::{CsvDatasetSink, RemoteSink, ResultSink};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub top_k: usize,
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
    pub keep_embedding: bool,
    pub classify_timeout: Duration,
    pub report_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl PipelineOptions {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            top_k: cfg.classifier.top_k,
            extensions: cfg.scan.extensions.clone(),
            exclude: cfg.scan.exclude.clone(),
            keep_embedding: cfg.classifier.keep_embedding,
            classify_timeout: Duration::from_secs(cfg.classifier.timeout_secs),
            report_timeout: Duration::from_secs(cfg.report.timeout_secs),
        }
    }

    /// Rejects settings under which every item would fail.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.top_k == 0 {
            return Err(PipelineError::Config("top_k must be at least 1".into()));
        }
        if self.classify_timeout.is_zero() {
            return Err(PipelineError::Config("classifier.timeout_secs must be at least 1".into()));
        }
        if self.report_timeout.is_zero() {
            return Err(PipelineError::Config("report.timeout_secs must be at least 1".into()));
        }
        Ok(())
    }
}

/// Folder batch driver. Owns one classifier, formatter and sink for the run.
pub struct Pipeline {
    classifier: Arc<dyn ImageClassifier>,
    formatter: Arc<dyn ReportFormatter>,
    sink: Arc<dyn ResultSink>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        classifier: Arc<dyn ImageClassifier>,
        formatter: Arc<dyn ReportFormatter>,
        sink: Arc<dyn ResultSink>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            classifier,
            formatter,
            sink,
            options,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            build_classifier(&cfg.classifier)?,
            build_formatter(&cfg.report)?,
            build_sink(&cfg.sink)?,
            PipelineOptions::from_config(cfg),
        ))
    }

    /// Processes every eligible image in `dir` sequentially, then hands the
    /// assembled records to the sink once. Nothing is delivered when no record
    /// was assembled.
    pub async fn process_folder(
        &self,
        dir: &Path,
        geo: Option<GeoCoordinate>,
    ) -> Result<BatchRun, PipelineError> {
        self.options.validate()?;

        let images =
            scanner::scan_images(dir, &self.options.extensions, &self.options.exclude)?;
        info!(dir = %dir.display(), count = images.len(), "scan complete");

        let mut run = BatchRun {
            scanned: images.len(),
            ..Default::default()
        };
        if images.is_empty() {
            info!("no eligible images found, nothing to deliver");
            return Ok(run);
        }

        let ctx = ItemContext {
            classifier: self.classifier.as_ref(),
            formatter: self.formatter.as_ref(),
            top_k: self.options.top_k,
            keep_embedding: self.options.keep_embedding,
            classify_timeout: self.options.classify_timeout,
            report_timeout: self.options.report_timeout,
        };
        for image in &images {
            match processor::process_item(&ctx, image, geo).await {
                Ok(record) => run.records.push(record),
                Err(failure) => run.failures.push(failure),
            }
        }

        if run.records.is_empty() {
            warn!(failed = run.failures.len(), "every item failed, sink not invoked");
            return Ok(run);
        }

        info!(
            records = run.records.len(),
            sink = %self.sink.describe(),
            "delivering batch"
        );
        let receipt = self.sink.deliver(&run.records).await?;
        run.receipt = Some(receipt);
        Ok(run)
    }
}

pub fn build_classifier(cfg: &ClassifierConfig) -> anyhow::Result<Arc<dyn ImageClassifier>> {
    let api_key = config::api_key(cfg.api_key_env.as_deref());
    let timeout = Duration::from_secs(cfg.timeout_secs);
    let classifier: Arc<dyn ImageClassifier> = match cfg.backend {
        ClassifierBackend::Hosted => Arc::new(
            HostedClassifier::new(HostedConfig {
                api_key,
                base_url: cfg.base_url.clone(),
                model: cfg.model.clone(),
                timeout,
            })
            .context("hosted classifier")?,
        ),
        ClassifierBackend::Local => Arc::new(
            LocalClassifier::new(LocalConfig {
                base_url: cfg.base_url.clone(),
                model: cfg.model.clone(),
                api_key,
                timeout,
            })
            .context("local classifier")?,
        ),
    };
    Ok(classifier)
}

pub fn build_formatter(cfg: &ReportConfig) -> anyhow::Result<Arc<dyn ReportFormatter>> {
    match cfg.strategy {
        ReportStrategy::Deterministic => {
            Ok(Arc::new(DeterministicFormatter::new(cfg.delimiter.clone())))
        }
        ReportStrategy::Narrative => {
            let generator = ChatGenerator::new(OpenAiConfig {
                api_key: config::api_key(cfg.api_key_env.as_deref()),
                base_url: cfg.base_url.clone(),
                chat_model: cfg.model.clone(),
                timeout: Duration::from_secs(cfg.timeout_secs),
            })
            .context("narrative generator")?;
            Ok(Arc::new(NarrativeFormatter::new(
                Arc::new(generator),
                NarrativeSettings {
                    persona: cfg.persona.clone(),
                    max_tokens: cfg.max_tokens,
                    temperature: cfg.temperature,
                    max_chars: cfg.max_chars,
                },
            )))
        }
    }
}

pub fn build_sink(cfg: &SinkConfig) -> anyhow::Result<Arc<dyn ResultSink>> {
    match cfg.kind {
        SinkKind::File => Ok(Arc::new(CsvDatasetSink::new(&cfg.path))),
        SinkKind::Remote => {
            let url = cfg
                .url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("sink.url is required for the remote sink"))?;
            let sink = RemoteSink::new(RemoteConfig {
                url,
                fallback_path: cfg.fallback_path.as_ref().map(PathBuf::from),
                timeout: Duration::from_secs(cfg.timeout_secs),
            })
            .context("remote sink")?;
            Ok(Arc::new(sink))
        }
    }
}
