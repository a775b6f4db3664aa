use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scan: ScanConfig,
    pub classifier: ClassifierConfig,
    pub report: ReportConfig,
    pub sink: SinkConfig,
    pub models: ModelsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Recognized extensions, compared case-insensitively, without the dot.
    pub extensions: Vec<String>,
    /// Glob patterns matched against file names.
    pub exclude: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
            exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierBackend {
    Hosted,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub backend: ClassifierBackend,
    pub model: String,
    pub base_url: String,
    pub api_key_env: Option<String>,
    pub top_k: usize,
    pub timeout_secs: u64,
    pub keep_embedding: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: ClassifierBackend::Hosted,
            model: "openai/clip-vit-large-patch14".into(),
            base_url: "https://router.huggingface.co".into(),
            api_key_env: Some("HF_TOKEN".into()),
            top_k: 5,
            timeout_secs: 60,
            keep_embedding: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStrategy {
    Deterministic,
    Narrative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub strategy: ReportStrategy,
    pub delimiter: String,
    pub model: String,
    pub base_url: String,
    pub api_key_env: Option<String>,
    pub persona: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_chars: usize,
    pub timeout_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            strategy: ReportStrategy::Deterministic,
            delimiter: "; ".into(),
            model: "meta-llama/Meta-Llama-3-8B-Instruct".into(),
            base_url: "https://router.huggingface.co".into(),
            api_key_env: Some("HF_TOKEN".into()),
            persona: "a world-class archaeologist".into(),
            max_tokens: 1200,
            temperature: 0.7,
            max_chars: 50_000,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    File,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    pub path: String,
    pub url: Option<String>,
    pub fallback_path: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::File,
            path: "survey.csv".into(),
            url: None,
            fallback_path: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub hub_url: String,
    pub api_key_env: Option<String>,
    pub files: Vec<String>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            hub_url: "https://huggingface.co".into(),
            api_key_env: Some("HF_TOKEN".into()),
            files: providers::fetch::DEFAULT_MODEL_FILES
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }
}

/// Reads the key named by `env_name`, if any. Empty values count as unset.
pub fn api_key(env_name: Option<&str>) -> Option<String> {
    env_name
        .and_then(|name| std::env::var(name).ok())
        .filter(|key| !key.is_empty())
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("SURVEY")
            .prefix_separator("_")
            .separator("__"),
    );
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_cover_the_plain_pipeline() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.scan.extensions, vec!["jpg", "jpeg", "png"]);
        assert_eq!(cfg.classifier.top_k, 5);
        assert_eq!(cfg.report.strategy, ReportStrategy::Deterministic);
        assert_eq!(cfg.sink.kind, SinkKind::File);
    }

    #[test]
    fn file_overrides_selected_fields() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("survey.toml");
        fs::write(
            &path,
            r#"
            [classifier]
            backend = "local"
            base_url = "http://localhost:8080"
            top_k = 3

            [sink]
            kind = "remote"
            url = "https://example.com/exec"
            "#,
        )
        .unwrap();

        let cfg = load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(cfg.classifier.backend, ClassifierBackend::Local);
        assert_eq!(cfg.classifier.top_k, 3);
        assert_eq!(cfg.classifier.timeout_secs, 60);
        assert_eq!(cfg.sink.kind, SinkKind::Remote);
        assert_eq!(cfg.sink.url.as_deref(), Some("https://example.com/exec"));
        assert_eq!(cfg.report.max_tokens, 1200);
    }
}
