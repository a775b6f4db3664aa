//! Offline model preparation: pull a classification model and its
//! preprocessor config from a model hub into a local directory.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

pub const DEFAULT_MODEL_FILES: &[&str] = &[
    "config.json",
    "preprocessor_config.json",
    "model.safetensors",
];

#[derive(Clone)]
pub struct ModelFetcher {
    client: Client,
    hub_url: String,
    api_key: Option<String>,
}

impl ModelFetcher {
    pub fn new(hub_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            hub_url: hub_url.into(),
            api_key,
        }
    }

    /// Directory a model lands in under `out_dir`.
    pub fn model_dir(out_dir: &Path, model: &str) -> PathBuf {
        out_dir.join(model.replace('/', "--"))
    }

    /// Downloads every file in `files`, skipping ones already on disk.
    pub async fn fetch(
        &self,
        model: &str,
        revision: &str,
        files: &[String],
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let model_dir = Self::model_dir(out_dir, model);
        tokio::fs::create_dir_all(&model_dir)
            .await
            .with_context(|| format!("Failed to create model directory: {}", model_dir.display()))?;
        info!(model, revision, dir = %model_dir.display(), "preparing model");

        let mut written = Vec::with_capacity(files.len());
        for (index, name) in files.iter().enumerate() {
            let dest = model_dir.join(name);
            if dest.exists() {
                info!(file = %name, "already present, skipping");
                written.push(dest);
                continue;
            }
            let url = format!(
                "{}/{}/resolve/{}/{}",
                self.hub_url.trim_end_matches('/'),
                model,
                revision,
                name
            );
            info!("[{}/{}] downloading {}", index + 1, files.len(), name);
            if let Err(e) = self.download_file(&url, &dest).await {
                error!(file = %name, error = %e, "download failed");
                return Err(e);
            }
            written.push(dest);
        }

        info!(model, count = written.len(), "model ready for offline use");
        Ok(written)
    }

    async fn download_file(&self, url: &str, dest: &Path) -> Result<()> {
        let mut builder = self.client.get(url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to request {}", url))?;
        if !response.status().is_success() {
            anyhow::bail!("Download of {} failed with status: {}", url, response.status());
        }

        let partial = dest.with_extension(match dest.extension() {
            Some(ext) => format!("{}.part", ext.to_string_lossy()),
            None => "part".to_string(),
        });
        let mut file = tokio::fs::File::create(&partial)
            .await
            .with_context(|| format!("Failed to create file: {}", partial.display()))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Error reading download stream")?;
            file.write_all(&chunk)
                .await
                .context("Error writing to file")?;
        }
        file.flush().await.context("Failed to flush file")?;
        drop(file);

        tokio::fs::rename(&partial, dest)
            .await
            .with_context(|| format!("Failed to move {} into place", partial.display()))?;
        Ok(())
    }
}
