//! One image through load → classify → format → assemble.
//!
//! Every failure is turned into an [`ItemFailure`] value here; nothing from a
//! single item propagates to the batch driver as an error.

use crate::classifier;
use crate::models::{GeoCoordinate, ImageFile, ItemFailure, ItemStage, ResultRecord};
use crate::report::ReportFormatter;
use chrono::Utc;
use providers::ImageClassifier;
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Borrowed collaborators and limits shared by every item of a run.
pub struct ItemContext<'a> {
    pub classifier: &'a dyn ImageClassifier,
    pub formatter: &'a dyn ReportFormatter,
    pub top_k: usize,
    pub keep_embedding: bool,
    pub classify_timeout: Duration,
    pub report_timeout: Duration,
}

/// Reads the file and checks it decodes to an RGB image. Returns the raw bytes.
pub async fn load_image(path: &Path) -> Result<Vec<u8>, String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    tokio::task::spawn_blocking(move || -> Result<Vec<u8>, String> {
        image::load_from_memory(&bytes)
            .map(|img| img.to_rgb8())
            .map_err(|e| format!("undecodable image: {}", e))?;
        Ok(bytes)
    })
    .await
    .map_err(|e| format!("decode task failed: {}", e))?
}

pub async fn process_item(
    ctx: &ItemContext<'_>,
    image: &ImageFile,
    geo: Option<GeoCoordinate>,
) -> Result<ResultRecord, ItemFailure> {
    let fail = |stage: ItemStage, message: String| {
        warn!(file = %image.name, %stage, error = %message, "item failed");
        ItemFailure {
            file: image.name.clone(),
            stage,
            message,
        }
    };

    info!(file = %image.name, "processing");
    let bytes = load_image(&image.path)
        .await
        .map_err(|m| fail(ItemStage::Loading, m))?;

    debug!(file = %image.name, bytes = bytes.len(), "classifying");
    let outcome = match timeout(
        ctx.classify_timeout,
        classifier::classify(&bytes, ctx.classifier, ctx.top_k),
    )
    .await
    {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => return Err(fail(ItemStage::Classifying, e.to_string())),
        Err(_) => {
            return Err(fail(
                ItemStage::Classifying,
                format!("timed out after {}s", ctx.classify_timeout.as_secs()),
            ))
        }
    };

    debug!(file = %image.name, "formatting report");
    let report = match timeout(ctx.report_timeout, ctx.formatter.format(&outcome.predictions)).await
    {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => return Err(fail(ItemStage::Formatting, e.to_string())),
        Err(_) => {
            return Err(fail(
                ItemStage::Formatting,
                format!("timed out after {}s", ctx.report_timeout.as_secs()),
            ))
        }
    };

    let record = ResultRecord {
        file: image.name.clone(),
        timestamp: Utc::now(),
        latitude: geo.map(|g| g.latitude),
        longitude: geo.map(|g| g.longitude),
        labels: outcome.labels(),
        scores: outcome.scores(),
        report,
        embedding: if ctx.keep_embedding {
            outcome.embedding
        } else {
            None
        },
    };
    info!(file = %record.file, labels = ?record.labels, "item assembled");
    Ok(record)
}
