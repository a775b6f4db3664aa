//! Finds the eligible images directly inside a folder.

use crate::error::PipelineError;
use crate::models::ImageFile;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Lists image files in `dir` in directory-listing order.
///
/// Subdirectories are not descended into. Entries are kept when their
/// extension matches one of `extensions` (case-insensitive) and their file
/// name matches none of the `exclude` globs. Entries that cannot be read,
/// such as dangling symlinks, are skipped.
pub fn scan_images(
    dir: &Path,
    extensions: &[String],
    exclude: &[String],
) -> Result<Vec<ImageFile>, PipelineError> {
    let scan_err = |message: String| PipelineError::Scan {
        dir: dir.to_path_buf(),
        message,
    };
    if !dir.is_dir() {
        return Err(scan_err("not a readable directory".into()));
    }
    let exclude_set = build_globset(exclude).map_err(|e| scan_err(e.to_string()))?;
    let root = dir.canonicalize().map_err(|e| scan_err(e.to_string()))?;

    let mut images = Vec::new();
    let walker = WalkDir::new(&root)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1);
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(scan_err(e.to_string())),
            Err(e) => {
                warn!(path = ?e.path(), error = %e, "unreadable entry, skipping");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !has_extension(&name, extensions) {
            debug!(file = %name, "unrecognized extension, skipping");
            continue;
        }
        if exclude_set.is_match(&name) {
            debug!(file = %name, "excluded by pattern");
            continue;
        }
        images.push(ImageFile {
            name,
            path: entry.into_path(),
        });
    }
    Ok(images)
}

fn has_extension(name: &str, extensions: &[String]) -> bool {
    let lower = name.to_lowercase();
    extensions.iter().any(|ext| {
        let ext = ext.trim_start_matches('.').to_lowercase();
        !ext.is_empty() && lower.ends_with(&format!(".{}", ext))
    })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(Glob::new(pat)?);
    }
    builder.build()
}
