// src/content/assets.rs
//! Build step: mirror article images from the submodule into the public tree
//! so the paths produced by `ImageResolver` exist at serve time.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

fn is_image(path: &Path) -> bool {
    static RE_IMAGE: OnceCell<Regex> = OnceCell::new();
    RE_IMAGE
        .get_or_try_init(|| Regex::new(r"(?i)\.(png|jpe?g|gif|svg|webp)$"))
        .map(|re| re.is_match(&path.to_string_lossy()))
        .unwrap_or(false)
}

/// Copy every image under `source_dir` to `dest_dir`, keeping relative paths.
///
/// `dest_dir` is wiped first. A missing `source_dir` is skipped with a warning.
/// Returns the copied paths relative to `dest_dir`, sorted.
pub fn copy_article_images(source_dir: &Path, dest_dir: &Path) -> Result<Vec<String>> {
    if !source_dir.exists() {
        tracing::warn!(target: "content", source = %source_dir.display(), "submodule directory not found; skipping image copy");
        return Ok(Vec::new());
    }

    if dest_dir.exists() {
        tracing::info!(target: "content", dest = %dest_dir.display(), "cleaning existing image directory");
        fs::remove_dir_all(dest_dir)
            .with_context(|| format!("removing {}", dest_dir.display()))?;
    }

    let mut copied = Vec::new();
    for entry in WalkDir::new(source_dir).into_iter() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::error!(target: "content", error = ?e, "file processing error");
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_image(entry.path()) {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(source_dir) else {
            continue;
        };
        let target = dest_dir.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::copy(entry.path(), &target)
            .with_context(|| format!("copying {}", entry.path().display()))?;

        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        tracing::debug!(target: "content", path = %rel, "copied image");
        copied.push(rel);
    }

    copied.sort();
    tracing::info!(target: "content", count = copied.len(), "image copy finished");
    Ok(copied)
}
