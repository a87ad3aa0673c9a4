// src/content/providers/markdown.rs
//! Filesystem-markdown adapter: articles checked out from the content submodule.

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use metrics::{counter, histogram};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ContentConfig;
use crate::content::dates;
use crate::content::frontmatter::{self, FrontMatter};
use crate::content::images::ImageResolver;
use crate::content::navigation;
use crate::content::types::{DetailSource, Entry, Lookup, Source, SourceAdapter};

#[derive(Debug)]
struct MarkdownPost {
    metadata: FrontMatter,
    content: String,
    file_path: PathBuf,
}

pub struct MarkdownAdapter {
    articles_root: PathBuf,
    images: ImageResolver,
}

impl MarkdownAdapter {
    pub fn new(articles_root: impl Into<PathBuf>, images: ImageResolver) -> Self {
        Self {
            articles_root: articles_root.into(),
            images,
        }
    }

    pub fn from_config(cfg: &ContentConfig) -> Self {
        Self::new(
            cfg.articles_root(),
            ImageResolver::new(&cfg.submodule_dir, &cfg.assets_prefix),
        )
    }

    fn to_entry(&self, post: MarkdownPost) -> Entry {
        let fm = post.metadata;
        Entry {
            id: fm.slug.clone(),
            title: fm.title,
            description: Some(fm.description),
            body: Some(self.images.rewrite_markdown(&post.content, &post.file_path)),
            published_at: fm.date,
            slug: Some(fm.slug),
            url: None,
            media: None,
            header_image_url: fm
                .header_image
                .map(|h| self.images.resolve(&h, &post.file_path)),
            article_path: Some(self.images.article_path(&post.file_path)),
        }
    }
}

/// Every `.md` file below `root`, sorted by path. A missing root is empty.
pub fn find_markdown_files(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        tracing::warn!(target: "content", root = %root.display(), "content directory not found");
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|res| match res {
            Ok(e) => Some(e),
            Err(e) => {
                tracing::warn!(target: "content", error = ?e, "skipping unreadable path");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("md"))
        .collect();
    files.sort();
    files
}

/// Read and validate one file. Invalid records are logged and dropped.
async fn parse_markdown_file(file_path: PathBuf) -> Option<MarkdownPost> {
    let text = match tokio::fs::read_to_string(&file_path).await {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(target: "content", error = ?e, file = %file_path.display(), "reading markdown failed");
            counter!("content_records_rejected_total").increment(1);
            return None;
        }
    };

    match frontmatter::parse(&text) {
        Ok((metadata, body)) => Some(MarkdownPost {
            metadata,
            content: body.to_string(),
            file_path,
        }),
        Err(e) => {
            tracing::warn!(target: "content", reason = %e, file = %file_path.display(), "rejecting markdown record");
            counter!("content_records_rejected_total").increment(1);
            None
        }
    }
}

#[async_trait]
impl SourceAdapter for MarkdownAdapter {
    async fn fetch_all(&self) -> Result<Vec<Entry>> {
        let t0 = std::time::Instant::now();
        let files = find_markdown_files(&self.articles_root);

        let parsed = join_all(files.into_iter().map(parse_markdown_file)).await;

        // Files were collected in path order, so the stable sort breaks date
        // ties by path.
        let mut entries: Vec<Entry> = parsed
            .into_iter()
            .flatten()
            .map(|post| self.to_entry(post))
            .collect();
        entries.sort_by(|a, b| dates::newest_first(&a.published_at, &b.published_at));

        histogram!("content_parse_ms", "source" => "filesystem")
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("content_entries_total", "source" => "filesystem")
            .increment(entries.len() as u64);
        Ok(entries)
    }

    fn source(&self) -> Source {
        Source::Filesystem
    }
}

#[async_trait]
impl DetailSource for MarkdownAdapter {
    async fn find_by_slug(&self, slug: &str) -> Lookup<Entry> {
        match self.fetch_all().await {
            Ok(all) => navigation::lookup_in(all, slug),
            Err(e) => {
                tracing::warn!(target: "content", error = ?e, slug, "markdown slug lookup failed");
                Lookup::not_found()
            }
        }
    }
}
