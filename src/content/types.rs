// src/content/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Provenance of an aggregated entry. Never exposed to presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    ApiPrimary,
    ApiSecondary,
    Filesystem,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::ApiPrimary => "api-primary",
            Source::ApiSecondary => "api-secondary",
            Source::Filesystem => "filesystem",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The normalized content unit handed to rendering code.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub published_at: String,
    /// Internal detail page; mutually exclusive with `url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// External destination for link-only entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_image_url: Option<String>,
    /// Article directory relative to the submodule root (filesystem entries only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_path: Option<String>,
}

impl Entry {
    pub fn has_detail_page(&self) -> bool {
        self.slug.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// An entry as seen inside the aggregator, stamped with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedEntry {
    pub entry: Entry,
    pub source: Source,
}

impl AggregatedEntry {
    pub fn new(entry: Entry, source: Source) -> Self {
        Self { entry, source }
    }

    /// Presentation projection: drop provenance.
    pub fn into_entry(self) -> Entry {
        self.entry
    }
}

/// What a source produced, kept distinct so logs can tell "nothing published"
/// apart from "source broken". Both degrade to an empty list when merged.
#[derive(Debug)]
pub enum SourceOutcome<T> {
    Fetched(Vec<T>),
    Empty { reason: String },
    Failed(anyhow::Error),
}

impl<T> SourceOutcome<T> {
    pub fn from_result(res: Result<Vec<T>>) -> Self {
        match res {
            Ok(v) if v.is_empty() => SourceOutcome::Empty {
                reason: "source returned no content".to_string(),
            },
            Ok(v) => SourceOutcome::Fetched(v),
            Err(e) => SourceOutcome::Failed(e),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SourceOutcome::Failed(_))
    }

    /// Collapse to the list the aggregator merges, logging anything abnormal.
    pub fn into_items(self, source: Source) -> Vec<T> {
        match self {
            SourceOutcome::Fetched(v) => v,
            SourceOutcome::Empty { reason } => {
                tracing::info!(target: "content", %source, %reason, "source empty");
                Vec::new()
            }
            SourceOutcome::Failed(e) => {
                tracing::error!(target: "content", error = ?e, %source, "source unavailable");
                metrics::counter!("content_source_errors_total", "source" => source.as_str())
                    .increment(1);
                Vec::new()
            }
        }
    }
}

/// Result of a single-entry lookup. `previous` is newer, `next` is older.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lookup<T> {
    #[serde(rename = "blog")]
    pub item: Option<T>,
    pub previous_slug: Option<String>,
    pub next_slug: Option<String>,
}

impl<T> Lookup<T> {
    pub fn not_found() -> Self {
        Self {
            item: None,
            previous_slug: None,
            next_slug: None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.item.is_some()
    }
}

/// A content origin that can list its entries.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Entry>>;
    fn source(&self) -> Source;
}

/// A content origin whose entries have internal detail pages.
#[async_trait::async_trait]
pub trait DetailSource: SourceAdapter {
    /// Never fails: errors are logged and surface as `Lookup::not_found()`.
    async fn find_by_slug(&self, slug: &str) -> Lookup<Entry>;
}
