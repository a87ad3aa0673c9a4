// src/content/aggregator.rs
//! Merges the three content sources into one newest-first timeline.

use metrics::gauge;
use std::collections::HashSet;
use std::sync::Arc;

use crate::content::dates;
use crate::content::ensure_metrics_described;
use crate::content::types::{
    AggregatedEntry, DetailSource, Entry, Lookup, SourceAdapter, SourceOutcome,
};

#[derive(Clone)]
pub struct Aggregator {
    primary: Arc<dyn DetailSource>,
    secondary: Arc<dyn SourceAdapter>,
    filesystem: Arc<dyn DetailSource>,
}

impl Aggregator {
    pub fn new(
        primary: Arc<dyn DetailSource>,
        secondary: Arc<dyn SourceAdapter>,
        filesystem: Arc<dyn DetailSource>,
    ) -> Self {
        Self {
            primary,
            secondary,
            filesystem,
        }
    }

    /// Fetch all sources concurrently, stamp provenance, sort newest first.
    ///
    /// A failing source contributes nothing; the others are unaffected.
    pub async fn list(&self) -> Vec<AggregatedEntry> {
        ensure_metrics_described();

        let (primary, secondary, filesystem) = tokio::join!(
            self.primary.fetch_all(),
            self.secondary.fetch_all(),
            self.filesystem.fetch_all(),
        );

        let mut all = Vec::new();
        for (source, outcome) in [
            (self.primary.source(), SourceOutcome::from_result(primary)),
            (self.secondary.source(), SourceOutcome::from_result(secondary)),
            (self.filesystem.source(), SourceOutcome::from_result(filesystem)),
        ] {
            all.extend(
                outcome
                    .into_items(source)
                    .into_iter()
                    .map(|e| AggregatedEntry::new(e, source)),
            );
        }

        sort_timeline(&mut all);
        gauge!("content_last_aggregation_ts").set(chrono::Utc::now().timestamp() as f64);
        tracing::info!(target: "content", entries = all.len(), "aggregated timeline");
        all
    }

    /// `list()` with provenance stripped, ready for rendering.
    pub async fn list_entries(&self) -> Vec<Entry> {
        project(self.list().await)
    }

    /// Look up a detail page. The filesystem wins over the CMS; neighbours come
    /// from the matching source's own timeline. Link-only entries are never
    /// candidates.
    pub async fn find_by_slug(&self, slug: &str) -> Lookup<Entry> {
        let from_fs = self.filesystem.find_by_slug(slug).await;
        if from_fs.is_found() {
            return from_fs;
        }
        let from_cms = self.primary.find_by_slug(slug).await;
        if from_cms.is_found() {
            return from_cms;
        }
        tracing::debug!(target: "content", slug, "slug not found in any source");
        Lookup::not_found()
    }

    /// Slugs of every entry with a detail page, in timeline order. A slug
    /// published by several sources is listed once.
    pub async fn detail_slugs(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.list()
            .await
            .into_iter()
            .filter(|a| a.entry.has_detail_page())
            .filter_map(|a| a.entry.slug)
            .filter(|slug| seen.insert(slug.clone()))
            .collect()
    }
}

/// Stable newest-first sort; unparseable dates go last.
pub fn sort_timeline(entries: &mut [AggregatedEntry]) {
    entries.sort_by(|a, b| dates::newest_first(&a.entry.published_at, &b.entry.published_at));
}

/// Presentation projection.
pub fn project(entries: Vec<AggregatedEntry>) -> Vec<Entry> {
    entries.into_iter().map(AggregatedEntry::into_entry).collect()
}
