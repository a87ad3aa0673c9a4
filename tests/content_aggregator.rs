//! Integration tests for the three-source timeline and slug lookup.
//!
//! Sources come from fixtures (CMS) and a temp directory (markdown), plus a
//! few hand-written adapters to exercise failure isolation.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use portfolio_content::content::aggregator::{project, sort_timeline};
use portfolio_content::content::images::ImageResolver;
use portfolio_content::content::providers::contentful::ContentfulAdapter;
use portfolio_content::content::providers::markdown::MarkdownAdapter;
use portfolio_content::content::providers::microcms::MicroCmsAdapter;
use portfolio_content::content::types::{DetailSource, SourceAdapter};
use portfolio_content::content::{AggregatedEntry, Aggregator, Entry, Lookup, Source};

const CONTENTFUL_JSON: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/contentful_entries.json"
));
const MICROCMS_JSON: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/microcms_entries.json"
));

fn write_article(root: &Path, rel_dir: &str, front: &str, body: &str) {
    let dir = root.join(rel_dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("index.md"), format!("---\n{front}---\n{body}")).unwrap();
}

/// Submodule with two valid articles and one missing its slug.
fn submodule() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let articles = tmp.path().join("articles");
    write_article(
        &articles,
        "2024/fs-feb",
        "title: February on disk\nslug: fs-feb\ndescription: d\ndate: 2024-02-20\n",
        "![cover](./cover.png)\n",
    );
    write_article(
        &articles,
        "2023/shared",
        "title: Shared slug (disk copy)\nslug: shared-slug\ndescription: d\ndate: 2023-10-05\n",
        "disk body\n",
    );
    write_article(
        &articles,
        "2024/broken",
        "title: No slug here\ndescription: d\ndate: 2024-05-01\n",
        "ignored\n",
    );
    tmp
}

fn markdown_adapter(tmp: &TempDir) -> MarkdownAdapter {
    MarkdownAdapter::new(
        tmp.path().join("articles"),
        ImageResolver::new(tmp.path(), "/assets/posts"),
    )
}

fn aggregator(tmp: &TempDir) -> Aggregator {
    Aggregator::new(
        Arc::new(ContentfulAdapter::from_fixture_str(CONTENTFUL_JSON)),
        Arc::new(MicroCmsAdapter::from_fixture_str(MICROCMS_JSON)),
        Arc::new(markdown_adapter(tmp)),
    )
}

/// Always fails, counting how often it was asked.
struct FailingSource {
    source: Source,
    calls: AtomicUsize,
}

impl FailingSource {
    fn new(source: Source) -> Self {
        Self {
            source,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SourceAdapter for FailingSource {
    async fn fetch_all(&self) -> Result<Vec<Entry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("connection refused"))
    }

    fn source(&self) -> Source {
        self.source
    }
}

#[async_trait]
impl DetailSource for FailingSource {
    async fn find_by_slug(&self, _slug: &str) -> Lookup<Entry> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Lookup::not_found()
    }
}

fn ids(entries: &[AggregatedEntry]) -> Vec<&str> {
    entries.iter().map(|a| a.entry.id.as_str()).collect()
}

fn entry(id: &str, published_at: &str) -> Entry {
    Entry {
        id: id.to_string(),
        title: id.to_string(),
        description: None,
        body: None,
        published_at: published_at.to_string(),
        slug: Some(id.to_string()),
        url: None,
        media: None,
        header_image_url: None,
        article_path: None,
    }
}

#[tokio::test]
async fn timeline_merges_all_sources_newest_first() {
    let tmp = submodule();
    let all = aggregator(&tmp).list().await;

    assert_eq!(
        ids(&all),
        vec!["ctf-mar", "fs-feb", "mc-feb", "ctf-jan", "mc-dec", "ctf-shared", "shared-slug"]
    );
    let sources: Vec<Source> = all.iter().map(|a| a.source).collect();
    assert_eq!(
        sources,
        vec![
            Source::ApiPrimary,
            Source::Filesystem,
            Source::ApiSecondary,
            Source::ApiPrimary,
            Source::ApiSecondary,
            Source::ApiPrimary,
            Source::Filesystem,
        ]
    );
}

#[tokio::test]
async fn timeline_is_deterministic_for_identical_inputs() {
    let tmp = submodule();
    let agg = aggregator(&tmp);
    let first = agg.list().await;
    let second = agg.list().await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn failing_source_contributes_nothing_and_others_survive() {
    let tmp = submodule();
    let agg = Aggregator::new(
        Arc::new(FailingSource::new(Source::ApiPrimary)),
        Arc::new(MicroCmsAdapter::from_fixture_str(MICROCMS_JSON)),
        Arc::new(markdown_adapter(&tmp)),
    );
    let all = agg.list().await;
    assert_eq!(ids(&all), vec!["fs-feb", "mc-feb", "mc-dec", "shared-slug"]);
    assert!(all.iter().all(|a| a.source != Source::ApiPrimary));
}

#[tokio::test]
async fn failing_secondary_feed_leaves_other_sources_intact() {
    let tmp = submodule();
    let agg = Aggregator::new(
        Arc::new(ContentfulAdapter::from_fixture_str(CONTENTFUL_JSON)),
        Arc::new(FailingSource::new(Source::ApiSecondary)),
        Arc::new(markdown_adapter(&tmp)),
    );
    let all = agg.list().await;
    assert_eq!(
        ids(&all),
        vec!["ctf-mar", "fs-feb", "ctf-jan", "ctf-shared", "shared-slug"]
    );
}

#[tokio::test]
async fn all_sources_failing_yields_empty_timeline() {
    let agg = Aggregator::new(
        Arc::new(FailingSource::new(Source::ApiPrimary)),
        Arc::new(FailingSource::new(Source::ApiSecondary)),
        Arc::new(FailingSource::new(Source::Filesystem)),
    );
    assert!(agg.list().await.is_empty());
    assert!(agg.detail_slugs().await.is_empty());
}

#[tokio::test]
async fn projection_strips_provenance() {
    let tmp = submodule();
    let agg = aggregator(&tmp);
    let entries = agg.list_entries().await;
    assert_eq!(entries.len(), 7);

    let json = serde_json::to_value(&entries).unwrap();
    for item in json.as_array().unwrap() {
        assert!(item.get("source").is_none(), "source must not leak: {item}");
    }
    // Link-only entries keep their external url and media label.
    let zenn = entries.iter().find(|e| e.id == "mc-feb").unwrap();
    assert_eq!(zenn.url.as_deref(), Some("https://zenn.dev/andmohiko/articles/feb"));
    assert_eq!(zenn.media.as_deref(), Some("zenn"));
    assert!(zenn.slug.is_none());
}

#[test]
fn unparseable_dates_sort_last_and_ties_keep_input_order() {
    let mut entries = vec![
        AggregatedEntry::new(entry("garbage", "not a date"), Source::ApiPrimary),
        AggregatedEntry::new(entry("old", "2020-01-01"), Source::Filesystem),
        AggregatedEntry::new(entry("tie-a", "2022-06-01T00:00:00Z"), Source::ApiPrimary),
        AggregatedEntry::new(entry("tie-b", "2022-06-01T00:00:00Z"), Source::Filesystem),
        AggregatedEntry::new(entry("empty", ""), Source::ApiSecondary),
    ];
    sort_timeline(&mut entries);
    assert_eq!(ids(&entries), vec!["tie-a", "tie-b", "old", "garbage", "empty"]);

    let projected = project(entries);
    assert_eq!(projected[0].id, "tie-a");
}

#[tokio::test]
async fn slug_lookup_prefers_filesystem() {
    let tmp = submodule();
    let found = aggregator(&tmp).find_by_slug("shared-slug").await;
    let blog = found.item.expect("shared slug exists");
    assert_eq!(blog.title, "Shared slug (disk copy)");
    // Neighbours are computed inside the filesystem timeline only.
    assert_eq!(found.previous_slug.as_deref(), Some("fs-feb"));
    assert_eq!(found.next_slug, None);
}

#[tokio::test]
async fn slug_lookup_falls_back_to_cms_with_cms_neighbours() {
    let tmp = submodule();
    let found = aggregator(&tmp).find_by_slug("cms-january").await;
    let blog = found.item.expect("cms slug exists");
    assert_eq!(blog.id, "ctf-jan");
    assert_eq!(
        blog.header_image_url.as_deref(),
        Some("//images.ctfassets.net/space/jan.png")
    );
    assert_eq!(found.previous_slug.as_deref(), Some("cms-march"));
    assert_eq!(found.next_slug.as_deref(), Some("shared-slug"));
}

#[tokio::test]
async fn newest_and_oldest_have_open_ends() {
    let tmp = submodule();
    let agg = aggregator(&tmp);

    let newest = agg.find_by_slug("cms-march").await;
    assert!(newest.is_found());
    assert_eq!(newest.previous_slug, None);
    assert_eq!(newest.next_slug.as_deref(), Some("cms-january"));

    let fs_newest = agg.find_by_slug("fs-feb").await;
    assert_eq!(fs_newest.previous_slug, None);
    assert_eq!(fs_newest.next_slug.as_deref(), Some("shared-slug"));
}

#[tokio::test]
async fn unknown_slug_is_not_found_and_secondary_is_never_queried() {
    let tmp = submodule();
    let secondary = Arc::new(FailingSource::new(Source::ApiSecondary));
    let agg = Aggregator::new(
        Arc::new(ContentfulAdapter::from_fixture_str(CONTENTFUL_JSON)),
        secondary.clone(),
        Arc::new(markdown_adapter(&tmp)),
    );

    let missing = agg.find_by_slug("does-not-exist").await;
    assert_eq!(missing, Lookup::not_found());
    assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn detail_slugs_skip_link_entries_and_dedupe() {
    let tmp = submodule();
    let slugs = aggregator(&tmp).detail_slugs().await;
    assert_eq!(
        slugs,
        vec!["cms-march", "fs-feb", "cms-january", "shared-slug"]
    );
}
