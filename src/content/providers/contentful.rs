// src/content/providers/contentful.rs
//! Structured-CMS adapter (Contentful Content Delivery API).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;
use serde_json::Value;

use crate::config::ContentfulConfig;
use crate::content::dates;
use crate::content::navigation;
use crate::content::types::{DetailSource, Entry, Lookup, Source, SourceAdapter};

/// Newest first; `sys.id` fixes the order of entries sharing a date.
const ORDER_NEWEST_FIRST: &str = "-fields.publishedAt,sys.id";

#[derive(Debug, Deserialize)]
struct EntriesPage {
    #[serde(default)]
    items: Vec<Item>,
    #[serde(default)]
    includes: Includes,
    #[serde(default)]
    total: u64,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(rename = "Asset", default)]
    asset: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Item {
    sys: Sys,
    #[serde(default)]
    fields: Fields,
}

#[derive(Debug, Deserialize)]
struct Sys {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct Fields {
    #[serde(default)]
    title: String,
    slug: Option<String>,
    description: Option<String>,
    body: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    /// Either a resolved asset (`fields.file.url`) or a link (`sys.id`).
    #[serde(rename = "headerImage")]
    header_image: Option<Value>,
}

impl EntriesPage {
    fn into_entries(self) -> Vec<Entry> {
        let assets = self.includes.asset;
        self.items
            .into_iter()
            .map(|it| {
                let header_image_url = it
                    .fields
                    .header_image
                    .as_ref()
                    .and_then(|v| resolve_asset_url(v, &assets));
                Entry {
                    id: it.sys.id,
                    title: it.fields.title,
                    description: it.fields.description,
                    body: it.fields.body,
                    published_at: it.fields.published_at.unwrap_or_default(),
                    slug: it.fields.slug,
                    url: None,
                    media: None,
                    header_image_url,
                    article_path: None,
                }
            })
            .collect()
    }
}

fn resolve_asset_url(image: &Value, assets: &[Value]) -> Option<String> {
    if let Some(url) = image.pointer("/fields/file/url").and_then(Value::as_str) {
        return Some(url.to_string());
    }
    let id = image.pointer("/sys/id").and_then(Value::as_str)?;
    assets
        .iter()
        .find(|a| a.pointer("/sys/id").and_then(Value::as_str) == Some(id))
        .and_then(|a| a.pointer("/fields/file/url"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn parse_page(s: &str) -> Result<EntriesPage> {
    serde_json::from_str(s).context("parsing contentful entries json")
}

/// Result of the direct slug query, before any fallback.
enum SlugQuery {
    Found(Lookup<Entry>),
    Missing,
    /// The backing store cannot filter; use the full ordered list.
    Unsupported,
}

pub struct ContentfulAdapter {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        client: reqwest::Client,
        cfg: ContentfulConfig,
    },
}

impl ContentfulAdapter {
    /// Serve a recorded `entries` response instead of calling the API.
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_config(client: reqwest::Client, cfg: ContentfulConfig) -> Self {
        Self {
            mode: Mode::Http { client, cfg },
        }
    }

    fn entries_url(cfg: &ContentfulConfig) -> String {
        format!(
            "{}/spaces/{}/environments/{}/entries",
            cfg.base_url.trim_end_matches('/'),
            cfg.space_id,
            cfg.environment
        )
    }

    async fn get_page(
        client: &reqwest::Client,
        cfg: &ContentfulConfig,
        query: &[(&str, String)],
    ) -> Result<EntriesPage> {
        let resp = client
            .get(Self::entries_url(cfg))
            .bearer_auth(&cfg.access_token)
            .query(&[("content_type", cfg.content_type.as_str())])
            .query(query)
            .send()
            .await
            .context("contentful http get()")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("contentful responded {status}"));
        }
        let body = resp.text().await.context("contentful http .text()")?;
        parse_page(&body)
    }

    /// Paginate through every entry, newest first.
    async fn fetch_all_http(client: &reqwest::Client, cfg: &ContentfulConfig) -> Result<Vec<Entry>> {
        let page_size = cfg.page_size.max(1) as u64;
        let mut out = Vec::new();
        let mut skip = 0u64;
        loop {
            let page = Self::get_page(
                client,
                cfg,
                &[
                    ("order", ORDER_NEWEST_FIRST.to_string()),
                    ("limit", page_size.to_string()),
                    ("skip", skip.to_string()),
                ],
            )
            .await?;
            let total = page.total;
            let got = page.items.len() as u64;
            out.extend(page.into_entries());
            skip += got;
            if got == 0 || skip >= total {
                break;
            }
        }
        Ok(out)
    }

    /// Direct `fields.slug` query for the entry itself. Neighbours are the
    /// adjacent positions in the ordered list, so entries published on the
    /// same date still link to each other.
    async fn query_by_slug(&self, slug: &str) -> Result<SlugQuery> {
        let (client, cfg) = match &self.mode {
            Mode::Fixture(_) => return Ok(SlugQuery::Unsupported),
            Mode::Http { client, cfg } => (client, cfg),
        };

        let page = Self::get_page(
            client,
            cfg,
            &[("fields.slug", slug.to_string()), ("limit", "1".to_string())],
        )
        .await?;
        let Some(entry) = page.into_entries().into_iter().next() else {
            return Ok(SlugQuery::Missing);
        };

        let ordered = self.fetch_all().await?;
        let mut lookup = navigation::lookup_in(ordered, slug);
        if !lookup.is_found() {
            tracing::debug!(target: "content", slug, "slug missing from ordered list; no neighbours");
        }
        lookup.item = Some(entry);
        Ok(SlugQuery::Found(lookup))
    }
}

#[async_trait]
impl SourceAdapter for ContentfulAdapter {
    async fn fetch_all(&self) -> Result<Vec<Entry>> {
        let t0 = std::time::Instant::now();
        let mut entries = match &self.mode {
            Mode::Fixture(s) => parse_page(s)?.into_entries(),
            Mode::Http { client, cfg } => Self::fetch_all_http(client, cfg).await?,
        };
        // The API already orders; a stable re-sort keeps fixtures consistent.
        entries.sort_by(|a, b| dates::newest_first(&a.published_at, &b.published_at));

        histogram!("content_parse_ms", "source" => "api-primary")
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("content_entries_total", "source" => "api-primary")
            .increment(entries.len() as u64);
        Ok(entries)
    }

    fn source(&self) -> Source {
        Source::ApiPrimary
    }
}

#[async_trait]
impl DetailSource for ContentfulAdapter {
    async fn find_by_slug(&self, slug: &str) -> Lookup<Entry> {
        match self.query_by_slug(slug).await {
            Ok(SlugQuery::Found(lookup)) => lookup,
            Ok(SlugQuery::Missing) => Lookup::not_found(),
            Ok(SlugQuery::Unsupported) => match self.fetch_all().await {
                Ok(all) => navigation::lookup_in(all, slug),
                Err(e) => {
                    tracing::warn!(target: "content", error = ?e, slug, "contentful list for slug lookup failed");
                    Lookup::not_found()
                }
            },
            Err(e) => {
                tracing::warn!(target: "content", error = ?e, slug, "contentful slug query failed");
                Lookup::not_found()
            }
        }
    }
}
