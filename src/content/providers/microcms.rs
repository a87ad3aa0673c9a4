// src/content/providers/microcms.rs
//! Secondary-feed adapter (microCMS). Link posts have no detail page.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::config::MicroCmsConfig;
use crate::content::types::{Entry, Source, SourceAdapter};

const PAGE_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    contents: Vec<T>,
    #[serde(default, rename = "totalCount")]
    total_count: u64,
}

/// A link post pointing at an article published elsewhere.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkRecord {
    id: String,
    #[serde(default)]
    title: String,
    link: Option<String>,
    media: Option<String>,
    #[serde(default)]
    publish_at: String,
}

impl From<LinkRecord> for Entry {
    fn from(r: LinkRecord) -> Self {
        Entry {
            id: r.id,
            title: r.title,
            description: None,
            body: None,
            published_at: r.publish_at,
            slug: None,
            url: r.link,
            media: r.media,
            header_image_url: None,
            article_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// Portfolio work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub publish_at: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub thumbnail: Option<Thumbnail>,
}

pub struct MicroCmsAdapter {
    mode: Mode,
}

enum Mode {
    Fixture {
        entries: String,
        works: Option<String>,
    },
    Http {
        client: reqwest::Client,
        cfg: MicroCmsConfig,
    },
}

impl MicroCmsAdapter {
    pub fn from_fixture_str(entries: &str) -> Self {
        Self {
            mode: Mode::Fixture {
                entries: entries.to_string(),
                works: None,
            },
        }
    }

    pub fn with_works_fixture(mut self, works: &str) -> Self {
        if let Mode::Fixture { works: w, .. } = &mut self.mode {
            *w = Some(works.to_string());
        }
        self
    }

    pub fn from_config(client: reqwest::Client, cfg: MicroCmsConfig) -> Self {
        Self {
            mode: Mode::Http { client, cfg },
        }
    }

    fn endpoint_url(cfg: &MicroCmsConfig, endpoint: &str) -> String {
        let base = match &cfg.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.microcms.io", cfg.service_domain),
        };
        format!("{base}/api/v1/{endpoint}")
    }

    async fn get_list<T: serde::de::DeserializeOwned>(
        client: &reqwest::Client,
        cfg: &MicroCmsConfig,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<ListResponse<T>> {
        let resp = client
            .get(Self::endpoint_url(cfg, endpoint))
            .header("X-MICROCMS-API-KEY", &cfg.api_key)
            .query(query)
            .send()
            .await
            .with_context(|| format!("microcms http get({endpoint})"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("microcms {endpoint} responded {status}"));
        }
        resp.json::<ListResponse<T>>()
            .await
            .with_context(|| format!("parsing microcms {endpoint} json"))
    }

    async fn fetch_links_http(client: &reqwest::Client, cfg: &MicroCmsConfig) -> Result<Vec<LinkRecord>> {
        let mut out: Vec<LinkRecord> = Vec::new();
        loop {
            let page: ListResponse<LinkRecord> = Self::get_list(
                client,
                cfg,
                &cfg.entries_endpoint,
                &[
                    ("limit", PAGE_LIMIT.to_string()),
                    ("offset", out.len().to_string()),
                ],
            )
            .await?;
            let got = page.contents.len();
            out.extend(page.contents);
            if got == 0 || out.len() as u64 >= page.total_count {
                break;
            }
        }
        Ok(out)
    }

    /// Works, newest `startAt` first.
    pub async fn list_works(&self) -> Result<Vec<Work>> {
        match &self.mode {
            Mode::Fixture { works, .. } => {
                let Some(s) = works else {
                    return Ok(Vec::new());
                };
                let page: ListResponse<Work> =
                    serde_json::from_str(s).context("parsing microcms works json")?;
                Ok(page.contents)
            }
            Mode::Http { client, cfg } => {
                let page: ListResponse<Work> = Self::get_list(
                    client,
                    cfg,
                    &cfg.works_endpoint,
                    &[
                        ("orders", "-startAt".to_string()),
                        ("limit", cfg.works_limit.to_string()),
                    ],
                )
                .await?;
                Ok(page.contents)
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for MicroCmsAdapter {
    async fn fetch_all(&self) -> Result<Vec<Entry>> {
        let records = match &self.mode {
            Mode::Fixture { entries, .. } => {
                let page: ListResponse<LinkRecord> =
                    serde_json::from_str(entries).context("parsing microcms entries json")?;
                page.contents
            }
            Mode::Http { client, cfg } => Self::fetch_links_http(client, cfg).await?,
        };
        counter!("content_entries_total", "source" => "api-secondary")
            .increment(records.len() as u64);
        Ok(records.into_iter().map(Entry::from).collect())
    }

    fn source(&self) -> Source {
        Source::ApiSecondary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn link_records_become_link_only_entries() {
        let json = r#"{"contents":[{"id":"m1","title":"On Zenn","link":"https://zenn.dev/x","media":"Zenn","publishAt":"2024-02-02T00:00:00.000Z"}],"totalCount":1}"#;
        let entries = MicroCmsAdapter::from_fixture_str(json).fetch_all().await.unwrap();
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.url.as_deref(), Some("https://zenn.dev/x"));
        assert_eq!(e.media.as_deref(), Some("Zenn"));
        assert!(e.slug.is_none() && e.body.is_none() && e.description.is_none());
        assert!(!e.has_detail_page());
    }

    #[test]
    fn endpoint_defaults_to_service_subdomain() {
        let mut cfg = MicroCmsConfig {
            service_domain: "andmohiko".into(),
            ..MicroCmsConfig::default()
        };
        assert_eq!(
            MicroCmsAdapter::endpoint_url(&cfg, "entries"),
            "https://andmohiko.microcms.io/api/v1/entries"
        );
        cfg.base_url = Some("http://127.0.0.1:9000/".into());
        assert_eq!(
            MicroCmsAdapter::endpoint_url(&cfg, "works"),
            "http://127.0.0.1:9000/api/v1/works"
        );
    }

    #[tokio::test]
    async fn works_without_fixture_are_empty() {
        let a = MicroCmsAdapter::from_fixture_str(r#"{"contents":[]}"#);
        assert!(a.list_works().await.unwrap().is_empty());
    }
}
