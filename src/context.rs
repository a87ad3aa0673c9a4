// src/context.rs
//! Everything built once at startup and handed to commands and handlers.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SiteConfig;
use crate::content::providers::contentful::ContentfulAdapter;
use crate::content::providers::markdown::MarkdownAdapter;
use crate::content::providers::microcms::{MicroCmsAdapter, Work};
use crate::content::types::{DetailSource, Entry, Lookup, Source, SourceAdapter};
use crate::content::Aggregator;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct SiteContext {
    pub config: Arc<SiteConfig>,
    pub http: reqwest::Client,
    aggregator: Aggregator,
    works: Option<Arc<MicroCmsAdapter>>,
}

impl SiteContext {
    /// Build the shared HTTP client and all three adapters.
    ///
    /// A CMS whose credentials cannot be resolved is replaced by a source that
    /// always fails, so it degrades to an empty contribution instead of
    /// aborting startup.
    pub fn new(config: SiteConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("portfolio-content/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let primary: Arc<dyn DetailSource> = match config.resolve_contentful_secrets() {
            Ok(cfg) => Arc::new(ContentfulAdapter::from_config(http.clone(), cfg)),
            Err(e) => {
                tracing::warn!(target: "content", error = %e, "contentful disabled");
                Arc::new(Unavailable::new(Source::ApiPrimary, e.to_string()))
            }
        };

        let works = match config.resolve_microcms_secrets() {
            Ok(cfg) => Some(Arc::new(MicroCmsAdapter::from_config(http.clone(), cfg))),
            Err(e) => {
                tracing::warn!(target: "content", error = %e, "microcms disabled");
                None
            }
        };
        let secondary: Arc<dyn SourceAdapter> = match &works {
            Some(adapter) => Arc::clone(adapter) as Arc<dyn SourceAdapter>,
            None => Arc::new(Unavailable::new(
                Source::ApiSecondary,
                "microcms credentials missing".to_string(),
            )),
        };

        let filesystem: Arc<dyn DetailSource> = Arc::new(MarkdownAdapter::from_config(&config.content));

        Ok(Self {
            config: Arc::new(config),
            http,
            aggregator: Aggregator::new(primary, secondary, filesystem),
            works,
        })
    }

    /// Assemble a context from pre-built parts; used by tests and fixtures.
    pub fn from_parts(
        config: SiteConfig,
        aggregator: Aggregator,
        works: Option<Arc<MicroCmsAdapter>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            http: reqwest::Client::new(),
            aggregator,
            works,
        }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Works list. Errors when the secondary CMS is not configured.
    pub async fn works(&self) -> Result<Vec<Work>> {
        match &self.works {
            Some(adapter) => adapter.list_works().await,
            None => Err(anyhow!("microcms is not configured")),
        }
    }
}

/// Stand-in for a source that could not be constructed.
struct Unavailable {
    source: Source,
    reason: String,
}

impl Unavailable {
    fn new(source: Source, reason: String) -> Self {
        Self { source, reason }
    }
}

#[async_trait]
impl SourceAdapter for Unavailable {
    async fn fetch_all(&self) -> Result<Vec<Entry>> {
        Err(anyhow!("{} unavailable: {}", self.source, self.reason))
    }

    fn source(&self) -> Source {
        self.source
    }
}

#[async_trait]
impl DetailSource for Unavailable {
    async fn find_by_slug(&self, slug: &str) -> Lookup<Entry> {
        tracing::debug!(target: "content", source = %self.source, slug, "lookup on unavailable source");
        Lookup::not_found()
    }
}
