// src/cache/policy.rs
//! The four per-class caching strategies.

use metrics::counter;
use std::sync::Arc;

use super::classify::TrafficClass;
use super::eviction;
use super::fetch::Fetcher;
use super::offline::{self, OfflineCopy};
use super::request::{CacheRequest, CacheResponse};
use super::storage::CacheStorage;

/// Version-tagged partition names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNames {
    pub static_assets: String,
    pub pages: String,
    pub images: String,
    pub api: String,
}

impl PartitionNames {
    pub fn for_version(version: &str) -> Self {
        let name = |c: TrafficClass| format!("{}-{}", c.partition_base(), version);
        Self {
            static_assets: name(TrafficClass::Static),
            pages: name(TrafficClass::Page),
            images: name(TrafficClass::Image),
            api: name(TrafficClass::Api),
        }
    }

    pub fn for_class(&self, class: TrafficClass) -> &str {
        match class {
            TrafficClass::Static => &self.static_assets,
            TrafficClass::Image => &self.images,
            TrafficClass::Page => &self.pages,
            TrafficClass::Api => &self.api,
        }
    }

    pub fn all(&self) -> [&str; 4] {
        [&self.static_assets, &self.pages, &self.images, &self.api]
    }
}

/// Everything a strategy needs; shared with background revalidation tasks.
pub(crate) struct Shared {
    pub storage: Arc<dyn CacheStorage>,
    pub fetcher: Arc<dyn Fetcher>,
    pub names: PartitionNames,
    pub max_image_bytes: u64,
    pub copy: OfflineCopy,
}

impl Shared {
    /// Best-effort write; failures are logged and otherwise ignored.
    pub async fn store(&self, partition: &str, req: &CacheRequest, resp: &CacheResponse) {
        if !req.is_cacheable() {
            return;
        }
        if let Err(e) = self.storage.put(partition, &req.cache_key(), resp.clone()).await {
            tracing::warn!(target: "cache", error = ?e, partition, url = %req.url, "cache write failed");
        }
    }

    async fn cached(&self, class: TrafficClass, req: &CacheRequest) -> anyhow::Result<Option<CacheResponse>> {
        if !req.is_cacheable() {
            return Ok(None);
        }
        let hit = self
            .storage
            .lookup(self.names.for_class(class), &req.cache_key())
            .await?;
        let label = class.as_str();
        if hit.is_some() {
            counter!("cache_hits_total", "class" => label).increment(1);
        } else {
            counter!("cache_misses_total", "class" => label).increment(1);
        }
        Ok(hit)
    }
}

fn offline_fallback(class: TrafficClass) {
    counter!("cache_offline_fallbacks_total", "class" => class.as_str()).increment(1);
}

/// Static assets: cache first, network on miss, 503 text on total failure.
pub(crate) async fn cache_first(shared: &Shared, req: &CacheRequest) -> CacheResponse {
    let class = TrafficClass::Static;
    let partition = shared.names.for_class(class);
    let result: anyhow::Result<CacheResponse> = async {
        if let Some(hit) = shared.cached(class, req).await? {
            return Ok(hit);
        }
        let resp = shared.fetcher.fetch(req).await?;
        if resp.is_ok() {
            shared.store(partition, req, &resp).await;
        }
        Ok(resp)
    }
    .await;

    result.unwrap_or_else(|e| {
        tracing::error!(target: "cache", error = ?e, url = %req.url, "static asset fetch failed");
        offline_fallback(class);
        offline::static_unavailable(&shared.copy)
    })
}

/// Images: cache first; prune the partition below the ceiling before
/// inserting a fresh response. Empty 503 on total failure.
pub(crate) async fn cache_first_bounded(shared: &Shared, req: &CacheRequest) -> CacheResponse {
    let class = TrafficClass::Image;
    let partition = shared.names.for_class(class);
    let result: anyhow::Result<CacheResponse> = async {
        if let Some(hit) = shared.cached(class, req).await? {
            return Ok(hit);
        }
        let resp = shared.fetcher.fetch(req).await?;
        if resp.is_ok() && req.is_cacheable() {
            if let Err(e) = eviction::make_room(
                shared.storage.as_ref(),
                partition,
                shared.max_image_bytes,
                resp.size(),
            )
            .await
            {
                tracing::warn!(target: "cache", error = ?e, partition, "image eviction failed");
            }
            shared.store(partition, req, &resp).await;
        }
        Ok(resp)
    }
    .await;

    result.unwrap_or_else(|e| {
        tracing::error!(target: "cache", error = ?e, url = %req.url, "image fetch failed");
        offline_fallback(class);
        offline::image_unavailable()
    })
}

/// Pages: stale-while-revalidate.
///
/// The refresh is always spawned. With a cached copy it is detached and its
/// outcome never reaches this response; the next navigation sees the update.
pub(crate) async fn stale_while_revalidate(shared: &Arc<Shared>, req: &CacheRequest) -> CacheResponse {
    let class = TrafficClass::Page;
    let cached = match shared.cached(class, req).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(target: "cache", error = ?e, url = %req.url, "page cache read failed");
            return offline::internal_error(&shared.copy);
        }
    };

    let refresh = {
        let shared = Arc::clone(shared);
        let req = req.clone();
        tokio::spawn(async move {
            match shared.fetcher.fetch(&req).await {
                Ok(resp) => {
                    if resp.is_ok() {
                        let partition = shared.names.for_class(TrafficClass::Page).to_string();
                        shared.store(&partition, &req, &resp).await;
                    }
                    Some(resp)
                }
                Err(e) => {
                    tracing::debug!(target: "cache", error = ?e, url = %req.url, "page revalidation failed");
                    None
                }
            }
        })
    };

    if let Some(hit) = cached {
        return hit;
    }

    match refresh.await {
        Ok(Some(resp)) => resp,
        Ok(None) => {
            offline_fallback(class);
            offline::offline_page(&shared.copy)
        }
        Err(e) => {
            tracing::error!(target: "cache", error = ?e, url = %req.url, "page fetch task failed");
            offline_fallback(class);
            offline::offline_page(&shared.copy)
        }
    }
}

/// API: network first, cached copy on failure, structured 503 otherwise.
pub(crate) async fn network_first(shared: &Shared, req: &CacheRequest) -> CacheResponse {
    let class = TrafficClass::Api;
    let partition = shared.names.for_class(class);
    match shared.fetcher.fetch(req).await {
        Ok(resp) => {
            if resp.is_ok() {
                shared.store(partition, req, &resp).await;
            }
            resp
        }
        Err(e) => {
            tracing::warn!(target: "cache", error = ?e, url = %req.url, "api fetch failed; trying cache");
            match shared.cached(class, req).await {
                Ok(Some(hit)) => hit,
                Ok(None) => {
                    offline_fallback(class);
                    offline::api_offline(&shared.copy)
                }
                Err(e) => {
                    tracing::error!(target: "cache", error = ?e, url = %req.url, "api cache read failed");
                    offline_fallback(class);
                    offline::api_offline(&shared.copy)
                }
            }
        }
    }
}
