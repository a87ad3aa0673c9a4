// src/cache/mod.rs
//! # Cache Engine
//! Request interception for the site's offline/PWA behaviour.
//!
//! Lifecycle: `install` pre-caches the static manifest, `activate` drops
//! partitions from older versions, then every same-origin request is routed
//! to one of four strategies by [`classify::classify`]. Control messages from
//! the page (`SKIP_WAITING`, `CACHE_UPDATE`) are handled by
//! [`CacheEngine::handle_message`].

pub mod classify;
pub mod eviction;
pub mod fetch;
pub mod offline;
pub mod policy;
pub mod request;
pub mod storage;

use anyhow::{anyhow, Context, Result};
use metrics::{describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use url::{Origin, Url};

use crate::config::CacheConfig;
use classify::TrafficClass;
use fetch::Fetcher;
use policy::{PartitionNames, Shared};
use request::{cache_key_for, CacheRequest, CacheResponse};
use storage::CacheStorage;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("cache_hits_total", "Requests answered from a partition.");
        describe_counter!("cache_misses_total", "Partition lookups that found nothing.");
        describe_counter!(
            "cache_evictions_total",
            "Image entries evicted to stay under the size ceiling."
        );
        describe_counter!(
            "cache_offline_fallbacks_total",
            "Synthetic offline/unavailable responses served."
        );
        describe_gauge!(
            "cache_image_ceiling_bytes",
            "Byte ceiling of the image partition for the running engine."
        );
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, install not run yet.
    Parsed,
    Installing,
    /// Installed; waiting for old clients to go away or `SKIP_WAITING`.
    Waiting,
    Activating,
    Active,
}

/// Messages posted by the application page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    SkipWaiting,
    CacheUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Activated,
    /// Already active (or not yet installed); nothing to do.
    NoOp,
    Updated(String),
    /// Refetch failed or returned a non-2xx status; cache untouched.
    NotUpdated(String),
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub cached: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub clients_claimed: bool,
}

pub struct CacheEngine {
    shared: Arc<Shared>,
    scope: Url,
    origin: Origin,
    precache: Vec<String>,
    state: Mutex<LifecycleState>,
}

impl CacheEngine {
    /// `scope` is the origin root the engine is registered against, e.g.
    /// `https://andmohiko.dev/`.
    pub fn new(
        cfg: &CacheConfig,
        scope: &str,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self> {
        ensure_metrics_described();
        let scope = Url::parse(scope).with_context(|| format!("invalid scope {scope}"))?;
        gauge!("cache_image_ceiling_bytes").set(cfg.max_image_bytes as f64);
        Ok(Self {
            shared: Arc::new(Shared {
                storage,
                fetcher,
                names: PartitionNames::for_version(&cfg.version),
                max_image_bytes: cfg.max_image_bytes,
                copy: cfg.offline.clone(),
            }),
            origin: scope.origin(),
            scope,
            precache: cfg.precache.clone(),
            state: Mutex::new(LifecycleState::Parsed),
        })
    }

    pub fn partition_names(&self) -> &PartitionNames {
        &self.shared.names
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_state(&self, s: LifecycleState) {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = s;
        tracing::info!(target: "cache", state = ?s, "lifecycle");
    }

    /// Open all partitions and pre-cache the static manifest.
    ///
    /// Each manifest path is cached independently; failures are reported and
    /// logged but never block the move to `Waiting`.
    pub async fn install(&self) -> InstallReport {
        self.set_state(LifecycleState::Installing);
        let mut report = InstallReport::default();

        for name in self.shared.names.all() {
            if let Err(e) = self.shared.storage.open(name).await {
                tracing::error!(target: "cache", error = ?e, partition = name, "opening partition failed");
            }
        }

        let partition = self.shared.names.static_assets.clone();
        for path in &self.precache {
            match self.precache_one(&partition, path).await {
                Ok(()) => report.cached.push(path.clone()),
                Err(e) => {
                    tracing::error!(target: "cache", error = ?e, path = %path, "pre-cache failed");
                    report.failed.push(path.clone());
                }
            }
        }

        self.set_state(LifecycleState::Waiting);
        report
    }

    async fn precache_one(&self, partition: &str, path: &str) -> Result<()> {
        let url = self.scope.join(path).with_context(|| format!("joining {path}"))?;
        let req = CacheRequest::get(url.as_str())?;
        let resp = self.shared.fetcher.fetch(&req).await?;
        if !resp.is_ok() {
            return Err(anyhow!("pre-cache {path} responded {}", resp.status));
        }
        self.shared
            .storage
            .put(partition, &req.cache_key(), resp)
            .await
    }

    /// Delete every partition that is not one of the current four, then take
    /// control of open clients.
    pub async fn activate(&self) -> Result<ActivateReport> {
        self.set_state(LifecycleState::Activating);
        let current = self.shared.names.all();
        let mut report = ActivateReport::default();

        for name in self.shared.storage.partitions().await? {
            if current.contains(&name.as_str()) {
                continue;
            }
            tracing::info!(target: "cache", partition = %name, "deleting stale partition");
            if self.shared.storage.delete_partition(&name).await? {
                report.deleted.push(name);
            }
        }

        report.clients_claimed = true;
        self.set_state(LifecycleState::Active);
        Ok(report)
    }

    /// Route one request. `None` means the request is not intercepted and
    /// should go to the network untouched.
    pub async fn handle_fetch(&self, req: &CacheRequest) -> Option<CacheResponse> {
        if self.state() != LifecycleState::Active {
            return None;
        }
        let class = classify::classify(req, &self.origin)?;
        let resp = match class {
            TrafficClass::Static => policy::cache_first(&self.shared, req).await,
            TrafficClass::Image => policy::cache_first_bounded(&self.shared, req).await,
            TrafficClass::Page => policy::stale_while_revalidate(&self.shared, req).await,
            TrafficClass::Api => policy::network_first(&self.shared, req).await,
        };
        Some(resp)
    }

    pub async fn handle_message(&self, msg: ControlMessage) -> MessageOutcome {
        match msg {
            ControlMessage::SkipWaiting => {
                if self.state() != LifecycleState::Waiting {
                    return MessageOutcome::NoOp;
                }
                match self.activate().await {
                    Ok(_) => MessageOutcome::Activated,
                    Err(e) => {
                        tracing::error!(target: "cache", error = ?e, "forced activation failed");
                        MessageOutcome::NoOp
                    }
                }
            }
            ControlMessage::CacheUpdate { url: None } => MessageOutcome::Ignored,
            ControlMessage::CacheUpdate { url: Some(url) } => self.refresh_page(&url).await,
        }
    }

    /// Parse a raw `postMessage` payload and handle it.
    pub async fn handle_message_json(&self, raw: &str) -> MessageOutcome {
        match serde_json::from_str::<ControlMessage>(raw) {
            Ok(msg) => self.handle_message(msg).await,
            Err(e) => {
                tracing::debug!(target: "cache", error = %e, "ignoring unknown message");
                MessageOutcome::Ignored
            }
        }
    }

    async fn refresh_page(&self, url: &str) -> MessageOutcome {
        let Ok(abs) = self.scope.join(url) else {
            tracing::warn!(target: "cache", url, "cache update with invalid url");
            return MessageOutcome::Ignored;
        };
        let req = match CacheRequest::get(abs.as_str()) {
            Ok(r) => r,
            Err(_) => return MessageOutcome::Ignored,
        };
        match self.shared.fetcher.fetch(&req).await {
            Ok(resp) if resp.is_ok() => {
                let key = cache_key_for(&abs);
                if let Err(e) = self.shared.storage.put(&self.shared.names.pages, &key, resp).await {
                    tracing::warn!(target: "cache", error = ?e, url = %abs, "cache update write failed");
                    return MessageOutcome::NotUpdated(key);
                }
                MessageOutcome::Updated(key)
            }
            Ok(resp) => {
                tracing::debug!(target: "cache", status = %resp.status, url = %abs, "cache update skipped");
                MessageOutcome::NotUpdated(cache_key_for(&abs))
            }
            Err(e) => {
                tracing::debug!(target: "cache", error = ?e, url = %abs, "cache update fetch failed");
                MessageOutcome::NotUpdated(cache_key_for(&abs))
            }
        }
    }
}
