// src/cache/fetch.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use http::HeaderMap;

use super::request::{CacheRequest, CacheResponse};

/// The network side of the engine. `Err` means the request never produced a
/// response (offline, DNS, reset); HTTP error statuses are `Ok`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, req: &CacheRequest) -> Result<CacheResponse>;
}

#[derive(Clone, Default)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, req: &CacheRequest) -> Result<CacheResponse> {
        let resp = self
            .client
            .request(req.method.clone(), req.url.clone())
            .headers(req.headers.clone())
            .send()
            .await
            .with_context(|| format!("fetch {}", req.url))?;

        let status = resp.status();
        let mut headers = HeaderMap::new();
        for (k, v) in resp.headers() {
            headers.append(k.clone(), v.clone());
        }
        let body = resp
            .bytes()
            .await
            .with_context(|| format!("reading body of {}", req.url))?;
        Ok(CacheResponse {
            status,
            headers,
            body,
        })
    }
}
