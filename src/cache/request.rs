// src/cache/request.rs
//! Request/response values passed through the cache engine.

use anyhow::{Context, Result};
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use url::Url;

#[derive(Debug, Clone)]
pub struct CacheRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

impl CacheRequest {
    pub fn get(url: &str) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("invalid request url {url}"))?;
        Ok(Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
        })
    }

    pub fn with_header(mut self, name: HeaderName, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    pub fn accepts_html(&self) -> bool {
        self.headers
            .get(ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("text/html"))
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Partitions are keyed by URL without fragment.
    pub fn cache_key(&self) -> String {
        cache_key_for(&self.url)
    }

    /// Only GET responses may be written to a partition.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }
}

pub fn cache_key_for(url: &Url) -> String {
    let mut u = url.clone();
    u.set_fragment(None);
    u.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CacheResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    pub fn with_content_type(mut self, value: &'static str) -> Self {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(value));
        self
    }

    /// Same meaning as `Response.ok` in the fetch API: 2xx.
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn size(&self) -> u64 {
        self.body.len() as u64
    }
}
