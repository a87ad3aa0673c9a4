// src/config/mod.rs
//! Site configuration: CMS credentials, content layout and cache engine settings.
//!
//! Lookup order for the config file:
//! 1) `$SITE_CONFIG_PATH`
//! 2) `config/site.toml`
//! 3) `config/site.json`
//! 4) built-in defaults
//!
//! Secret fields set to `"ENV"` are resolved from the environment.

pub mod cli;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cache::offline::OfflineCopy;

pub const ENV_CONFIG_PATH: &str = "SITE_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/site.toml";
pub const DEFAULT_JSON_PATH: &str = "config/site.json";

const ENV_MARKER: &str = "ENV";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub contentful: ContentfulConfig,
    pub microcms: MicroCmsConfig,
    pub content: ContentConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentfulConfig {
    pub space_id: String,
    pub access_token: String,
    /// Content type id of blog posts.
    pub content_type: String,
    pub environment: String,
    pub page_size: u32,
    pub base_url: String,
}

impl Default for ContentfulConfig {
    fn default() -> Self {
        Self {
            space_id: ENV_MARKER.to_string(),
            access_token: ENV_MARKER.to_string(),
            content_type: "blogPost".to_string(),
            environment: "master".to_string(),
            page_size: 100,
            base_url: "https://cdn.contentful.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MicroCmsConfig {
    pub service_domain: String,
    pub api_key: String,
    pub entries_endpoint: String,
    pub works_endpoint: String,
    pub works_limit: u32,
    /// Overrides `https://{service_domain}.microcms.io`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for MicroCmsConfig {
    fn default() -> Self {
        Self {
            service_domain: ENV_MARKER.to_string(),
            api_key: ENV_MARKER.to_string(),
            entries_endpoint: "entries".to_string(),
            works_endpoint: "works".to_string(),
            works_limit: 100,
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Root of the markdown submodule checkout.
    pub submodule_dir: PathBuf,
    /// Directory holding articles, relative to `submodule_dir`.
    pub articles_dir: PathBuf,
    /// Public URL prefix the copied article images are served under.
    pub assets_prefix: String,
    pub public_dir: PathBuf,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            submodule_dir: PathBuf::from("src/contents/blogs"),
            articles_dir: PathBuf::from("articles"),
            assets_prefix: "/assets/posts".to_string(),
            public_dir: PathBuf::from("public"),
        }
    }
}

impl ContentConfig {
    pub fn articles_root(&self) -> PathBuf {
        self.submodule_dir.join(&self.articles_dir)
    }

    /// Where `copy-images` writes; must agree with `assets_prefix`.
    pub fn assets_dir(&self) -> PathBuf {
        let rel = self.assets_prefix.trim_matches('/');
        self.public_dir.join(rel)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Version tag appended to every partition name.
    pub version: String,
    pub max_image_bytes: u64,
    pub precache: Vec<String>,
    pub offline: OfflineCopy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            version: "v1".to_string(),
            max_image_bytes: 50 * 1024 * 1024,
            precache: [
                "/",
                "/blogs",
                "/profile",
                "/manifest.json",
                "/favicon.ico",
                "/apple-touch-icon.png",
                "/icon512_maskable.png",
                "/icon512_rounded.png",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            offline: OfflineCopy::default(),
        }
    }
}

impl SiteConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading site config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing site config {}", path.display()))
    }

    /// Load using env var + fallbacks (see module docs).
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        for candidate in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        Ok(Self::default())
    }

    /// `--config-file` wins over the env/fallback chain.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(p) => Self::load_from(p),
            None => Self::load_default(),
        }
    }

    /// Replace `"ENV"` markers with values from the process environment.
    ///
    /// Called lazily by the CMS adapters so that commands which never touch
    /// a CMS (e.g. `copy-images`) run without credentials.
    pub fn resolve_contentful_secrets(&self) -> Result<ContentfulConfig> {
        let mut c = self.contentful.clone();
        c.space_id = resolve_secret(&c.space_id, "CTF_SPACE_ID")?;
        c.access_token = resolve_secret(&c.access_token, "CTF_CDA_ACCESS_TOKEN")?;
        Ok(c)
    }

    pub fn resolve_microcms_secrets(&self) -> Result<MicroCmsConfig> {
        let mut m = self.microcms.clone();
        m.service_domain = resolve_secret(&m.service_domain, "MICROCMS_SERVICE_DOMAIN")?;
        m.api_key = resolve_secret(&m.api_key, "MICROCMS_API_KEY")?;
        Ok(m)
    }
}

fn resolve_secret(value: &str, var: &str) -> Result<String> {
    if value.trim().eq_ignore_ascii_case(ENV_MARKER) {
        std::env::var(var).map_err(|_| anyhow!("Missing {var} env var"))
    } else {
        Ok(value.to_string())
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<SiteConfig> {
    // JSON documents always open with a brace; anything else is treated as TOML.
    let looks_json = s.trim_start().starts_with('{');
    if hint_ext == "json" || (hint_ext != "toml" && looks_json) {
        return serde_json::from_str(s).context("invalid JSON site config");
    }
    let cfg: SiteConfig = toml::from_str(s).context("invalid TOML site config")?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn partial_toml_keeps_defaults() {
        let toml = r#"
[content]
assets_prefix = "/static/posts/"

[cache]
version = "v7"
max_image_bytes = 1024
"#;
        let cfg = parse_config(toml, "toml").unwrap();
        assert_eq!(cfg.cache.version, "v7");
        assert_eq!(cfg.cache.max_image_bytes, 1024);
        assert_eq!(cfg.cache.precache.len(), 8);
        assert_eq!(cfg.content.submodule_dir, PathBuf::from("src/contents/blogs"));
        assert_eq!(cfg.content.assets_dir(), PathBuf::from("public/static/posts"));
        assert_eq!(cfg.contentful.content_type, "blogPost");
    }

    #[test]
    fn json_is_sniffed_without_extension() {
        let json = r#"{"microcms": {"service_domain": "demo", "api_key": "k"}}"#;
        let cfg = parse_config(json, "").unwrap();
        assert_eq!(cfg.microcms.service_domain, "demo");
        assert_eq!(cfg.microcms.works_limit, 100);
    }

    #[serial_test::serial]
    #[test]
    fn env_marker_resolves_from_environment() {
        let cfg = SiteConfig::default();
        env::set_var("MICROCMS_SERVICE_DOMAIN", "andmohiko");
        env::set_var("MICROCMS_API_KEY", "secret");
        let m = cfg.resolve_microcms_secrets().unwrap();
        assert_eq!(m.service_domain, "andmohiko");
        assert_eq!(m.api_key, "secret");

        env::remove_var("MICROCMS_API_KEY");
        assert!(cfg.resolve_microcms_secrets().is_err());
        env::remove_var("MICROCMS_SERVICE_DOMAIN");
    }

    #[test]
    fn literal_secrets_are_kept() {
        let mut cfg = SiteConfig::default();
        cfg.contentful.space_id = "space".into();
        cfg.contentful.access_token = "token".into();
        let c = cfg.resolve_contentful_secrets().unwrap();
        assert_eq!(c.space_id, "space");
        assert_eq!(c.access_token, "token");
    }
}
