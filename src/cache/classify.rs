// src/cache/classify.rs
//! Traffic classification: an ordered table of predicates, first match wins.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Origin;

use super::request::CacheRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficClass {
    Static,
    Image,
    Page,
    Api,
}

impl TrafficClass {
    pub const ALL: [TrafficClass; 4] = [
        TrafficClass::Static,
        TrafficClass::Image,
        TrafficClass::Page,
        TrafficClass::Api,
    ];

    /// Partition name before the version tag.
    pub fn partition_base(&self) -> &'static str {
        match self {
            TrafficClass::Static => "static-assets",
            TrafficClass::Image => "images",
            TrafficClass::Page => "pages",
            TrafficClass::Api => "api",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficClass::Static => "static",
            TrafficClass::Image => "image",
            TrafficClass::Page => "page",
            TrafficClass::Api => "api",
        }
    }
}

// Patterns are literals; failing to compile would be a programming error.
static RE_STATIC_EXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(js|css|woff|woff2|ttf|ico|json)$").expect("static ext regex"));
static RE_IMAGE_EXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(png|jpg|jpeg|gif|svg|webp)$").expect("image ext regex"));

const STATIC_PREFIX: &str = "/_next/static/";
const IMAGE_PREFIX: &str = "/images/";
const PAGE_PREFIXES: &[&str] = &["/blogs", "/profile"];
const API_PREFIX: &str = "/api/";

struct Route {
    class: TrafficClass,
    matches: fn(&CacheRequest) -> bool,
}

fn is_static_asset(req: &CacheRequest) -> bool {
    let p = req.path();
    RE_STATIC_EXT.is_match(p) || p.starts_with(STATIC_PREFIX)
}

fn is_image(req: &CacheRequest) -> bool {
    let p = req.path();
    RE_IMAGE_EXT.is_match(p) || p.starts_with(IMAGE_PREFIX)
}

fn is_page(req: &CacheRequest) -> bool {
    let p = req.path();
    p == "/" || PAGE_PREFIXES.iter().any(|pre| p.starts_with(pre)) || req.accepts_html()
}

fn is_api(req: &CacheRequest) -> bool {
    req.path().starts_with(API_PREFIX)
}

/// Precedence order matters: `/images/a.json` is a static asset, `/blogs/x.png` an image.
const ROUTES: &[Route] = &[
    Route {
        class: TrafficClass::Static,
        matches: is_static_asset,
    },
    Route {
        class: TrafficClass::Image,
        matches: is_image,
    },
    Route {
        class: TrafficClass::Page,
        matches: is_page,
    },
    Route {
        class: TrafficClass::Api,
        matches: is_api,
    },
];

/// `None` means "do not intercept": cross-origin or no route matched.
pub fn classify(req: &CacheRequest, scope: &Origin) -> Option<TrafficClass> {
    if &req.url.origin() != scope {
        return None;
    }
    ROUTES
        .iter()
        .find(|r| (r.matches)(req))
        .map(|r| r.class)
}
