// src/cache/offline.rs
//! Synthetic responses returned when neither cache nor network can answer.

use http::StatusCode;
use serde::{Deserialize, Serialize};

use super::request::CacheResponse;

/// Localized strings for the offline responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineCopy {
    pub lang: String,
    pub site_name: String,
    /// Short message used by the static/API fallbacks and the page heading.
    pub message: String,
    pub details: Vec<String>,
    pub error_message: String,
}

impl Default for OfflineCopy {
    fn default() -> Self {
        Self {
            lang: "ja".to_string(),
            site_name: "andmohiko.dev".to_string(),
            message: "オフラインです".to_string(),
            details: vec![
                "インターネット接続を確認してから再度お試しください。".to_string(),
                "一部のコンテンツはキャッシュされている可能性があります。".to_string(),
            ],
            error_message: "エラーが発生しました".to_string(),
        }
    }
}

/// Self-contained offline document. Status 200: for a navigation this is a
/// successful answer, not an error.
pub fn offline_page(copy: &OfflineCopy) -> CacheResponse {
    use html_escape::{encode_double_quoted_attribute, encode_text};

    let paragraphs = copy
        .details
        .iter()
        .map(|d| format!("      <p>{}</p>", encode_text(d)))
        .collect::<Vec<_>>()
        .join("\n");

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
  <meta charset="utf-8">
  <title>{message} - {site}</title>
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <style>
    body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif;
           text-align: center; padding: 2rem; background: #f8f9fa; }}
    .container {{ max-width: 600px; margin: 0 auto; }}
    .icon {{ font-size: 4rem; margin-bottom: 1rem; }}
    h1 {{ color: #652C8F; margin-bottom: 1rem; }}
    p {{ color: #666; line-height: 1.6; }}
  </style>
</head>
<body>
  <div class="container">
    <div class="icon">📱</div>
    <h1>{message}</h1>
{paragraphs}
  </div>
</body>
</html>
"#,
        lang = encode_double_quoted_attribute(&copy.lang),
        message = encode_text(&copy.message),
        site = encode_text(&copy.site_name),
        paragraphs = paragraphs,
    );

    CacheResponse::ok(html).with_content_type("text/html; charset=utf-8")
}

pub fn api_offline(copy: &OfflineCopy) -> CacheResponse {
    let body = serde_json::json!({
        "error": copy.message,
        "cached": false,
    });
    CacheResponse::new(StatusCode::SERVICE_UNAVAILABLE, body.to_string())
        .with_content_type("application/json")
}

pub fn static_unavailable(copy: &OfflineCopy) -> CacheResponse {
    CacheResponse::new(StatusCode::SERVICE_UNAVAILABLE, copy.message.clone())
        .with_content_type("text/plain; charset=utf-8")
}

pub fn image_unavailable() -> CacheResponse {
    CacheResponse::new(StatusCode::SERVICE_UNAVAILABLE, "")
}

pub fn internal_error(copy: &OfflineCopy) -> CacheResponse {
    CacheResponse::new(StatusCode::INTERNAL_SERVER_ERROR, copy.error_message.clone())
        .with_content_type("text/plain; charset=utf-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_page_is_html_200() {
        let r = offline_page(&OfflineCopy::default());
        assert_eq!(r.status, StatusCode::OK);
        assert_eq!(r.content_type(), Some("text/html; charset=utf-8"));
        let body = std::str::from_utf8(&r.body).unwrap();
        assert!(body.contains("<html lang=\"ja\">"));
        assert!(body.contains("オフラインです"));
        assert!(!body.contains("src=\"http"), "must not reference external resources");
    }

    #[test]
    fn offline_page_escapes_configured_copy() {
        let copy = OfflineCopy {
            message: "<b>down</b>".into(),
            ..OfflineCopy::default()
        };
        let body = offline_page(&copy).body;
        let body = std::str::from_utf8(&body).unwrap();
        assert!(body.contains("&lt;b&gt;down&lt;/b&gt;"));
    }

    #[test]
    fn api_offline_is_structured_json() {
        let r = api_offline(&OfflineCopy::default());
        assert_eq!(r.status, StatusCode::SERVICE_UNAVAILABLE);
        let v: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
        assert_eq!(v["cached"], false);
        assert_eq!(v["error"], "オフラインです");
    }
}
