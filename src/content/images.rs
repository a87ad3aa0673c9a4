// src/content/images.rs
//! Image path handling for submodule articles.
//!
//! Articles reference co-located images as `./img/x.png`. A separate build step
//! (`copy-images`) mirrors the submodule tree under the public assets dir, so
//! a relative reference resolves to `<prefix>/<path relative to submodule>`.

use once_cell::sync::OnceCell;
use regex::Regex;
use std::path::{Component, Path, PathBuf};

/// Resolves article-relative image paths to public asset URLs.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    submodule_dir: PathBuf,
    assets_prefix: String,
}

impl ImageResolver {
    pub fn new(submodule_dir: impl Into<PathBuf>, assets_prefix: &str) -> Self {
        Self {
            submodule_dir: lexical_normalize(&submodule_dir.into()),
            assets_prefix: assets_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve one image reference found in `markdown_file`.
    ///
    /// `http…` passes through, `./…` is rewritten, anything else is returned
    /// as-is. Paths that escape the submodule root cannot be mapped and also
    /// come back unchanged.
    pub fn resolve(&self, image_path: &str, markdown_file: &Path) -> String {
        if image_path.starts_with("http") || !image_path.starts_with("./") {
            return image_path.to_string();
        }

        let dir = markdown_file.parent().unwrap_or_else(|| Path::new(""));
        let resolved = lexical_normalize(&dir.join(image_path));
        match resolved.strip_prefix(&self.submodule_dir) {
            Ok(rel) => format!("{}/{}", self.assets_prefix, slash_path(rel)),
            Err(_) => {
                tracing::warn!(
                    target: "content",
                    image = image_path,
                    file = %markdown_file.display(),
                    "image path escapes submodule root; leaving unresolved"
                );
                image_path.to_string()
            }
        }
    }

    /// Rewrite every `![alt](./path)` in `markdown` to its public asset path.
    pub fn rewrite_markdown(&self, markdown: &str, markdown_file: &Path) -> String {
        static RE_IMG: OnceCell<Regex> = OnceCell::new();
        let Some(re) = RE_IMG
            .get_or_try_init(|| Regex::new(r"!\[([^\]]*)\]\(\./([^)]+)\)"))
            .ok()
        else {
            return markdown.to_string();
        };

        re.replace_all(markdown, |caps: &regex::Captures<'_>| {
            let rel = format!("./{}", &caps[2]);
            format!("![{}]({})", &caps[1], self.resolve(&rel, markdown_file))
        })
        .into_owned()
    }

    /// Article directory relative to the submodule root, forward slashes.
    pub fn article_path(&self, markdown_file: &Path) -> String {
        let dir = lexical_normalize(markdown_file.parent().unwrap_or_else(|| Path::new("")));
        match dir.strip_prefix(&self.submodule_dir) {
            Ok(rel) => slash_path(rel),
            Err(_) => "unknown".to_string(),
        }
    }
}

/// Normalize a header image URL for display.
///
/// Local assets and absolute URLs are kept; CDN paths without a scheme
/// (Contentful returns `//images.ctfassets.net/...`) get `https:` plus a
/// webp hint.
pub fn display_image_url(raw: &str) -> String {
    if raw.starts_with('/') && !raw.starts_with("//") {
        return raw.to_string();
    }
    if raw.starts_with("http") {
        return raw.to_string();
    }
    let without_slashes = raw.trim_start_matches('/');
    format!("https://{without_slashes}?fm=webp")
}

/// Resolve `.` and `..` without touching the filesystem.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn slash_path(p: &Path) -> String {
    p.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> ImageResolver {
        ImageResolver::new("/site/src/contents/blogs", "/assets/posts/")
    }

    fn article() -> PathBuf {
        PathBuf::from("/site/src/contents/blogs/articles/2024/hello/index.md")
    }

    #[test]
    fn relative_path_maps_under_prefix() {
        let out = resolver().resolve("./img/x.png", &article());
        assert_eq!(out, "/assets/posts/articles/2024/hello/img/x.png");
    }

    #[test]
    fn resolution_is_deterministic() {
        let r = resolver();
        assert_eq!(r.resolve("./a.png", &article()), r.resolve("./a.png", &article()));
    }

    #[test]
    fn absolute_urls_pass_through() {
        let url = "http://cdn.example.com/a.png";
        assert_eq!(resolver().resolve(url, &article()), url);
        let tls = "https://cdn.example.com/a.png";
        assert_eq!(resolver().resolve(tls, &article()), tls);
    }

    #[test]
    fn already_resolved_path_is_stable() {
        let r = resolver();
        let once = r.resolve("./img/x.png", &article());
        assert_eq!(r.resolve(&once, &article()), once);
    }

    #[test]
    fn parent_segments_are_normalized() {
        let out = resolver().resolve("./../shared/logo.svg", &article());
        assert_eq!(out, "/assets/posts/articles/2024/shared/logo.svg");
    }

    #[test]
    fn escaping_the_root_returns_original() {
        let out = resolver().resolve("./../../../../../outside.png", &article());
        assert_eq!(out, "./../../../../../outside.png");
    }

    #[test]
    fn markdown_rewrite_only_touches_relative_images() {
        let md = "![cover](./img/c.png) and ![remote](https://x/y.png) and [link](./doc.md)";
        let out = resolver().rewrite_markdown(md, &article());
        assert_eq!(
            out,
            "![cover](/assets/posts/articles/2024/hello/img/c.png) and ![remote](https://x/y.png) and [link](./doc.md)"
        );
    }

    #[test]
    fn article_path_is_relative_to_submodule() {
        assert_eq!(resolver().article_path(&article()), "articles/2024/hello");
    }

    #[test]
    fn display_url_normalization() {
        assert_eq!(display_image_url("/assets/posts/a.png"), "/assets/posts/a.png");
        assert_eq!(display_image_url("https://x/a.png"), "https://x/a.png");
        assert_eq!(
            display_image_url("//images.ctfassets.net/a.png"),
            "https://images.ctfassets.net/a.png?fm=webp"
        );
    }
}
