// `copy-images` build step against temp directories.

use std::fs;
use tempfile::TempDir;

use portfolio_content::config::ContentConfig;
use portfolio_content::content::assets::copy_article_images;

#[test]
fn copies_images_keeping_layout_and_cleans_destination() {
    let tmp = TempDir::new().unwrap();
    let cfg = ContentConfig {
        submodule_dir: tmp.path().join("blogs"),
        public_dir: tmp.path().join("public"),
        ..ContentConfig::default()
    };

    let article = cfg.submodule_dir.join("articles/2024/hello");
    fs::create_dir_all(article.join("img")).unwrap();
    fs::write(article.join("index.md"), "---\n---\n").unwrap();
    fs::write(article.join("img/a.PNG"), b"png").unwrap();
    fs::write(article.join("cover.jpeg"), b"jpeg").unwrap();
    fs::write(article.join("notes.txt"), b"txt").unwrap();

    let dest = cfg.assets_dir();
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("stale.png"), b"old").unwrap();

    let copied = copy_article_images(&cfg.submodule_dir, &dest).unwrap();
    assert_eq!(
        copied,
        vec![
            "articles/2024/hello/cover.jpeg".to_string(),
            "articles/2024/hello/img/a.PNG".to_string(),
        ]
    );
    assert_eq!(fs::read(dest.join("articles/2024/hello/img/a.PNG")).unwrap(), b"png");
    assert!(!dest.join("stale.png").exists());
    assert!(!dest.join("articles/2024/hello/notes.txt").exists());
}

#[test]
fn missing_submodule_is_skipped() {
    let tmp = TempDir::new().unwrap();
    let copied = copy_article_images(&tmp.path().join("absent"), &tmp.path().join("out")).unwrap();
    assert!(copied.is_empty());
    assert!(!tmp.path().join("out").exists());
}
