//! Config discovery: explicit path, `SITE_CONFIG_PATH`, defaults.
//! Tests touching process env are serialized.

use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use portfolio_content::config::{SiteConfig, ENV_CONFIG_PATH};

#[test]
fn checked_in_sample_config_parses() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/site.toml");
    let cfg = SiteConfig::load_from(&path).expect("sample config");
    assert_eq!(cfg.cache.version, "v1");
    assert_eq!(cfg.cache.precache.len(), 8);
    assert_eq!(cfg.cache.offline.site_name, "andmohiko.dev");
    assert_eq!(cfg.cache.offline.details.len(), 2);
    assert_eq!(cfg.contentful.space_id, "ENV");
}

#[test]
fn json_config_by_extension() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("site.json");
    fs::write(
        &path,
        r#"{"content": {"public_dir": "dist"}, "cache": {"version": "v2"}}"#,
    )
    .unwrap();
    let cfg = SiteConfig::load(Some(path.as_path())).unwrap();
    assert_eq!(cfg.content.public_dir, PathBuf::from("dist"));
    assert_eq!(cfg.content.assets_dir(), PathBuf::from("dist/assets/posts"));
    assert_eq!(cfg.cache.version, "v2");
}

#[test]
fn broken_file_is_an_error_with_path() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("site.toml");
    fs::write(&path, "[cache\nversion = ").unwrap();
    let err = SiteConfig::load_from(&path).unwrap_err();
    assert!(format!("{err:#}").contains("site.toml"));
}

#[serial]
#[test]
fn env_path_wins_and_must_exist() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("custom.toml");
    fs::write(&path, "[microcms]\nworks_limit = 12\n").unwrap();

    std::env::set_var(ENV_CONFIG_PATH, &path);
    let cfg = SiteConfig::load_default().unwrap();
    assert_eq!(cfg.microcms.works_limit, 12);

    std::env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml"));
    assert!(SiteConfig::load_default().is_err());

    std::env::remove_var(ENV_CONFIG_PATH);
}

#[serial]
#[test]
fn contentful_secrets_from_env() {
    std::env::set_var("CTF_SPACE_ID", "space123");
    std::env::set_var("CTF_CDA_ACCESS_TOKEN", "token456");
    let c = SiteConfig::default().resolve_contentful_secrets().unwrap();
    assert_eq!(c.space_id, "space123");
    assert_eq!(c.access_token, "token456");

    std::env::remove_var("CTF_CDA_ACCESS_TOKEN");
    let err = SiteConfig::default().resolve_contentful_secrets().unwrap_err();
    assert!(err.to_string().contains("CTF_CDA_ACCESS_TOKEN"));
    std::env::remove_var("CTF_SPACE_ID");
}
