use std::fs;
use std::path::Path;

use tempfile::TempDir;

use mangawatch::config::{Config, ConfigError};
use mangawatch::models::Source;

#[test]
fn load_full_config_from_file() {
    let toml = r#"
log_level = "debug"
check_interval_secs = 1800

[http]
timeout_secs = 15
max_retries = 2

[bucket]
endpoint = "https://s3.gra.cloud.ovh.net"
name = "mangawatch"
key = "snapshots/mangas.json"
region = "gra"
access_key = "AKIATEST"
secret_key = "secrettest"

[notify]
webhook_url = "https://hooks.example.net/push"

[sources]
neatmanga = ["overgeared", "berserk"]
mangapill = ["chainsaw-man"]
toonily = ["tales-of-demons-and-gods"]
"#;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mangawatch.toml");
    fs::write(&path, toml).unwrap();

    let config = Config::load(&path).unwrap();

    assert_eq!(config.log_level, "debug");
    assert_eq!(config.check_interval_secs, 1800);
    assert_eq!(config.http.timeout_secs, 15);
    assert_eq!(config.http.max_retries, 2);

    let bucket = config.bucket.as_ref().unwrap();
    assert_eq!(bucket.endpoint, "https://s3.gra.cloud.ovh.net");
    assert_eq!(bucket.name, "mangawatch");
    assert_eq!(bucket.key, "snapshots/mangas.json");
    assert_eq!(bucket.region, "gra");
    assert_eq!(bucket.access_key, "AKIATEST");

    assert_eq!(
        config.notify.webhook_url.as_deref(),
        Some("https://hooks.example.net/push")
    );

    let tracked = config.sources.tracked();
    assert_eq!(
        tracked,
        vec![
            (Source::Neatmanga, "overgeared"),
            (Source::Neatmanga, "berserk"),
            (Source::Mangapill, "chainsaw-man"),
            (Source::Toonily, "tales-of-demons-and-gods"),
        ]
    );
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let config = Config::load(Path::new("/nonexistent/mangawatch.toml")).unwrap();
    assert_eq!(config.log_level, "info");
    assert!(config.bucket.is_none());
    assert!(config.sources.is_empty());
}

#[test]
fn invalid_file_is_an_error_not_a_default() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mangawatch.toml");
    fs::write(&path, "check_interval_secs = \"soon\"").unwrap();

    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn credentials_can_be_left_to_the_environment() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mangawatch.toml");
    fs::write(
        &path,
        r#"
[bucket]
endpoint = "https://s3.gra.cloud.ovh.net"
name = "mangawatch"
region = "gra"
"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    let bucket = config.bucket.unwrap();
    // empty in the file; `--access-key` / MANGAWATCH_ACCESS_KEY fill these in
    assert_eq!(bucket.access_key, "");
    assert_eq!(bucket.secret_key, "");
    assert_eq!(bucket.key, "mangas.json");
}
