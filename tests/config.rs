use assert_matches::assert_matches;
use std::fs;

use kira_sample_metadata::config::{ConfigLoader, ConfigOverrides, default_workers};
use kira_sample_metadata::error::KiraError;

#[test]
fn resolve_reads_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kira-sm.json");
    fs::write(
        &path,
        r#"{"base_url": "https://admin.example.org", "timeout_secs": 12, "language_tag": "es-MX"}"#,
    )
    .unwrap();

    let resolved =
        ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()).unwrap();
    assert_eq!(resolved.base_url, "https://admin.example.org");
    assert_eq!(resolved.timeout_secs, 12);
    assert_eq!(resolved.workers, default_workers());
    assert_eq!(resolved.language_tag, "es-MX");
}

#[test]
fn cli_overrides_beat_file_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kira-sm.json");
    fs::write(&path, r#"{"base_url": "https://a.example.org", "workers": 16}"#).unwrap();

    let overrides = ConfigOverrides {
        base_url: Some("http://localhost:8080".to_string()),
        timeout_secs: Some(3),
        workers: Some(2),
    };
    let resolved = ConfigLoader::resolve(path.to_str(), overrides).unwrap();
    assert_eq!(resolved.base_url, "http://localhost:8080");
    assert_eq!(resolved.timeout_secs, 3);
    assert_eq!(resolved.workers, 2);
}

#[test]
fn unreadable_and_malformed_files_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.json");
    let err = ConfigLoader::resolve(missing.to_str(), ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, KiraError::ConfigRead(path) if path == missing);

    let broken = dir.path().join("broken.json");
    fs::write(&broken, "{ not json").unwrap();
    let err = ConfigLoader::resolve(broken.to_str(), ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, KiraError::ConfigParse(_));
}

#[test]
fn zero_workers_and_bad_scheme_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kira-sm.json");
    fs::write(&path, r#"{"base_url": "ftp://admin.example.org"}"#).unwrap();
    let err = ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, KiraError::ConfigParse(message) if message.contains("http(s)"));

    fs::write(&path, r#"{"base_url": "https://admin.example.org", "workers": 0}"#).unwrap();
    let err = ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, KiraError::ConfigParse(_));
}
