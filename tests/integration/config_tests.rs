use dupescan::config::Config;
use dupescan::controller::{ScanController, ScanRequest};
use dupescan::duplicates::MatchType;
use dupescan::signal::CancelHandle;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.io_threads, 4);
}

#[test]
fn test_config_load_from_env() {
    std::env::set_var("DUPESCAN_TEST_IO_THREADS", "16");
    std::env::set_var("DUPESCAN_TEST_FOLLOW_SYMLINKS", "true");

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed("DUPESCAN_TEST_"))
        .extract()
        .unwrap();

    assert_eq!(config.io_threads, 16);
    assert!(config.follow_symlinks);

    std::env::remove_var("DUPESCAN_TEST_IO_THREADS");
    std::env::remove_var("DUPESCAN_TEST_FOLLOW_SYMLINKS");
}

#[test]
fn test_config_load_from_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "max_depth = 2\ntimeout_ms = 1500\nmax_hash_size = 1024\nfuzzy_max_candidates = 10\n",
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.max_depth, 2);
    assert_eq!(config.timeout_ms, 1500);
    assert_eq!(config.max_hash_size, 1024);
    assert_eq!(config.fuzzy_max_candidates, 10);
    assert_eq!(config.prehash_size, 4096);
}

#[test]
fn test_config_invalid_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "max_files = [1, 2").unwrap();

    let merged: Result<Config, _> = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .extract();
    assert!(merged.is_err());
}

#[test]
fn test_settings_from_config_drive_the_engine() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.bin"), b"0123456789").unwrap();
    fs::write(dir.path().join("b.bin"), b"0123456789").unwrap();

    let config = Config {
        max_hash_size: 4,
        fuzzy_threshold: 0,
        ..Config::default()
    };
    let result = ScanController::new(config.scan_settings())
        .scan(&ScanRequest::new(dir.path()), &CancelHandle::new())
        .unwrap();

    assert!(result
        .groups
        .iter()
        .all(|g| g.match_type != MatchType::Exact));
    assert!(result.groups.is_empty());
}

#[test]
fn test_readme_config_sample_matches_defaults() {
    let readme = include_str!("../../README.md");
    let sample = readme
        .split("```toml\n")
        .nth(1)
        .and_then(|rest| rest.split("```").next())
        .expect("README has a TOML sample");

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::string(sample))
        .extract()
        .unwrap();

    assert_eq!(config, Config::default());
}
