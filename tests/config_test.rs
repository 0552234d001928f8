//! Tests for configuration loading

mod common;

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use airtime::config::{Config, ConfigError, ConfigProvider, DEFAULT_ROTATION_ORDER};
use airtime::models::ScheduleGap;
use airtime::scheduler::{RotationCategory, RunKind};
use common::*;
use tempfile::TempDir;

#[test]
fn test_shipped_config_matches_defaults() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config.toml");
    let (config, warnings) = Config::from_file(&path).expect("config.toml should parse");

    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    assert_eq!(config, Config::default());
    assert_eq!(config.rotation.order, DEFAULT_ROTATION_ORDER.to_vec());
}

#[test]
fn test_rendered_config_loads_back() {
    let config = Config::default();
    let rendered = config.to_toml().unwrap();

    let (parsed, warnings) = Config::from_toml_str(&rendered, "rendered").unwrap();
    assert!(warnings.is_empty());
    assert_eq!(parsed, config);
}

#[test]
fn test_bad_keys_fall_back_individually() {
    let toml = r#"
        [rotation]
        order = ["id", "weather"]

        [replay_delays.pkg]
        base_delay_hours = 30

        [replay_delays.spots]
        base_delay_hours = -4

        [featured]
        daytime_probability = 1.5
        minimum_spacing_hours = 3

        [logging]
        level = "chatty"
    "#;

    let (config, warnings) = Config::from_toml_str(toml, "test").unwrap();

    // Rejected keys keep their defaults
    assert_eq!(config.rotation.order, DEFAULT_ROTATION_ORDER.to_vec());
    assert_eq!(config.rotation.featured.daytime_probability, 0.75);
    assert_eq!(config.logging.level, "info");
    let spots = config.rotation.replay_delays[&RotationCategory::Spots];
    assert_eq!(spots.base_delay_hours, 12.0);

    // Valid keys in the same document still apply
    assert_eq!(config.rotation.featured.minimum_spacing_hours, 3.0);
    let pkg = config.rotation.replay_delays[&RotationCategory::Pkg];
    assert_eq!(pkg.base_delay_hours, 30.0);
    assert_eq!(pkg.per_airing_increment_hours, 6.0);

    let keys: Vec<&str> = warnings.iter().map(|w| w.key.as_str()).collect();
    assert!(keys.contains(&"rotation.order"));
    assert!(keys.contains(&"replay_delays.spots.base_delay_hours"));
    assert!(keys.contains(&"featured.daytime_probability"));
    assert!(keys.contains(&"logging.level"));
}

#[test]
fn test_syntax_error_is_fatal() {
    let err = Config::from_toml_str("[rotation\norder = [", "broken").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn test_missing_file_serves_defaults() {
    let dir = TempDir::new().unwrap();
    let provider = ConfigProvider::from_file(dir.path().join("absent.toml"));

    let config = provider.load().unwrap();
    assert_eq!(*config, Config::default());
}

#[test]
fn test_reload_applies_to_next_run() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("airtime.toml");
    std::fs::write(&path, "[rotation]\norder = [\"id\"]\n").unwrap();

    let provider = ConfigProvider::from_file(&path);
    let catalog = catalog(full_inventory());
    let mut scheduler = neutral_scheduler(&catalog, RunKind::Daily);

    let report = scheduler
        .build_schedule(&[ScheduleGap::new(at(8, 0), 10)], &provider.rotation().unwrap())
        .unwrap();
    assert_eq!(report.items[0].placed_category, RotationCategory::Id);

    let mut file = File::create(&path).unwrap();
    file.write_all(b"[rotation]\norder = [\"spots\"]\n").unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(60))
        .unwrap();
    drop(file);

    assert!(provider.is_stale());
    provider.reload().unwrap();

    let report = scheduler
        .build_schedule(&[ScheduleGap::new(at(9, 0), 30)], &provider.rotation().unwrap())
        .unwrap();
    assert_eq!(report.items[0].placed_category, RotationCategory::Spots);
}

#[test]
fn test_failed_reload_keeps_previous_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("airtime.toml");
    std::fs::write(&path, "[rotation]\norder = [\"long_form\"]\n").unwrap();

    let provider = ConfigProvider::from_file(&path);
    provider.load().unwrap();

    std::fs::write(&path, "[rotation\n").unwrap();
    assert!(provider.reload().is_err());

    let rotation = provider.rotation().unwrap();
    assert_eq!(rotation.order, vec![RotationCategory::LongForm]);
}
