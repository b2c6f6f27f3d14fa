//! Tests for configuration loading and root folder resolution
//!
//! Tests that touch AERIE_ROOT_FOLDER or AERIE_CONFIG are marked #[serial] so
//! they never observe each other's environment.

use aerie_common::config::{
    default_root_folder, RootFolderInitializer, RootFolderResolver, TomlConfig, CONFIG_FILE_ENV,
    ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolved = RootFolderResolver::new("aerie-collector").resolve();
    assert_eq!(resolved, default_root_folder());
}

#[test]
#[serial]
fn test_cli_arg_beats_env_and_config() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let config = TomlConfig::from_toml_str(r#"root_folder = "/from/toml""#).unwrap();

    let resolved = RootFolderResolver::new("aerie-collector")
        .with_cli_arg(Some(PathBuf::from("/from/cli")))
        .with_config(&config)
        .resolve();

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(resolved, PathBuf::from("/from/cli"));
}

#[test]
#[serial]
fn test_env_beats_config() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let config = TomlConfig::from_toml_str(r#"root_folder = "/from/toml""#).unwrap();

    let resolved = RootFolderResolver::new("aerie-classifier")
        .with_config(&config)
        .resolve();

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(resolved, PathBuf::from("/from/env"));
}

#[test]
#[serial]
fn test_empty_env_falls_through_to_config() {
    env::set_var(ROOT_FOLDER_ENV, "");
    let config = TomlConfig::from_toml_str(r#"root_folder = "/from/toml""#).unwrap();

    let resolved = RootFolderResolver::new("aerie-classifier")
        .with_config(&config)
        .resolve();

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(resolved, PathBuf::from("/from/toml"));
}

#[test]
#[serial]
fn test_load_missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist.toml");

    let config = TomlConfig::load(Some(&missing)).unwrap();
    assert!(config.root_folder.is_none());
    assert_eq!(config.collector.port, 8080);
}

#[test]
#[serial]
fn test_load_from_env_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        [sync]
        collector_url = "http://10.0.0.2:9000"
        retry_interval_ms = 2500

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    env::set_var(CONFIG_FILE_ENV, &path);
    let config = TomlConfig::load(None);
    env::remove_var(CONFIG_FILE_ENV);

    let config = config.unwrap();
    assert_eq!(config.sync.collector_url, "http://10.0.0.2:9000");
    assert_eq!(config.sync.retry_interval_ms, 2500);
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_load_invalid_file_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[collector\nport = ").unwrap();

    assert!(TomlConfig::load(Some(&path)).is_err());
}

#[test]
fn test_initializer_creates_directory() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("a").join("b");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert_eq!(initializer.root_folder(), root.as_path());
    assert_eq!(initializer.database_path(), root.join("tweets.db"));
}
