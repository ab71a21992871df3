//! Configuration resolution tests
//!
//! Covers the CLI → ENV → TOML → default priority order and graceful
//! degradation when the config file is missing or broken.
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate MOODTUNE_* variables are marked with #[serial].

use moodtune_common::config::{
    resolve_config_path, CliOverrides, Settings, TomlConfig, DEFAULT_API_BASE_URL,
    DEFAULT_DETECTION_TIMEOUT_MS, DEFAULT_MUSIC_BASE_URL, DEFAULT_RAG_BASE_URL,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

fn clear_env() {
    for name in [
        "MOODTUNE_CONFIG",
        "MOODTUNE_API_BASE_URL",
        "MOODTUNE_API_BEARER_TOKEN",
        "MOODTUNE_FER_ENDPOINT_URL",
        "MOODTUNE_RAG_BASE_URL",
        "MOODTUNE_MUSIC_BASE_URL",
        "MOODTUNE_DATA_DIR",
    ] {
        env::remove_var(name);
    }
}

#[test]
#[serial]
fn test_defaults_when_nothing_configured() {
    clear_env();

    let settings = Settings::resolve(&CliOverrides::default(), &TomlConfig::default());

    assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
    assert_eq!(settings.rag_base_url, DEFAULT_RAG_BASE_URL);
    assert_eq!(settings.music_base_url, DEFAULT_MUSIC_BASE_URL);
    assert_eq!(settings.detection_timeout_ms, DEFAULT_DETECTION_TIMEOUT_MS);
    assert!(settings.fer_endpoint_url.is_none(), "FER stays unconfigured by default");
    assert!(settings.api_bearer_token.is_none());
    assert_eq!(settings.log_level, "info");
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    env::set_var("MOODTUNE_API_BASE_URL", "http://env-api");

    let toml = TomlConfig {
        api_base_url: Some("http://toml-api".to_string()),
        music_base_url: Some("http://toml-music".to_string()),
        ..Default::default()
    };
    let settings = Settings::resolve(&CliOverrides::default(), &toml);

    assert_eq!(settings.api_base_url, "http://env-api");
    assert_eq!(settings.music_base_url, "http://toml-music");

    clear_env();
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env();
    env::set_var("MOODTUNE_FER_ENDPOINT_URL", "http://env-fer/infer");

    let cli = CliOverrides {
        fer_endpoint_url: Some("http://cli-fer/infer".to_string()),
        ..Default::default()
    };
    let settings = Settings::resolve(&cli, &TomlConfig::default());

    assert_eq!(settings.fer_endpoint_url.as_deref(), Some("http://cli-fer/infer"));

    clear_env();
}

#[test]
#[serial]
fn test_blank_env_value_is_ignored() {
    clear_env();
    env::set_var("MOODTUNE_RAG_BASE_URL", "   ");

    let toml = TomlConfig {
        rag_base_url: Some("http://toml-rag".to_string()),
        ..Default::default()
    };
    let settings = Settings::resolve(&CliOverrides::default(), &toml);
    assert_eq!(settings.rag_base_url, "http://toml-rag");

    clear_env();
}

#[test]
#[serial]
fn test_data_dir_resolution_and_storage_path() {
    clear_env();
    env::set_var("MOODTUNE_DATA_DIR", "/tmp/moodtune-env-data");

    let settings = Settings::resolve(&CliOverrides::default(), &TomlConfig::default());
    assert_eq!(settings.data_dir, PathBuf::from("/tmp/moodtune-env-data"));
    assert_eq!(
        settings.storage_path(),
        PathBuf::from("/tmp/moodtune-env-data/storage.json")
    );

    clear_env();
}

#[test]
#[serial]
fn test_config_path_priority() {
    clear_env();
    env::set_var("MOODTUNE_CONFIG", "/tmp/from-env.toml");

    let cli_path = PathBuf::from("/tmp/from-cli.toml");
    assert_eq!(resolve_config_path(Some(&cli_path)), Some(cli_path.clone()));
    assert_eq!(
        resolve_config_path(None),
        Some(PathBuf::from("/tmp/from-env.toml"))
    );

    clear_env();
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    let config = TomlConfig::load_or_default(Some(&missing));
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_broken_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("moodtune.toml");
    std::fs::write(&path, "this is = = not toml").unwrap();

    let config = TomlConfig::load_or_default(Some(&path));
    assert_eq!(config, TomlConfig::default());
}
