//! Configuration loading and data folder resolution
//!
//! Settings come from four tiers, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable (`MOODTUNE_*`)
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing or unreadable TOML file is never fatal: a warning is logged and
//! compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "MOODTUNE_CONFIG";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_RAG_BASE_URL: &str = "http://localhost:8010";
pub const DEFAULT_MUSIC_BASE_URL: &str = "http://localhost:8020";
pub const DEFAULT_DETECTION_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Logging section of the TOML file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Default tracing level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// On-disk configuration (`moodtune.toml`)
///
/// Every field is optional so partial files stay valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub api_bearer_token: Option<String>,
    #[serde(default)]
    pub fer_endpoint_url: Option<String>,
    #[serde(default)]
    pub rag_base_url: Option<String>,
    #[serde(default)]
    pub music_base_url: Option<String>,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub detection_timeout_ms: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load from a file; errors are returned, not swallowed
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Load from a file, falling back to defaults with a warning
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            info!("No config file found, using compiled defaults");
            return Self::default();
        };

        match Self::load(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{}; using compiled defaults", e);
                Self::default()
            }
        }
    }
}

/// Locate the config file
///
/// CLI path wins, then `MOODTUNE_CONFIG`, then the per-user config directory.
/// Returns `None` when no candidate exists on disk.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|p| p.exists())
}

/// `<config_dir>/moodtune/moodtune.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("moodtune").join("moodtune.toml"))
}

/// OS-dependent default data folder
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("moodtune"))
        .unwrap_or_else(|| PathBuf::from("./moodtune_data"))
}

/// Fully resolved settings used by the client crates
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_base_url: String,
    pub api_bearer_token: Option<String>,
    pub fer_endpoint_url: Option<String>,
    pub rag_base_url: String,
    pub music_base_url: String,
    pub data_dir: PathBuf,
    pub detection_timeout_ms: u64,
    pub request_timeout_secs: u64,
    pub log_level: String,
}

/// Command-line overrides (tier 1)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_base_url: Option<String>,
    pub fer_endpoint_url: Option<String>,
    pub rag_base_url: Option<String>,
    pub music_base_url: Option<String>,
    pub data_dir: Option<PathBuf>,
}

impl Settings {
    /// Resolve every setting through CLI → ENV → TOML → default
    pub fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> Self {
        Self {
            api_base_url: pick(
                cli.api_base_url.clone(),
                "MOODTUNE_API_BASE_URL",
                toml.api_base_url.clone(),
            )
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            api_bearer_token: pick(
                None,
                "MOODTUNE_API_BEARER_TOKEN",
                toml.api_bearer_token.clone(),
            ),
            fer_endpoint_url: pick(
                cli.fer_endpoint_url.clone(),
                "MOODTUNE_FER_ENDPOINT_URL",
                toml.fer_endpoint_url.clone(),
            ),
            rag_base_url: pick(
                cli.rag_base_url.clone(),
                "MOODTUNE_RAG_BASE_URL",
                toml.rag_base_url.clone(),
            )
            .unwrap_or_else(|| DEFAULT_RAG_BASE_URL.to_string()),
            music_base_url: pick(
                cli.music_base_url.clone(),
                "MOODTUNE_MUSIC_BASE_URL",
                toml.music_base_url.clone(),
            )
            .unwrap_or_else(|| DEFAULT_MUSIC_BASE_URL.to_string()),
            data_dir: cli
                .data_dir
                .clone()
                .or_else(|| non_empty_env("MOODTUNE_DATA_DIR").map(PathBuf::from))
                .or_else(|| toml.data_dir.clone())
                .unwrap_or_else(default_data_dir),
            detection_timeout_ms: toml
                .detection_timeout_ms
                .unwrap_or(DEFAULT_DETECTION_TIMEOUT_MS),
            request_timeout_secs: toml
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            log_level: toml.logging.level.clone(),
        }
    }

    /// Create the data folder if missing
    pub fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)?;
            info!("Created data folder: {}", self.data_dir.display());
        }
        Ok(())
    }

    /// Path of the persisted key-value store (session blob lives here)
    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join("storage.json")
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn pick(cli: Option<String>, env_name: &str, toml: Option<String>) -> Option<String> {
    cli.filter(|v| !v.trim().is_empty())
        .or_else(|| non_empty_env(env_name))
        .or_else(|| toml.filter(|v| !v.trim().is_empty()))
}
