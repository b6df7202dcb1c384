//! Optional user configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.agentsync/
//!   config.yaml     (optional; every field has a default)
//! ```
//!
//! # API pattern
//!
//! `load_at(home)` takes an explicit home and is what tests call;
//! `load()` derives home from `dirs::home_dir()` and delegates.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::manifest::DEFAULT_MANIFEST;

pub const DEFAULT_SOURCE_REPO: &str = "https://github.com/hans-blok/agent-services.git";
pub const DEFAULT_CLONE_TIMEOUT_SECS: u64 = 120;

/// Destination roots, relative to the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub documents: PathBuf,
    pub prompts: PathBuf,
    pub scripts: PathBuf,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            documents: PathBuf::from("charters-agents"),
            prompts: PathBuf::from(".github").join("prompts"),
            scripts: PathBuf::from("scripts"),
        }
    }
}

/// Contents of `~/.agentsync/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source_repo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub manifest: String,
    pub clone_timeout_secs: u64,
    /// Write `temp/fetch-audit.json` after a successful fetch.
    pub audit: bool,
    pub layout: LayoutConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_repo: DEFAULT_SOURCE_REPO.to_string(),
            branch: None,
            manifest: DEFAULT_MANIFEST.to_string(),
            clone_timeout_secs: DEFAULT_CLONE_TIMEOUT_SECS,
            audit: true,
            layout: LayoutConfig::default(),
        }
    }
}

/// `<home>/.agentsync/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".agentsync").join("config.yaml")
}

/// Load the config under `home`, falling back to defaults when absent.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&home()?)
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}
