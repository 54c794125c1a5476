//! CLI configuration.
//!
//! Stored at `~/.config/lessonloader/config.json`. Environment variables
//! (including ones from a `.env` file) override the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lessonloader_core::LoaderConfig;
use serde::{Deserialize, Serialize};

/// Application name used for the config directory
const APP_NAME: &str = "lessonloader";

const CONFIG_FILE: &str = "config.json";

/// Used when neither the config file nor the environment names a directory
const DEFAULT_CONTENT_DIR: &str = "content";

pub const ENV_CONTENT_DIR: &str = "LESSONLOADER_CONTENT_DIR";
pub const ENV_BASE_URL: &str = "LESSONLOADER_BASE_URL";
pub const ENV_TOKEN: &str = "LESSONLOADER_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub content_dir: Option<PathBuf>,
    pub base_url: Option<String>,
    pub token: Option<String>,
    #[serde(default)]
    pub loader: LoaderConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Apply overrides from `lookup`; empty values are ignored.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(dir) = lookup(ENV_CONTENT_DIR) {
            self.content_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = Some(url);
        }
        if let Some(token) = lookup(ENV_TOKEN) {
            self.token = Some(token);
        }
        self
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn content_dir(&self) -> PathBuf {
        self.content_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONTENT_DIR))
    }
}
