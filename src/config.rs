use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr, bail};
use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const API_KEY_ENV: &str = "API_KEY";
pub const BIND_ENV: &str = "SUBTITLER_BIND";

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub bind: Option<String>,
    pub default_languages: Option<Vec<String>>,
}

impl Config {
    /// Load config from ~/.config/subtitler/config.toml if it exists
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(path)?;
            let config: Config =
                toml::from_str(&content).wrap_err_with(|| format!("invalid config file {}", path.display()))?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    /// Apply `API_KEY` and `SUBTITLER_BIND` from the process environment
    pub fn with_env(self) -> Self {
        self.with_overrides(std::env::var(API_KEY_ENV).ok(), std::env::var(BIND_ENV).ok())
    }

    fn with_overrides(mut self, api_key: Option<String>, bind: Option<String>) -> Self {
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(bind) = bind.filter(|b| !b.is_empty()) {
            self.bind = Some(bind);
        }
        self
    }

    /// The bearer token clients must present; the server refuses to start without one
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => bail!("{API_KEY_ENV} environment variable is required"),
        }
    }

    pub fn bind_addr(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND)
    }

    /// Configured fallback languages, if any were given
    pub fn default_languages(&self) -> Vec<String> {
        self.default_languages.clone().unwrap_or_default()
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("subtitler")
        .join("config.toml")
}
