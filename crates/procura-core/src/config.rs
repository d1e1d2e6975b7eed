//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the backend base URL, the login destination path, and
//! the last used email.
//!
//! Configuration is stored at `~/.config/procura/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "procura";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default backend base URL, overridable via `PROCURA_API_URL`.
const DEFAULT_API_BASE_URL: &str = "https://api.procura.example/api";

/// Default login destination used for redirect events.
const DEFAULT_LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    pub login_path: String,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let api_base_url = std::env::var("PROCURA_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        Self {
            api_base_url,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the persisted credential record.
    pub fn credential_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();
        assert_eq!(config.login_path, "/login");
        assert!(config.last_email.is_none());
        assert!(!config.api_base_url.is_empty());
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = Config {
            api_base_url: "https://api.example/api".to_string(),
            login_path: "/signin".to_string(),
            last_email: Some("a@b.com".to_string()),
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.login_path, "/signin");
        assert_eq!(back.last_email.as_deref(), Some("a@b.com"));
    }
}
