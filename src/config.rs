//! Configuration management with XDG paths
//!
//! ~/.config/timeport/config.json - credentials and target project (0600)
//!
//! Secrets can be overridden from the environment (JIRA_API_TOKEN,
//! HARVEST_ACCESS_TOKEN) without touching the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const APP_NAME: &str = "timeport";

/// Get config directory (~/.config/timeport/)
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .ok_or_else(|| Error::Config("could not determine config directory".into()))?;
    Ok(base.join(APP_NAME))
}

/// Get config file path
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

/// Jira credentials and instance location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JiraConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub api_token: String,
}

/// Harvest credentials and the project/task new entries are booked on.
/// All fields are filled in by `tp auth`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarvestConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<u64>,
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub jira: JiraConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
}

impl Config {
    /// Load config from disk (or defaults when absent), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        let mut config = if path.exists() {
            Self::read_from(&path)?
        } else {
            Config::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Save config to disk with secure permissions (it holds API tokens).
    pub fn save(&self) -> Result<()> {
        let dir = config_dir()?;
        fs::create_dir_all(&dir)
            .map_err(|e| Error::Config(format!("failed to create {}: {}", dir.display(), e)))?;
        self.write_to(&config_path()?)
    }

    fn read_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(path, &content)
            .map_err(|e| Error::Config(format!("failed to write {}: {}", path.display(), e)))?;

        let mut perms = fs::metadata(path)
            .map_err(|e| Error::Config(format!("failed to stat {}: {}", path.display(), e)))?
            .permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)
            .map_err(|e| Error::Config(format!("failed to chmod {}: {}", path.display(), e)))?;

        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("JIRA_API_TOKEN") {
            if !token.is_empty() {
                self.jira.api_token = token;
            }
        }
        if let Ok(token) = std::env::var("HARVEST_ACCESS_TOKEN") {
            if !token.is_empty() {
                self.harvest.access_token = Some(token);
            }
        }
    }

    /// Names of config values the timer commands need but that are not set.
    pub fn missing_values(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.jira.base_url.is_empty() {
            missing.push("jira.base_url");
        }
        if self.jira.username.is_empty() {
            missing.push("jira.username");
        }
        if self.jira.api_token.is_empty() {
            missing.push("jira.api_token");
        }
        if self.harvest.access_token.is_none() {
            missing.push("harvest.access_token");
        }
        if self.harvest.account_id.is_none() {
            missing.push("harvest.account_id");
        }
        if self.harvest.project_id.is_none() {
            missing.push("harvest.project_id");
        }
        if self.harvest.task_id.is_none() {
            missing.push("harvest.task_id");
        }
        missing
    }

    /// Fail fast before any remote call when required values are absent.
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_values();
        if missing.is_empty() {
            return Ok(());
        }
        Err(Error::Config(format!(
            "missing configuration values: {}. Set Jira values with `tp config set` and run `tp auth` for Harvest",
            missing.join(", ")
        )))
    }
}
