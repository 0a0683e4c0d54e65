//! Application configuration.
//!
//! Loaded from `config.toml` in the XDG config directory, or from the path
//! given with `--config`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use tracing::{debug, info};

use crate::chat_management::DEFAULT_WELCOME_TEMPLATE;

/// Overrides `access_token` from the config file when set.
pub const ACCESS_TOKEN_ENV: &str = "CHATWARDEN_ACCESS_TOKEN";

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub log_level: String,
    /// Also write `<data_dir>/bot.log`
    pub enable_file_logging: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_file_logging: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Stream to watch (empty: auto-detect)
    pub video_id: String,
    /// Channel searched by auto-detection (empty: the authenticated channel)
    pub channel_id: String,
    pub bot_prefix: String,
    /// `{username}` is replaced by the display name
    pub welcome_message: String,
    pub cooldown_seconds: u64,
    pub data_dir: PathBuf,
    pub commands_file: PathBuf,

    /// Data API key (public reads)
    pub api_key: Option<String>,
    /// OAuth access token (writes); obtained and refreshed outside this program
    pub access_token: Option<String>,

    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            video_id: String::new(),
            channel_id: String::new(),
            bot_prefix: "/".to_string(),
            welcome_message: DEFAULT_WELCOME_TEMPLATE.to_string(),
            cooldown_seconds: 5,
            data_dir: PathBuf::from("data"),
            commands_file: PathBuf::from("commands.json"),
            api_key: None,
            access_token: None,
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("bot.log")
    }

    fn non_empty(value: &str) -> Option<&str> {
        Some(value.trim()).filter(|v| !v.is_empty())
    }

    pub fn video(&self) -> Option<&str> {
        Self::non_empty(&self.video_id)
    }

    pub fn channel(&self) -> Option<&str> {
        Self::non_empty(&self.channel_id)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_access_token_override(std::env::var(ACCESS_TOKEN_ENV).ok());
    }

    fn apply_access_token_override(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            debug!("Access token taken from {}", ACCESS_TOKEN_ENV);
            self.access_token = Some(token.trim().to_string());
        }
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Use `config.toml` in the XDG config directory.
    pub fn new() -> Result<Self> {
        let project_dirs = ProjectDirs::from("dev", "chatwarden", "chatwarden")
            .context("Failed to get project directories")?;
        let config_path = project_dirs.config_dir().join("config.toml");
        debug!("Config file path: {}", config_path.display());

        Ok(Self { config_path })
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the config, or the defaults when the file does not exist.
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path).with_context(|| {
                format!("Failed to read config file: {}", self.config_path.display())
            })?;

            let config: AppConfig = toml::from_str(&content).with_context(|| {
                format!("Failed to parse config file: {}", self.config_path.display())
            })?;

            info!("✅ Configuration loaded from: {}", self.config_path.display());
            config
        } else {
            info!(
                "Config file not found, using default settings: {}",
                self.config_path.display()
            );
            AppConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.bot_prefix, "/");
        assert_eq!(config.cooldown(), Duration::from_secs(5));
        assert_eq!(config.welcome_message, "Welcome to the stream, {username}! 🎉");
        assert_eq!(config.log_file(), PathBuf::from("data").join("bot.log"));
        assert!(config.video().is_none());
        assert!(config.log.enable_file_logging);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
video_id = "https://youtu.be/abc123"
cooldown_seconds = 30
data_dir = "state"

[log]
log_level = "debug"
"#,
        )
        .unwrap();

        let config = ConfigManager::from_path(&path).load_config().unwrap();
        assert_eq!(config.video(), Some("https://youtu.be/abc123"));
        assert_eq!(config.cooldown_seconds, 30);
        assert_eq!(config.bot_prefix, "/");
        assert_eq!(config.log.log_level, "debug");
        assert!(config.log.enable_file_logging);
        assert_eq!(config.log_file(), PathBuf::from("state").join("bot.log"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let temp_dir = tempdir().unwrap();
        let manager = ConfigManager::from_path(temp_dir.path().join("none.toml"));
        let mut config = manager.load_config().unwrap();
        // The env var may be set on the machine running the tests.
        config.access_token = None;
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_invalid_file_is_error() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "cooldown_seconds = \"soon\"").unwrap();

        let err = ConfigManager::from_path(&path).load_config().unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_access_token_override() {
        let mut config = AppConfig {
            access_token: Some("from-file".to_string()),
            ..AppConfig::default()
        };

        config.apply_access_token_override(Some("   ".to_string()));
        assert_eq!(config.access_token.as_deref(), Some("from-file"));

        config.apply_access_token_override(Some(" from-env ".to_string()));
        assert_eq!(config.access_token.as_deref(), Some("from-env"));
    }
}
