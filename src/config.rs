//! Configuration module
//!
//! Reads ~/.config/rmcp-sensorwatch/config.toml. Zero or missing
//! numeric values fall back to their defaults.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::watch::store::WATCH_FILE_NAME;

const APP_DIR: &str = "rmcp-sensorwatch";
const CONFIG_FILE: &str = "config.toml";

pub const WATCH_INTERVAL_SECS_DEFAULT: u64 = 5;
pub const WATCH_THRESHOLD_DEFAULT: u32 = 1;
pub const REBOOT_DELAY_MINUTES_DEFAULT: u32 = 1;
pub const SHUTDOWN_DELAY_MINUTES_DEFAULT: u32 = 1;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// List of disabled tool names (all others are enabled)
    #[serde(default)]
    pub disabled: Vec<String>,

    /// Telegram bot token used for alarm notifications
    #[serde(default)]
    pub telegram_token: Option<String>,

    /// Telegram chat ids that receive notifications
    #[serde(default)]
    pub recipients: Vec<i64>,

    /// Seconds between sensor watch passes
    #[serde(default = "default_watch_interval")]
    pub watch_interval_secs: u64,

    /// Consecutive alarming readings before an entry fires
    #[serde(default = "default_watch_threshold")]
    pub watch_threshold: u32,

    #[serde(default = "default_reboot_delay")]
    pub reboot_delay_minutes: u32,

    #[serde(default = "default_shutdown_delay")]
    pub shutdown_delay_minutes: u32,

    /// Directory holding the watch list; defaults to the config directory
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_watch_interval() -> u64 {
    WATCH_INTERVAL_SECS_DEFAULT
}

fn default_watch_threshold() -> u32 {
    WATCH_THRESHOLD_DEFAULT
}

fn default_reboot_delay() -> u32 {
    REBOOT_DELAY_MINUTES_DEFAULT
}

fn default_shutdown_delay() -> u32 {
    SHUTDOWN_DELAY_MINUTES_DEFAULT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            disabled: Vec::new(),
            telegram_token: None,
            recipients: Vec::new(),
            watch_interval_secs: WATCH_INTERVAL_SECS_DEFAULT,
            watch_threshold: WATCH_THRESHOLD_DEFAULT,
            reboot_delay_minutes: REBOOT_DELAY_MINUTES_DEFAULT,
            shutdown_delay_minutes: SHUTDOWN_DELAY_MINUTES_DEFAULT,
            data_dir: None,
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load config from the default path, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            tracing::warn!("Could not determine config directory, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load config from `path`, or return defaults if missing or invalid
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", path);
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::error!("Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!("Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<Config>(contents).map(Config::normalized)
    }

    /// Replace zero values with defaults
    pub fn normalized(mut self) -> Self {
        if self.watch_interval_secs == 0 {
            self.watch_interval_secs = WATCH_INTERVAL_SECS_DEFAULT;
        }
        if self.watch_threshold == 0 {
            self.watch_threshold = WATCH_THRESHOLD_DEFAULT;
        }
        if self.reboot_delay_minutes == 0 {
            self.reboot_delay_minutes = REBOOT_DELAY_MINUTES_DEFAULT;
        }
        if self.shutdown_delay_minutes == 0 {
            self.shutdown_delay_minutes = SHUTDOWN_DELAY_MINUTES_DEFAULT;
        }
        self.telegram_token = self
            .telegram_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }

    /// Location of the persisted watch list
    pub fn watch_file(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::config_dir().map(|p| p.join(APP_DIR)))
            .map(|dir| dir.join(WATCH_FILE_NAME))
    }

    pub fn has_recipients(&self) -> bool {
        self.telegram_token.is_some() && !self.recipients.is_empty()
    }

    /// Check if a tool is enabled
    pub fn is_enabled(&self, tool_name: &str) -> bool {
        !self.disabled.iter().any(|t| t == tool_name)
    }
}

/// Names of all tools the server registers
pub fn all_tool_names() -> Vec<&'static str> {
    vec![
        "get_sensor_readings",
        "list_watches",
        "set_watch",
        "remove_watch",
        "reboot_host",
        "shutdown_host",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.disabled.is_empty());
        assert!(config.is_enabled("get_sensor_readings"));
        assert_eq!(config.watch_interval(), Duration::from_secs(5));
        assert_eq!(config.watch_threshold, 1);
        assert!(!config.has_recipients());
    }

    #[test]
    fn test_parse_partial_file_uses_defaults() {
        let config = Config::parse(
            r#"
            telegram_token = "123:abc"
            recipients = [42, 1001]
            watch_threshold = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.watch_threshold, 3);
        assert_eq!(config.watch_interval_secs, WATCH_INTERVAL_SECS_DEFAULT);
        assert_eq!(config.reboot_delay_minutes, REBOOT_DELAY_MINUTES_DEFAULT);
        assert!(config.has_recipients());
    }

    #[test]
    fn test_zero_values_fall_back_to_defaults() {
        let config = Config::parse(
            r#"
            telegram_token = "  "
            watch_interval_secs = 0
            watch_threshold = 0
            reboot_delay_minutes = 0
            shutdown_delay_minutes = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.watch_interval_secs, WATCH_INTERVAL_SECS_DEFAULT);
        assert_eq!(config.watch_threshold, WATCH_THRESHOLD_DEFAULT);
        assert_eq!(config.reboot_delay_minutes, REBOOT_DELAY_MINUTES_DEFAULT);
        assert_eq!(config.shutdown_delay_minutes, SHUTDOWN_DELAY_MINUTES_DEFAULT);
        assert!(config.telegram_token.is_none());
    }

    #[test]
    fn test_watch_file_under_data_dir() {
        let config = Config {
            data_dir: Some(PathBuf::from("/var/lib/sensorwatch")),
            ..Config::default()
        };
        assert_eq!(
            config.watch_file(),
            Some(PathBuf::from("/var/lib/sensorwatch/sensor_actions_config"))
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "disabled = [\"reboot_host\"]\nrecipients = [7]\nwatch_threshold = 4\n",
        )
        .unwrap();

        let loaded = Config::load_from(&path);
        assert!(!loaded.is_enabled("reboot_host"));
        assert_eq!(loaded.recipients, vec![7]);
        assert_eq!(loaded.watch_threshold, 4);
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::parse(include_str!("../config.toml.example")).unwrap();
        assert!(config.disabled.is_empty());
        assert!(config.telegram_token.is_none());
        assert_eq!(config.watch_interval_secs, WATCH_INTERVAL_SECS_DEFAULT);
        assert_eq!(config.shutdown_delay_minutes, SHUTDOWN_DELAY_MINUTES_DEFAULT);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "watch_threshold = \"many\"").unwrap();
        assert_eq!(Config::load_from(&path).watch_threshold, WATCH_THRESHOLD_DEFAULT);
    }
}
