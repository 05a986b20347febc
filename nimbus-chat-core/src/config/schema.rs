//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration for nimbus-chat
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Chat server connection
    #[serde(default)]
    pub server: ServerConfig,
    /// Conversation defaults
    #[serde(default)]
    pub chat: ChatConfig,
    /// Client-side state storage
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Chat server connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL the `/chat/...` paths are appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Session cookie sent with every request (e.g. `session=...`)
    #[serde(default)]
    pub session_cookie: Option<String>,
    /// Extra headers sent with every request
    #[serde(default)]
    pub extra_headers: HashMap<String, String>,
    /// Request timeout; the transport default applies when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            session_cookie: None,
            extra_headers: HashMap::new(),
            timeout_secs: None,
        }
    }
}

/// Conversation defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatConfig {
    /// Preferred model; the first listed model is used when unset or unavailable
    #[serde(default)]
    pub model: Option<String>,
}

/// Client-side state storage
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// State file; defaults to `state.json` in the config directory
    #[serde(default)]
    pub state_file: Option<String>,
}

impl StorageConfig {
    /// Resolve the state file against the config directory
    pub fn state_path(&self, config_dir: &std::path::Path) -> PathBuf {
        match self.state_file.as_deref().map(str::trim) {
            Some(file) if !file.is_empty() => {
                let path = PathBuf::from(file);
                if path.is_absolute() {
                    path
                } else {
                    config_dir.join(path)
                }
            }
            _ => config_dir.join("state.json"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}
