//! Configuration loading and management

use super::schema::Config;
use super::validate::validate_config;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader with the default config directory
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".nimbus-chat"))
            .unwrap_or_else(|| PathBuf::from(".nimbus-chat"));

        Self { config_dir }
    }

    /// Create a new config loader with a custom config directory
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file and environment
    pub fn load(&self) -> crate::Result<Config> {
        let config_path = self.config_dir.join("config.json");
        let mut merged = serde_json::to_value(Config::default())?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let file_value: Value = serde_json::from_str(&content)?;
            merge_values(&mut merged, file_value);
        }

        apply_alias_overrides(&mut merged);
        apply_path_overrides(&mut merged);

        let config: Config = serde_json::from_value(merged)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let config_path = self.config_dir.join("config.json");
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Where client-side state is kept for `config`
    pub fn state_path(&self, config: &Config) -> PathBuf {
        config.storage.state_path(&self.config_dir)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Overlay `overlay` onto `base`; objects merge key by key, anything else replaces
fn merge_values(base: &mut Value, overlay: Value) {
    let Value::Object(overlay_map) = overlay else {
        *base = overlay;
        return;
    };
    let Value::Object(base_map) = base else {
        *base = Value::Object(overlay_map);
        return;
    };
    for (key, value) in overlay_map {
        match base_map.get_mut(&key) {
            Some(existing) => merge_values(existing, value),
            None => {
                base_map.insert(key, value);
            }
        }
    }
}

/// Env values are JSON when they parse as JSON, plain strings otherwise
fn parse_env_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Set `value` at `path`, creating (or replacing with) objects on the way down
fn set_path_value<S: AsRef<str>>(root: &mut Value, path: &[S], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return;
    };

    let mut nested = Map::new();
    nested.insert(last.as_ref().to_string(), value);
    let overlay = parents.iter().rev().fold(Value::Object(nested), |inner, key| {
        let mut map = Map::new();
        map.insert(key.as_ref().to_string(), inner);
        Value::Object(map)
    });
    merge_values(root, overlay);
}

fn apply_alias_overrides(config: &mut Value) {
    const ALIASES: [(&str, &[&str]); 3] = [
        ("NIMBUS_CHAT_URL", &["server", "base_url"]),
        ("NIMBUS_SESSION_COOKIE", &["server", "session_cookie"]),
        ("NIMBUS_CHAT_MODEL", &["chat", "model"]),
    ];

    for (env_key, path) in ALIASES {
        if let Ok(value) = std::env::var(env_key) {
            set_path_value(config, path, Value::String(value));
        }
    }
}

/// `NIMBUS_CHAT__SERVER__TIMEOUT_SECS=30` sets `server.timeout_secs`
fn apply_path_overrides(config: &mut Value) {
    const PREFIX: &str = "NIMBUS_CHAT__";
    for (key, value) in std::env::vars() {
        let Some(suffix) = key.strip_prefix(PREFIX) else {
            continue;
        };
        let segments: Vec<String> = suffix
            .split("__")
            .filter(|s| !s.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();
        if !segments.is_empty() {
            set_path_value(config, &segments, parse_env_value(&value));
        }
    }
}
