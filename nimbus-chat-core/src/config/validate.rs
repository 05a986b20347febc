//! Configuration validation rules.

use super::schema::Config;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    let base_url = config.server.base_url.trim();
    if base_url.is_empty() {
        errors.push("server.base_url must not be empty".to_string());
    } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        errors.push("server.base_url must start with http:// or https://".to_string());
    }
    if config.server.timeout_secs == Some(0) {
        errors.push("server.timeout_secs must be > 0 when set".to_string());
    }
    for name in config.server.extra_headers.keys() {
        if name.trim().is_empty() {
            errors.push("server.extra_headers must not contain empty header names".to_string());
            break;
        }
    }

    if let Some(model) = &config.chat.model {
        if model.trim().is_empty() {
            errors.push("chat.model must not be blank when set".to_string());
        }
    }

    if !LOG_LEVELS.contains(&config.logging.level.to_ascii_lowercase().as_str()) {
        errors.push(format!(
            "logging.level must be one of {}",
            LOG_LEVELS.join(", ")
        ));
    }
    let format = config.logging.format.to_ascii_lowercase();
    if format != "text" && format != "json" {
        errors.push("logging.format must be text or json".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Config(errors.join("; ")))
    }
}
