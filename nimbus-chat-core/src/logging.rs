//! Logging setup
//!
//! Console output goes to stderr so it never interleaves with the chat
//! transcript on stdout; a daily-rolling file keeps the full record.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::schema::LoggingConfig;

/// Prefix of the rolling log files (`nimbus-chat.log.YYYY-MM-DD`)
const LOG_FILE_PREFIX: &str = "nimbus-chat.log";

/// Days a rolled log file is kept
const LOG_RETENTION_DAYS: u64 = 7;

/// Initialize the logging system
///
/// Keep the returned guard alive for the life of the process, otherwise
/// buffered file output is lost.
pub fn init_logging(config: &LoggingConfig) -> WorkerGuard {
    let filter = build_filter(config);

    let format_str = std::env::var("LOG_FORMAT").unwrap_or_else(|_| config.format.clone());
    let is_json = format_str.eq_ignore_ascii_case("json");

    let file_appender = tracing_appender::rolling::daily(&config.dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = if is_json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let file_layer = if is_json {
        fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    // try_init: a second call (tests, embedding) keeps the first subscriber
    let _ = Registry::default()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if let Err(e) = cleanup_old_logs(&config.dir, LOG_RETENTION_DAYS) {
        eprintln!("Failed to clean up old logs: {}", e);
    }

    guard
}

/// `RUST_LOG` wins over the configured level; module overrides apply on top
fn build_filter(config: &LoggingConfig) -> EnvFilter {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    for (module, level) in &config.overrides {
        match format!("{}={}", module, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(_) => eprintln!("Invalid log directive: {}={}", module, level),
        }
    }
    filter
}

/// Remove rolled log files older than `days` days
fn cleanup_old_logs(dir: &str, days: u64) -> std::io::Result<()> {
    let path = Path::new(dir);
    if !path.exists() {
        return Ok(());
    }

    let now = std::time::SystemTime::now();
    let threshold = std::time::Duration::from_secs(days * 24 * 3600);

    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|name| name.starts_with(LOG_FILE_PREFIX))
            .unwrap_or(false);
        if !is_log {
            continue;
        }

        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if matches!(age, Some(age) if age > threshold) {
            if let Err(e) = std::fs::remove_file(&path) {
                eprintln!("Failed to remove old log file {:?}: {}", path, e);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cleanup_missing_dir_is_ok() {
        assert!(cleanup_old_logs("/nonexistent/nimbus-chat-logs", 7).is_ok());
    }

    #[test]
    fn test_cleanup_keeps_recent_and_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        let recent = temp_dir.path().join("nimbus-chat.log.2099-01-01");
        let other = temp_dir.path().join("notes.txt");
        std::fs::write(&recent, "x").unwrap();
        std::fs::write(&other, "y").unwrap();

        cleanup_old_logs(temp_dir.path().to_str().unwrap(), 7).unwrap();

        assert!(recent.exists());
        assert!(other.exists());
    }

    #[test]
    fn test_invalid_override_is_skipped() {
        let mut config = LoggingConfig::default();
        config
            .overrides
            .insert("nimbus_chat_core".to_string(), "not-a-level".to_string());
        config
            .overrides
            .insert("reqwest".to_string(), "error".to_string());
        let filter = build_filter(&config);
        assert!(filter.to_string().contains("reqwest=error"));
    }
}
