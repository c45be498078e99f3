//! Logging Infrastructure
//!
//! `tracing` subscriber for hosts embedding the floor engine. Stdout by
//! default, a daily-rolling file when a log directory is given.

use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::core::FloorConfig;

/// Initialize the logger at `info`
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Initialize the logger from config: `LOG_LEVEL`, files under `WORK_DIR/logs`
pub fn init_logger_from_config(config: &FloorConfig) {
    init_logger_with_file(Some(&config.log_level), Some(&config.log_dir()));
}

/// Initialize the logger with an optional level and file output.
///
/// `RUST_LOG` wins over `log_level` when set. Calling this twice is harmless;
/// the second subscriber is not installed.
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&Path>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Failed to create log directory {}: {e}", dir.display());
        } else {
            let file_appender = tracing_appender::rolling::daily(dir, "floor-core");
            let _ = subscriber.with_writer(file_appender).with_ansi(false).try_init();
            return;
        }
    }

    let _ = subscriber.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_logger_creates_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FloorConfig::with_overrides(dir.path().to_string_lossy(), "owner-1");
        config.log_level = "debug".to_string();

        init_logger_from_config(&config);
        assert!(config.log_dir().is_dir());

        // A second install is ignored
        init_logger_from_config(&config);
    }
}
