//! Structured logging bootstrap for applications embedding the builder
//!
//! Library code only emits `tracing` events; hosts call [`init`] once to
//! install a subscriber configured from the environment.
//!
//! ```no_run
//! let config = qtree_builder::Config::load("qtree.yaml")?;
//! config.apply_logging_env();
//! qtree_builder::logging::init();
//! let builder = qtree_builder::QueryBuilder::from_config(&config.builder);
//! # drop(builder);
//! # Ok::<(), qtree_builder::ConfigError>(())
//! ```

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format for development
    Pretty,
    /// JSON format for production (structured logging)
    Json,
    /// Compact format for testing
    Compact,
}

impl LogFormat {
    /// Parse from environment variable
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") => LogFormat::Compact,
            Ok(_) | Err(_) => LogFormat::Pretty,
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    File,
    Both,
}

impl LogOutput {
    /// Parse from environment variable
    pub fn from_env() -> Self {
        match std::env::var("LOG_OUTPUT").as_deref() {
            Ok("file") => LogOutput::File,
            Ok("both") => LogOutput::Both,
            Ok(_) | Err(_) => LogOutput::Stdout,
        }
    }
}

const LOG_FILE: &str = "qtree.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn file_appender() -> RollingFileAppender {
    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
    std::fs::create_dir_all(&log_dir).ok();
    RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE)
}

/// Initialize the logging system
///
/// Environment variables:
/// - `RUST_LOG`: Log level (e.g., "debug", "qtree_builder=trace")
/// - `LOG_FORMAT`: Output format ("pretty", "json", "compact")
/// - `LOG_OUTPUT`: Where to write logs ("stdout", "file", "both")
/// - `LOG_DIR`: Directory for log files (default: "./logs")
///
/// Does nothing when a global subscriber is already installed.
pub fn init() {
    let format = LogFormat::from_env();
    let output = LogOutput::from_env();

    let stdout_layer = match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_thread_ids(true)
            .with_target(true)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_current_span(true).boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };
    let file_layer = || {
        fmt::layer()
            .with_writer(file_appender())
            .with_ansi(false)
            .boxed()
    };

    let layers = match output {
        LogOutput::Stdout => vec![stdout_layer],
        LogOutput::File => vec![file_layer()],
        LogOutput::Both => vec![stdout_layer, file_layer()],
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(layers)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(format = ?format, output = ?output, "Logging system initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_and_output_from_env() {
        std::env::set_var("LOG_FORMAT", "json");
        assert_eq!(LogFormat::from_env(), LogFormat::Json);

        std::env::set_var("LOG_FORMAT", "compact");
        assert_eq!(LogFormat::from_env(), LogFormat::Compact);

        std::env::remove_var("LOG_FORMAT");
        assert_eq!(LogFormat::from_env(), LogFormat::Pretty);

        std::env::set_var("LOG_OUTPUT", "both");
        assert_eq!(LogOutput::from_env(), LogOutput::Both);

        std::env::remove_var("LOG_OUTPUT");
        assert_eq!(LogOutput::from_env(), LogOutput::Stdout);
    }

    #[test]
    fn test_init_twice_keeps_first_subscriber() {
        init();
        init();
        tracing::info!("still logging");
    }
}
