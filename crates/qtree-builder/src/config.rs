//! Configuration for query builders
//!
//! Loads configuration from a YAML file; environment variables always
//! override file values.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnvVar { name: String, value: String },
}

/// How closure parameter names are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameStrategy {
    /// Use names declared through `QueryBuilder::with_parameter_names` when they are valid
    #[default]
    Declared,
    /// Always generate names, ignoring declarations
    Synthesized,
}

impl std::str::FromStr for NameStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "declared" => Ok(NameStrategy::Declared),
            "synthesized" => Ok(NameStrategy::Synthesized),
            other => Err(ConfigError::InvalidEnvVar {
                name: "QTREE_PARAMETER_NAMES".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Builder behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderConfig {
    #[serde(default)]
    pub parameter_names: NameStrategy,

    /// Resolve record-like selector results into rows
    #[serde(default = "default_true")]
    pub record_selectors: bool,
}

fn default_true() -> bool {
    true
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            parameter_names: NameStrategy::Declared,
            record_selectors: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or module-specific
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: String,

    /// Output destination: stdout, file, both
    pub output: String,

    /// Directory for log files
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            output: "stdout".to_string(),
            directory: "./logs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub builder: BuilderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from YAML file with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_yaml::from_str(contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(strategy) = std::env::var("QTREE_PARAMETER_NAMES") {
            self.builder.parameter_names = strategy.parse()?;
        }
        if let Ok(records) = std::env::var("QTREE_RECORD_SELECTORS") {
            self.builder.record_selectors =
                records.parse().map_err(|_| ConfigError::InvalidEnvVar {
                    name: "QTREE_RECORD_SELECTORS".to_string(),
                    value: records.clone(),
                })?;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(output) = std::env::var("LOG_OUTPUT") {
            self.logging.output = output;
        }
        if let Ok(dir) = std::env::var("LOG_DIR") {
            self.logging.directory = dir;
        }
        Ok(())
    }

    /// Set logging environment variables for the logging module
    pub fn apply_logging_env(&self) {
        std::env::set_var("RUST_LOG", &self.logging.level);
        std::env::set_var("LOG_FORMAT", &self.logging.format);
        std::env::set_var("LOG_OUTPUT", &self.logging.output);
        std::env::set_var("LOG_DIR", &self.logging.directory);
    }
}
