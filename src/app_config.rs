use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};

use crate::checks::CheckOptions;
use crate::file_utils::FileManager;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Analyzer service config
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Check thresholds
    #[serde(default)]
    pub checks: CheckOptions,

    /// Violation filter config
    #[serde(default)]
    pub filter: FilterConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerConfig::default(),
            checks: CheckOptions::default(),
            filter: FilterConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Load the configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Config = FileManager::read_json(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration, falling back to defaults when the file is absent
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match FileManager::read_json_optional::<Config, _>(path)? {
            Some(config) => {
                config.validate()?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Write the configuration to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        FileManager::write_to_file(path, &json)
    }

    /// Default config file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("promolint")
            .join("conf.json")
    }

    /// Validate settings that would otherwise fail deep inside a run
    pub fn validate(&self) -> Result<()> {
        if self.analyzer.endpoint.trim().is_empty() {
            return Err(anyhow!("Analyzer endpoint cannot be empty"));
        }
        if self.analyzer.timeout_secs == 0 {
            return Err(anyhow!("Analyzer timeout must be at least 1 second"));
        }
        if !(0.0..=1.0).contains(&self.checks.disclaimer_similarity) {
            return Err(anyhow!("Disclaimer similarity threshold must be within 0.0-1.0"));
        }
        Ok(())
    }
}

/// Analyzer service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalyzerConfig {
    /// Model name
    #[serde(default = "default_analyzer_model")]
    pub model: String,

    /// API key for the service
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service endpoint URL
    #[serde(default = "default_analyzer_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff in milliseconds for exponential backoff
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            model: default_analyzer_model(),
            api_key: String::new(),
            endpoint: default_analyzer_endpoint(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Violation filter configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FilterConfig {
    /// Confidence threshold for non-critical violations
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: u8,

    /// Optional path to a false-positive pattern file
    #[serde(default)]
    pub patterns_file: Option<PathBuf>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            patterns_file: None,
        }
    }
}

fn default_analyzer_model() -> String {
    "llama3.1".to_string()
}

fn default_analyzer_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_confidence_threshold() -> u8 {
    crate::engine::DEFAULT_CONFIDENCE_THRESHOLD
}

/// Log level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: log crate level filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}
