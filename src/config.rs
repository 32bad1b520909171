//! Configuration file parser for `feedwatch.toml`.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning for each one
//! since they are usually typos. Command-line flags are layered on top with
//! [`Overrides`].
use crate::diff::MissingDatePolicy;
use crate::feed::{TrustConfig, MAX_FEED_SIZE};
use crate::report::{OutputFormat, ReportSettings};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_URL: &str = "https://opendata.citywindsor.ca/RSS";
pub const DEFAULT_PATH: &str = "./feeds/opendata.xml";
pub const DEFAULT_CONFIG_FILE: &str = "feedwatch.toml";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid feed URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote feed to watch.
    pub url: String,

    /// Local snapshot of the last fetched feed.
    pub path: PathBuf,

    /// Extra PEM certificate authority trusted for the fetch.
    pub ca_cert: Option<PathBuf>,

    pub format: OutputFormat,

    /// Report destination. `None` writes to stdout.
    pub output: Option<PathBuf>,

    pub timeout_secs: u64,

    pub max_feed_bytes: usize,

    pub missing_dates: MissingDatePolicy,

    pub report: ReportSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            path: PathBuf::from(DEFAULT_PATH),
            ca_cert: None,
            format: OutputFormat::default(),
            output: None,
            timeout_secs: 30,
            max_feed_bytes: MAX_FEED_SIZE,
            missing_dates: MissingDatePolicy::default(),
            report: ReportSettings::default(),
        }
    }
}

/// Values given on the command line; `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub path: Option<PathBuf>,
    pub ca_cert: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
    pub link_suffix: Option<String>,
    pub missing_dates: Option<MissingDatePolicy>,
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 9] = [
        "url",
        "path",
        "ca_cert",
        "format",
        "output",
        "timeout_secs",
        "max_feed_bytes",
        "missing_dates",
        "report",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), url = %config.url, "Loaded configuration");
        Ok(config)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.url {
            self.url = url;
        }
        if let Some(path) = overrides.path {
            self.path = path;
        }
        if let Some(ca_cert) = overrides.ca_cert {
            self.ca_cert = Some(ca_cert);
        }
        if let Some(format) = overrides.format {
            self.format = format;
        }
        if let Some(output) = overrides.output {
            self.output = Some(output);
        }
        if let Some(suffix) = overrides.link_suffix {
            self.report.link_suffix = Some(suffix);
        }
        if let Some(policy) = overrides.missing_dates {
            self.missing_dates = policy;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ConfigError::InvalidUrl {
                    url: self.url.clone(),
                    reason: format!("unsupported scheme '{}' (only http/https allowed)", scheme),
                })
            }
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be at least 1".into()));
        }
        if self.max_feed_bytes == 0 {
            return Err(ConfigError::Invalid("max_feed_bytes must be at least 1".into()));
        }
        Ok(())
    }

    pub fn trust(&self) -> TrustConfig {
        TrustConfig {
            ca_cert: self.ca_cert.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
