//! Configuration file parser for ~/.config/feedmill/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as warnings so typos surface.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

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

    /// A value parsed correctly but is outside its allowed range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file. Relative paths resolve against the working directory.
    pub database_path: PathBuf,

    /// Maximum number of feeds fetched concurrently in one cycle.
    pub concurrency: usize,

    /// Seconds between cycle starts.
    pub interval_secs: u64,

    /// Network timeout for a single feed fetch, in seconds.
    pub fetch_timeout_secs: u64,

    /// Feed bodies larger than this are rejected.
    pub max_feed_size_bytes: usize,

    /// User-Agent header sent with every feed request.
    pub user_agent: String,

    /// Permit registering feeds on loopback/private hosts.
    pub allow_private_hosts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("feedmill.db"),
            concurrency: 10,
            interval_secs: 60,
            fetch_timeout_secs: 10,
            max_feed_size_bytes: 10 * 1024 * 1024,
            user_agent: concat!("feedmill/", env!("CARGO_PKG_VERSION")).to_string(),
            allow_private_hosts: false,
        }
    }
}

impl Config {
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "database_path",
        "concurrency",
        "interval_secs",
        "fetch_timeout_secs",
        "max_feed_size_bytes",
        "user_agent",
        "allow_private_hosts",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    ///
    /// Ranges are not checked here so command-line overrides can still
    /// replace a bad value; call [`Config::validate`] once they are applied.
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

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

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
        tracing::info!(
            path = %path.display(),
            concurrency = config.concurrency,
            interval_secs = config.interval_secs,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be greater than 0".into()));
        }
        if self.interval_secs == 0 {
            return Err(ConfigError::Invalid("interval_secs must be greater than 0".into()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "fetch_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.max_feed_size_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_feed_size_bytes must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================
