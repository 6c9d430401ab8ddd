//! Configuration management for the poll
//!
//! Loads the option set, storage location and logging settings from
//! environment variables, with a `.env` file honoured when present.

use crate::projector::RoundingMode;
use crate::storage::{FileStore, MemoryStore, PersistedStore};
use crate::types::PollOptions;
use crate::{Result, config_error};
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;

/// Options used when `POLL_OPTIONS` is unset
pub const DEFAULT_OPTIONS: &str = "pizza=Піца,burger=Бургер,salad=Салат";

/// Where ballot state is kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StorageConfig {
    /// Process memory; nothing survives a restart
    Memory,

    /// JSON document at the given path
    File(PathBuf),
}

impl StorageConfig {
    /// Open the configured backend
    pub fn open(&self) -> Result<Box<dyn PersistedStore>> {
        match self {
            Self::Memory => Ok(Box::new(MemoryStore::new())),
            Self::File(path) => Ok(Box::new(FileStore::open(path)?)),
        }
    }
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum LogFormat {
    #[default]
    Full,
    Pretty,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(config_error!("unknown log format '{}'", other)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize)]
pub struct LoggingConfig {
    /// Default level for this crate when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

/// Application configuration
#[derive(Debug, Clone, Serialize)]
pub struct PollConfig {
    pub options: PollOptions,
    pub storage: StorageConfig,
    pub rounding: RoundingMode,
    pub logging: LoggingConfig,
}

impl PollConfig {
    /// Load configuration from environment variables
    ///
    /// - `POLL_OPTIONS`: comma-separated `key=Label` pairs
    /// - `POLL_STORE_PATH`: JSON store file; memory when unset
    /// - `POLL_ROUNDING`: `half-up` (default) or `largest-remainder`
    /// - `LOG_LEVEL`, `LOG_FORMAT` (`full`, `pretty`, `compact` or `json`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let options = lookup("POLL_OPTIONS")
            .unwrap_or_else(|| DEFAULT_OPTIONS.to_string())
            .parse::<PollOptions>()
            .map_err(|e| config_error!("Invalid POLL_OPTIONS: {}", e))?;

        let storage = match lookup("POLL_STORE_PATH") {
            Some(path) if !path.trim().is_empty() => StorageConfig::File(PathBuf::from(path)),
            _ => StorageConfig::Memory,
        };

        let rounding = match lookup("POLL_ROUNDING") {
            Some(value) => value.parse()?,
            None => RoundingMode::default(),
        };

        let logging = LoggingConfig {
            level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            format: match lookup("LOG_FORMAT") {
                Some(value) => value.parse()?,
                None => LogFormat::default(),
            },
        };

        Ok(Self {
            options,
            storage,
            rounding,
            logging,
        })
    }

    /// Create configuration for testing
    pub fn for_testing() -> Self {
        Self {
            options: PollOptions::lunch(),
            storage: StorageConfig::Memory,
            rounding: RoundingMode::HalfUp,
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }
}
