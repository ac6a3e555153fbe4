//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe store, paging and logging knobs in one serde-friendly struct.
//! - Reject nonsensical values before any connection is opened.
//!
//! # Invariants
//! - Every field has a default; an empty JSON object is a valid config.
//! - Discovery (env vars, files) is the host process's job.

use crate::logging::{default_log_level, init_logging, LoggingError};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const MAX_PAGE_SIZE: u32 = 200;
pub const DEFAULT_TRAVERSAL_BATCH_SIZE: u32 = 256;

/// Configuration consumed by `open_store` and the core services.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// SQLite file path. `None` selects an in-memory database.
    pub db_path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    /// Page size used when a listing request does not carry one.
    pub default_page_size: u32,
    /// Upper clamp for requested page sizes.
    pub max_page_size: u32,
    /// Edge rows fetched per round-trip during traversal.
    pub traversal_batch_size: u32,
    pub log_level: Option<String>,
    /// Absolute directory for rolling log files. `None` disables file logging.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            traversal_batch_size: DEFAULT_TRAVERSAL_BATCH_SIZE,
            log_level: None,
            log_dir: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    /// A size knob is zero.
    ZeroValue(&'static str),
    DefaultPageSizeExceedsMax { default: u32, max: u32 },
    Logging(LoggingError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::ZeroValue(field) => write!(f, "config field `{field}` must be > 0"),
            Self::DefaultPageSizeExceedsMax { default, max } => write!(
                f,
                "default_page_size ({default}) must not exceed max_page_size ({max})"
            ),
            Self::Logging(err) => write!(f, "logging init failed: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Logging(err) => Some(err),
            _ => None,
        }
    }
}

impl CoreConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_page_size == 0 {
            return Err(ConfigError::ZeroValue("default_page_size"));
        }
        if self.max_page_size == 0 {
            return Err(ConfigError::ZeroValue("max_page_size"));
        }
        if self.traversal_batch_size == 0 {
            return Err(ConfigError::ZeroValue("traversal_batch_size"));
        }
        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::DefaultPageSizeExceedsMax {
                default: self.default_page_size,
                max: self.max_page_size,
            });
        }
        Ok(())
    }

    /// Applies the requested page size policy: `None`/0 → default, clamp to max.
    pub fn page_size(&self, requested: Option<u32>) -> u32 {
        match requested {
            None | Some(0) => self.default_page_size,
            Some(value) => value.min(self.max_page_size),
        }
    }

    /// Starts file logging when `log_dir` is set. No-op otherwise.
    pub fn init_logging(&self) -> Result<(), ConfigError> {
        let Some(log_dir) = self.log_dir.as_ref() else {
            return Ok(());
        };
        let level = self.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).map_err(ConfigError::Logging)
    }
}
