//! Sanctions-Sweep: a concurrent, resilient sanctions-list collector
//!
//! This crate drives one navigation session per country through a public
//! sanctions registry (search, result list, detail page, back), extracts the
//! listing rows, detail attributes, aliases and addresses of every matched
//! entity, and merges the per-country results into one deduplicated dataset.

pub mod collector;
pub mod config;
pub mod extract;
pub mod model;
pub mod navigation;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for Sanctions-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Country discovery failed: {0}")]
    Discovery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector for {name}: {selector}")]
    InvalidSelector { name: String, selector: String },
}

/// Failures raised by a navigation session
///
/// `Transient` failures are retried with a bounded budget; `Fatal` failures
/// abandon the current country. `NotFound` means the page did not contain the
/// control we tried to use.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("transient navigation failure: {message}")]
    Transient { message: String },

    #[error("fatal navigation failure: {message}")]
    Fatal { message: String },

    #[error("no element matches selector `{selector}`")]
    NotFound { selector: String },
}

impl NavigationError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    pub fn not_found(selector: impl Into<String>) -> Self {
        Self::NotFound {
            selector: selector.into(),
        }
    }

    /// Returns true if the operation may succeed when repeated
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Returns true if the current country cannot continue
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}

/// Errors raised while turning page content into records
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("page structure mismatch: {0}")]
    Mismatch(String),

    #[error("cannot assemble entity from row `{row}`: {reason}")]
    Assembly { row: String, reason: String },
}

/// Result type alias for Sanctions-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for navigation operations
pub type NavigationResult<T> = std::result::Result<T, NavigationError>;

// Re-export commonly used types
pub use collector::{collect_now, CancelToken, CollectionCoordinator, EntityCollector, RunSummary};
pub use config::Config;
pub use model::{AddressEntry, AliasEntry, CountryStatus, Entity, SearchRow};
pub use navigation::{HttpSession, NavigationSession, SessionFactory};
pub use output::{Dataset, DatasetBuilder};
