//! Sumi-Harvest: an incremental archiver for API-less social front-ends
//!
//! This crate harvests posts, their reply threads, author profiles and
//! attached media from a rendered web front-end, across repeated runs,
//! without re-processing content that is already archived.

pub mod config;
pub mod harvester;
pub mod model;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Sumi-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] harvester::NavigationError),

    #[error("Media error: {0}")]
    Media(#[from] harvester::MediaError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

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
}

/// Result type alias for Sumi-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use harvester::{run_harvest, Harvester, ScrapeOutcome};
pub use model::{AttachmentRecord, ProfileRecord, Record};
pub use state::{PageOutcome, RescrapeMode, Scope};
