//! Crawl-Session: durable, resumable crawl sessions with content-addressed storage
//!
//! This crate creates and reloads crawl sessions, names fetched pages
//! deterministically, bounds the number of fetches a session may admit, keeps an
//! append-only audit trail of every fetch and hands execution to an external
//! crawl engine process.

pub mod address;
pub mod config;
pub mod crawler;
pub mod session;
pub mod storage;
pub mod timestamp;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for crawl session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Malformed URL: {0}")]
    MalformedUrl(#[from] UrlError),

    #[error("Start URL {url} resolves to {found}, expected {expected}")]
    DomainMismatch {
        url: String,
        expected: String,
        found: String,
    },

    #[error("A session needs at least one start URL")]
    NoStartUrls,

    #[error("Fetch limit must be a positive integer")]
    InvalidFetchLimit,

    #[error("Corrupt manifest {}: {reason}", .path.display())]
    ManifestCorrupt { path: PathBuf, reason: String },

    #[error("Failed to launch crawl engine `{program}`: {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),
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

    #[error("Invalid engine settings: {0}")]
    Settings(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL {url}: {source}")]
    Parse {
        url: String,
        source: ::url::ParseError,
    },

    #[error("No host in URL {0}")]
    MissingHost(String),
}

/// Result type alias for crawl session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use address::{namespace_for, page_id_for};
pub use config::Config;
pub use crawler::{CrawlEngine, CrawlLauncher, EngineStatus, FrontierLimiter, ProcessEngine};
pub use session::{CompletedFetch, NewSession, Session, SessionManifest, SessionStore};
pub use crate::url::{resolve_domain, slugify};
