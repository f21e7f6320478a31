//! Lemma-Search: a site crawler with a lemma-based full-text index
//!
//! This crate crawls a fixed set of configured web sites, builds a morphologically
//! normalized inverted index of their pages, and serves ranked full-text search with
//! highlighted snippets.

pub mod config;
pub mod crawler;
pub mod indexer;
pub mod lemma;
pub mod morph;
pub mod output;
pub mod search;
pub mod service;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Lemma-Search operations
#[derive(Debug, Error)]
pub enum LemmaSearchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Empty search query")]
    EmptyQuery,

    #[error("Page is outside the sites listed in the configuration: {url}")]
    PageOutsideSites { url: String },

    #[error("Indexing is already running")]
    IndexingAlreadyRunning,

    #[error("Indexing is not running")]
    IndexingNotRunning,

    #[error("Indexing is in progress, wait for it to finish")]
    IndexingInProgress,

    #[error("Crawl task failed: {0}")]
    Task(String),
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

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("URL {url} is not under site root {root}")]
    OutsideRoot { url: String, root: String },
}

/// Result type alias for Lemma-Search operations
pub type Result<T> = std::result::Result<T, LemmaSearchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use state::{CancelToken, SiteStatus};
pub use url::{page_path, site_root};
