use crate::url::DEFAULT_SKIP_EXTENSIONS;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Lemma-Search
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub sites: Vec<SiteEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Delay before each page fetch (milliseconds)
    #[serde(rename = "politeness-delay-ms", default = "default_politeness_delay_ms")]
    pub politeness_delay_ms: u64,

    /// Maximum number of page fetches in flight per crawl session
    #[serde(
        rename = "max-concurrent-fetches",
        default = "default_max_concurrent_fetches"
    )]
    pub max_concurrent_fetches: u32,

    /// Timeout for a single page request (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// File extensions that are never fetched
    #[serde(rename = "skip-extensions", default = "default_skip_extensions")]
    pub skip_extensions: Vec<String>,
}

impl CrawlerConfig {
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            politeness_delay_ms: default_politeness_delay_ms(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            request_timeout_ms: default_request_timeout_ms(),
            skip_extensions: default_skip_extensions(),
        }
    }
}

/// Identity headers sent with every request
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_referrer")]
    pub referrer: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            referrer: default_referrer(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Search tuning
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Share of all indexed pages at which a lemma is too common to search for
    #[serde(rename = "frequency-threshold", default = "default_frequency_threshold")]
    pub frequency_threshold: f64,

    /// Words kept on each side of a highlighted match
    #[serde(rename = "snippet-window", default = "default_snippet_window")]
    pub snippet_window: usize,

    /// Page size used when a search does not give a limit
    #[serde(rename = "default-limit", default = "default_limit")]
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            frequency_threshold: default_frequency_threshold(),
            snippet_window: default_snippet_window(),
            default_limit: default_limit(),
        }
    }
}

/// A site to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Root URL; only pages under it are crawled
    pub url: String,

    /// Display name
    pub name: String,
}

fn default_politeness_delay_ms() -> u64 {
    300
}

fn default_max_concurrent_fetches() -> u32 {
    8
}

fn default_request_timeout_ms() -> u64 {
    60_000
}

fn default_skip_extensions() -> Vec<String> {
    DEFAULT_SKIP_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_user_agent() -> String {
    format!("LemmaSearchBot/{}", env!("CARGO_PKG_VERSION"))
}

fn default_referrer() -> String {
    "http://www.google.com".to_string()
}

fn default_frequency_threshold() -> f64 {
    0.95
}

fn default_snippet_window() -> usize {
    5
}

fn default_limit() -> usize {
    20
}
