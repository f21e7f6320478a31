//! HTTP fetcher implementation
//!
//! One GET per page, sent with the configured user agent and referrer. Nothing
//! is retried: a transport failure is reported once and the caller records it.

use crate::config::ConnectionConfig;
use reqwest::header::{CONTENT_TYPE, REFERER};
use reqwest::Client;
use std::time::Duration;

/// Status code stored for pages that could not be fetched at all
pub const TRANSPORT_FAILURE_CODE: u16 = 500;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched an HTML page
    Success {
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// Server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Page is not HTML (Content-Type mismatch)
    ContentMismatch {
        /// The HTTP status code
        status_code: u16,
        /// The actual Content-Type received
        content_type: String,
    },

    /// Network error (connection refused, timeout, etc.)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    /// Status code to store for the page
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Success { status_code, .. }
            | Self::HttpError { status_code }
            | Self::ContentMismatch { status_code, .. } => *status_code,
            Self::NetworkError { .. } => TRANSPORT_FAILURE_CODE,
        }
    }

    /// Body to store for the page, empty unless the fetch succeeded
    pub fn body(&self) -> &str {
        match self {
            Self::Success { body, .. } => body,
            _ => "",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// HTTP client carrying the crawler's identity
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    referrer: String,
}

impl Fetcher {
    /// Builds a fetcher
    ///
    /// # Arguments
    ///
    /// * `connection` - User agent and referrer to send
    /// * `timeout` - Timeout for a whole request
    ///
    /// # Returns
    ///
    /// * `Ok(Fetcher)` - Successfully built HTTP client
    /// * `Err(reqwest::Error)` - Failed to build client
    pub fn new(connection: &ConnectionConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(connection.user_agent.clone())
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            referrer: connection.referrer.clone(),
        })
    }

    /// Fetches a URL
    ///
    /// # Arguments
    ///
    /// * `url` - The absolute URL to fetch
    ///
    /// # Returns
    ///
    /// A FetchResult indicating success or the type of failure
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let response = match self
            .client
            .get(url)
            .header(REFERER, &self.referrer)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return FetchResult::NetworkError {
                    error: describe_error(&e),
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            return FetchResult::HttpError {
                status_code: status.as_u16(),
            };
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        // Servers that omit the header are assumed to serve HTML
        if !content_type.is_empty() && !content_type.contains("html") {
            return FetchResult::ContentMismatch {
                status_code: status.as_u16(),
                content_type,
            };
        }

        match response.text().await {
            Ok(body) => FetchResult::Success {
                status_code: status.as_u16(),
                body,
            },
            Err(e) => FetchResult::NetworkError {
                error: describe_error(&e),
            },
        }
    }
}

fn describe_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("Request timeout: {}", error)
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else {
        error.to_string()
    }
}
