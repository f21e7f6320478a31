use crate::config::types::{Config, ConnectionConfig, CrawlerConfig, SearchConfig, SiteEntry};
use crate::url::site_root;
use crate::ConfigError;
use std::collections::HashSet;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_connection_config(&config.connection)?;
    validate_search_config(&config.search)?;

    if config.storage.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 256 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 256, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_ms must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    Ok(())
}

/// Validates identity headers
fn validate_connection_config(config: &ConnectionConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates search tuning
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if !(config.frequency_threshold > 0.0 && config.frequency_threshold <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "frequency_threshold must be in (0, 1], got {}",
            config.frequency_threshold
        )));
    }

    if config.default_limit == 0 {
        return Err(ConfigError::Validation(
            "default_limit must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates site entries: at least one, valid unique roots, non-empty names
fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    if sites.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[sites]] entry is required".to_string(),
        ));
    }

    let mut roots = HashSet::new();
    for site in sites {
        if site.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Site '{}' must have a name",
                site.url
            )));
        }

        let root = site_root(&site.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid site URL '{}': {}", site.url, e))
        })?;

        if !roots.insert(root.to_string()) {
            return Err(ConfigError::Validation(format!(
                "Site '{}' is listed more than once",
                root
            )));
        }
    }

    Ok(())
}
