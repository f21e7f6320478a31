//! Statistics generation from the index database
//!
//! This module provides a read-only rollup of sites, pages and lemmas.

use crate::state::SiteStatus;
use crate::storage::Storage;
use crate::LemmaSearchError;
use serde::Serialize;

/// Totals across all sites
#[derive(Debug, Clone, Serialize)]
pub struct TotalStatistics {
    pub sites: u64,
    pub pages: u64,
    pub lemmas: u64,
    /// Whether a crawl is currently running
    pub indexing: bool,
}

/// Details of one site
#[derive(Debug, Clone, Serialize)]
pub struct SiteStatistics {
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    /// RFC 3339 timestamp of the last status change or stored page
    pub status_time: String,
    pub error: Option<String>,
    pub pages: u64,
    pub lemmas: u64,
}

/// Index statistics summary
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total: TotalStatistics,
    pub detailed: Vec<SiteStatistics>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `indexing` - Whether a crawl is currently running
///
/// # Returns
///
/// * `Ok(Statistics)` - Successfully loaded statistics
/// * `Err(LemmaSearchError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage, indexing: bool) -> Result<Statistics, LemmaSearchError> {
    let sites = storage.list_sites()?;

    let mut detailed = Vec::with_capacity(sites.len());
    for site in sites {
        detailed.push(SiteStatistics {
            pages: storage.count_pages_by_site(site.id)?,
            lemmas: storage.count_lemmas_by_site(site.id)?,
            url: site.url,
            name: site.name,
            status: site.status,
            status_time: site.status_time,
            error: site.last_error,
        });
    }

    Ok(Statistics {
        total: TotalStatistics {
            sites: detailed.len() as u64,
            pages: storage.count_pages()?,
            lemmas: storage.count_lemmas()?,
            indexing,
        },
        detailed,
    })
}

/// Prints statistics to stdout
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &Statistics) {
    println!("=== Index Statistics ===\n");

    println!("Overview:");
    println!("  Sites: {}", stats.total.sites);
    println!("  Pages: {}", stats.total.pages);
    println!("  Lemmas: {}", stats.total.lemmas);
    println!(
        "  Indexing: {}",
        if stats.total.indexing { "running" } else { "idle" }
    );
    println!();

    for site in &stats.detailed {
        println!("{} ({})", site.name, site.url);
        println!("  Status: {} at {}", site.status, site.status_time);
        if let Some(error) = &site.error {
            println!("  Error: {}", error);
        }
        println!("  Pages: {}", site.pages);
        println!("  Lemmas: {}", site.lemmas);
        println!();
    }
}
