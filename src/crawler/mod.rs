//! Crawler module for site fetching and indexing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with the configured identity headers
//! - HTML link extraction restricted to one site
//! - The session-scoped set of claimed URLs
//! - Per-site crawl sessions (fan-out/fan-in task tree)
//! - Coordination of all configured sites and single-page reindexing

mod claims;
mod coordinator;
mod fetcher;
mod parser;
mod session;

pub use claims::ClaimedUrls;
pub use coordinator::{Coordinator, IndexedPage, SiteReport};
pub use fetcher::{FetchResult, Fetcher, TRANSPORT_FAILURE_CODE};
pub use parser::extract_links;
pub use session::{CrawlResources, CrawlSession, STOPPED_BY_USER};
