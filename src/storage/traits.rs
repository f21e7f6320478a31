//! Storage traits and error types
//!
//! This module defines the repository operations the crawler, indexer and
//! search engine need, and the associated error types.

use crate::state::SiteStatus;
use crate::storage::{LemmaRecord, LemmaUpsert, PageRecord, Posting, SiteRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Site not found: {0}")]
    SiteNotFound(i64),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Lemma not found: {0}")]
    LemmaNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Writers take `&mut self`; callers share a backend through
/// [`SharedStorage`](crate::storage::SharedStorage), whose mutex serializes them.
pub trait Storage {
    // ===== Sites =====

    /// Creates a site row and returns its ID
    ///
    /// # Arguments
    ///
    /// * `url` - Normalized site root URL (unique)
    /// * `name` - Display name
    /// * `status` - Initial lifecycle status
    fn create_site(&mut self, url: &str, name: &str, status: SiteStatus) -> StorageResult<i64>;

    /// Gets a site by ID
    fn get_site(&self, site_id: i64) -> StorageResult<SiteRecord>;

    /// Gets a site by its root URL
    fn get_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>>;

    /// Sets the status and last error of a site, refreshing its status time
    fn update_site_status(
        &mut self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()>;

    /// Refreshes the status time of a site
    fn touch_site(&mut self, site_id: i64) -> StorageResult<()>;

    /// Deletes a site with all its pages, lemmas and index entries
    fn delete_site(&mut self, site_id: i64) -> StorageResult<()>;

    /// Lists all sites ordered by ID
    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>>;

    // ===== Pages =====

    /// Stores a fetched page and returns its ID
    ///
    /// # Arguments
    ///
    /// * `site_id` - Owning site
    /// * `path` - URL path relative to the site root
    /// * `code` - HTTP status code, 500 for transport failures
    /// * `content` - Raw HTML, empty on failure
    fn insert_page(
        &mut self,
        site_id: i64,
        path: &str,
        code: u16,
        content: &str,
    ) -> StorageResult<i64>;

    /// Gets a page by ID
    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord>;

    /// Gets a page by site and path
    fn get_page_by_path(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>>;

    /// Deletes a page and its index entries
    ///
    /// Every lemma the page contributed loses one unit of frequency; lemmas
    /// left with no pages are deleted.
    fn delete_page(&mut self, page_id: i64) -> StorageResult<()>;

    /// Counts the pages of a site
    fn count_pages_by_site(&self, site_id: i64) -> StorageResult<u64>;

    /// Counts pages across all sites
    fn count_pages(&self) -> StorageResult<u64>;

    // ===== Lemmas =====

    /// Gets a lemma of a site
    fn get_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>>;

    /// Gets the rows for a lemma text across all sites
    fn get_lemmas_by_text(&self, lemma: &str) -> StorageResult<Vec<LemmaRecord>>;

    /// Gets all lemmas of a site
    fn get_lemmas_by_site(&self, site_id: i64) -> StorageResult<Vec<LemmaRecord>>;

    /// Gets the stored surface forms of a lemma
    fn get_surface_forms(&self, lemma_id: i64) -> StorageResult<Vec<String>>;

    /// Counts the lemmas of a site
    fn count_lemmas_by_site(&self, site_id: i64) -> StorageResult<u64>;

    /// Counts lemmas across all sites
    fn count_lemmas(&self) -> StorageResult<u64>;

    /// Indexes a page: creates or updates its lemmas and stores their ranks,
    /// all in one transaction
    ///
    /// New lemmas start with frequency 1. An existing lemma is incremented only
    /// when the page has no index entry for it yet. Surface forms are merged
    /// with the stored ones, and an existing rank for the page is replaced.
    /// Nothing is written if any row fails.
    ///
    /// # Returns
    ///
    /// The persisted lemma rows, in input order
    fn index_page_lemmas(
        &mut self,
        site_id: i64,
        page_id: i64,
        lemmas: &[LemmaUpsert],
    ) -> StorageResult<Vec<LemmaRecord>>;

    // ===== Index entries =====

    /// Gets the posting list of a lemma ordered by page ID
    fn get_postings(&self, lemma_id: i64) -> StorageResult<Vec<Posting>>;

    /// Gets the rank of a lemma on a page
    fn get_rank(&self, page_id: i64, lemma_id: i64) -> StorageResult<Option<u32>>;
}
