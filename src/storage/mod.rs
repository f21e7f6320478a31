//! Storage module for persisting sites and the lemma index
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Site lifecycle rows and stored pages
//! - Per-site lemmas with document frequency and surface forms
//! - Index entries (postings) linking pages to lemmas

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::SiteStatus;
use crate::LemmaSearchError;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Storage handle shared between concurrent crawl branches, the indexer and search
///
/// The mutex is the serialization point for every write. Lemma upserts for one
/// page run under a single lock acquisition.
pub type SharedStorage = Arc<Mutex<dyn Storage + Send>>;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(LemmaSearchError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, LemmaSearchError> {
    SqliteStorage::new(path)
}

/// Wraps a storage backend for sharing across tasks
pub fn into_shared<S: Storage + Send + 'static>(storage: S) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}

/// Locks shared storage, mapping a poisoned mutex to a storage error
pub fn lock(storage: &SharedStorage) -> StorageResult<MutexGuard<'_, dyn Storage + Send + 'static>> {
    storage.lock().map_err(|_| StorageError::LockPoisoned)
}

/// Represents a configured site in the database
#[derive(Debug, Clone)]
pub struct SiteRecord {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: String,
    pub last_error: Option<String>,
}

/// Represents a stored page
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub site_id: i64,
    /// URL with the site root stripped, always starting with `/`
    pub path: String,
    pub code: u16,
    /// Raw HTML, empty when the fetch failed
    pub content: String,
}

/// Represents a lemma of one site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LemmaRecord {
    pub id: i64,
    pub site_id: i64,
    pub lemma: String,
    /// Number of pages of the site containing this lemma
    pub frequency: u32,
    /// Lowercase surface forms, sorted
    pub forms: Vec<String>,
}

/// One lemma contributed by a page, with the surface forms it appeared as
#[derive(Debug, Clone)]
pub struct LemmaUpsert {
    pub lemma: String,
    pub forms: Vec<String>,
    /// Occurrences of the lemma on the page
    pub rank: u32,
}

/// Page and rank pair of a lemma's posting list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub page_id: i64,
    pub rank: u32,
}

/// Separator used to serialize surface forms
pub const FORMS_SEPARATOR: char = ',';

pub(crate) fn join_forms<'a>(forms: impl IntoIterator<Item = &'a String>) -> String {
    forms
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(&FORMS_SEPARATOR.to_string())
}

pub(crate) fn split_forms(forms: &str) -> Vec<String> {
    forms
        .split(FORMS_SEPARATOR)
        .filter(|form| !form.is_empty())
        .map(str::to_string)
        .collect()
}
