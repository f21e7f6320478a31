//! Lemma indexing of stored pages
//!
//! Turns one page's HTML into per-site lemma rows and per-page index entries.
//! The lemma rows of a page and its index entries are written in one storage
//! transaction, so a failed write never leaves a frequency without its entry.

use crate::lemma::{extract_page_text, Lemmatizer};
use crate::morph::MorphAnalyzer;
use crate::state::CancelToken;
use crate::storage::{self, LemmaUpsert, PageRecord, SharedStorage};
use crate::{LemmaSearchError, Result};
use std::sync::Arc;
use tracing::debug;

/// Result of indexing one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Index entries were written for this many distinct lemmas
    Indexed { lemmas: usize },

    /// The page had no indexable words
    Empty,

    /// A stop was requested before anything was written
    Cancelled,
}

/// Builds the lemma index for stored pages
#[derive(Clone)]
pub struct LemmaIndexer {
    storage: SharedStorage,
    lemmatizer: Lemmatizer,
}

impl LemmaIndexer {
    pub fn new(storage: SharedStorage, analyzer: Arc<dyn MorphAnalyzer>) -> Self {
        Self {
            storage,
            lemmatizer: Lemmatizer::new(analyzer),
        }
    }

    /// Indexes a successfully fetched page
    ///
    /// # Arguments
    ///
    /// * `page` - The stored page, with its raw HTML
    /// * `cancel` - Checked between tokens and once more before writing
    ///
    /// # Returns
    ///
    /// * `Ok(IndexOutcome)` - What was done for the page
    /// * `Err(LemmaSearchError)` - A storage write failed
    pub fn index(&self, page: &PageRecord, cancel: &CancelToken) -> Result<IndexOutcome> {
        let text = extract_page_text(&page.content).combined();
        if text.is_empty() {
            return Ok(IndexOutcome::Empty);
        }

        let Some(lemmatized) = self.lemmatizer.lemmatize(&text, cancel) else {
            return Ok(IndexOutcome::Cancelled);
        };
        if lemmatized.is_empty() {
            return Ok(IndexOutcome::Empty);
        }

        let upserts: Vec<LemmaUpsert> = lemmatized
            .occurrence_counts()
            .into_iter()
            .map(|(lemma, rank)| LemmaUpsert {
                forms: lemmatized
                    .forms
                    .get(&lemma)
                    .map(|forms| forms.iter().cloned().collect())
                    .unwrap_or_default(),
                lemma,
                rank,
            })
            .collect();

        if cancel.is_cancelled() {
            return Ok(IndexOutcome::Cancelled);
        }

        let records = storage::lock(&self.storage)?.index_page_lemmas(
            page.site_id,
            page.id,
            &upserts,
        )?;

        debug!(
            "Indexed page {} ({} lemmas, {} tokens)",
            page.path,
            records.len(),
            lemmatized.lemmas.len()
        );

        Ok(IndexOutcome::Indexed {
            lemmas: records.len(),
        })
    }

    /// Runs [`LemmaIndexer::index`] on the blocking thread pool
    ///
    /// HTML parsing, stemming and the storage transaction stay off the async
    /// workers so other fetches keep going.
    pub async fn index_async(&self, page: PageRecord, cancel: CancelToken) -> Result<IndexOutcome> {
        let indexer = self.clone();
        tokio::task::spawn_blocking(move || indexer.index(&page, &cancel))
            .await
            .map_err(|e| LemmaSearchError::Task(e.to_string()))?
    }
}
