use crate::config::SearchConfig;
use crate::lemma::{extract_page_text, Lemmatizer};
use crate::morph::MorphAnalyzer;
use crate::search::snippet::SnippetBuilder;
use crate::storage::{self, LemmaRecord, SharedStorage, SiteRecord, Storage};
use crate::url::site_root;
use crate::{LemmaSearchError, Result};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// A search request
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub query: String,
    /// Root URL of the site to search in, or all sites when None
    pub site: Option<String>,
    pub offset: usize,
    /// Page size; the configured default when None
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One ranked page
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub site: String,
    pub site_name: String,
    pub uri: String,
    pub title: String,
    pub snippet: String,
    pub relevance: f64,
}

/// A page of ranked results with the total number of matching pages
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResponse {
    pub count: usize,
    pub results: Vec<SearchHit>,
}

/// A query lemma with its stored rows in the searched scope
struct QueryTerm {
    frequency: u64,
    rows: Vec<LemmaRecord>,
}

/// A page matching every term processed so far
struct Candidate {
    relevance: u64,
    lemma_ids: Vec<i64>,
}

/// Read-only search over the lemma index
pub struct SearchEngine {
    storage: SharedStorage,
    lemmatizer: Lemmatizer,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(
        storage: SharedStorage,
        analyzer: Arc<dyn MorphAnalyzer>,
        config: SearchConfig,
    ) -> Self {
        Self {
            storage,
            lemmatizer: Lemmatizer::new(analyzer),
            config,
        }
    }

    /// Runs a query
    ///
    /// # Search Flow
    ///
    /// 1. Reject an empty query
    /// 2. Lemmatize the query the same way pages are indexed
    /// 3. Drop lemmas found on at least `frequency-threshold` of all indexed pages
    /// 4. Intersect posting lists, rarest lemma first; a page must contain every
    ///    remaining lemma
    /// 5. Score pages by the sum of ranks, normalized by the best score
    /// 6. Sort by relevance, then cut the requested window and build its snippets
    ///
    /// # Returns
    ///
    /// * `Ok(SearchResponse)` - Results, possibly empty
    /// * `Err(LemmaSearchError::EmptyQuery)` - The query has no text
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        if query.query.trim().is_empty() {
            return Err(LemmaSearchError::EmptyQuery);
        }

        let lemmas = self.lemmatizer.query_lemmas(&query.query);
        let storage = storage::lock(&self.storage)?;

        let scope = match &query.site {
            Some(url) => match self.find_site(&*storage, url)? {
                Some(site) => Some(site),
                None => {
                    debug!("Search in unknown site {}", url);
                    return Ok(SearchResponse::default());
                }
            },
            None => None,
        };

        // Counted over every site, whatever the scope
        let threshold = self.config.frequency_threshold * storage.count_pages()? as f64;

        let mut terms = Vec::with_capacity(lemmas.len());
        for lemma in &lemmas {
            let rows: Vec<LemmaRecord> = match &scope {
                Some(site) => storage.get_lemma(site.id, lemma)?.into_iter().collect(),
                None => storage.get_lemmas_by_text(lemma)?,
            };
            let frequency: u64 = rows.iter().map(|row| u64::from(row.frequency)).sum();

            if frequency as f64 >= threshold {
                debug!(
                    "Dropping lemma '{}' (frequency {}, threshold {:.2})",
                    lemma, frequency, threshold
                );
                continue;
            }
            terms.push(QueryTerm { frequency, rows });
        }

        if terms.is_empty() {
            return Ok(SearchResponse::default());
        }
        terms.sort_by_key(|term| term.frequency);

        let candidates = intersect(&*storage, &terms)?;
        let max_relevance = candidates
            .values()
            .map(|candidate| candidate.relevance)
            .max()
            .unwrap_or(0);

        let mut ranked: Vec<(i64, f64, Candidate)> = candidates
            .into_iter()
            .map(|(page_id, candidate)| {
                let relevance = if max_relevance == 0 {
                    0.0
                } else {
                    candidate.relevance as f64 / max_relevance as f64
                };
                (page_id, relevance, candidate)
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        let count = ranked.len();
        let limit = query.limit.unwrap_or(self.config.default_limit);
        let snippets = SnippetBuilder::new(self.config.snippet_window);
        let mut sites: HashMap<i64, SiteRecord> = HashMap::new();
        let mut results = Vec::new();

        for (page_id, relevance, candidate) in ranked.into_iter().skip(query.offset).take(limit) {
            let page = storage.get_page(page_id)?;
            let site = match sites.entry(page.site_id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(storage.get_site(page.site_id)?),
            };

            let lemma_forms = candidate
                .lemma_ids
                .iter()
                .map(|&lemma_id| storage.get_surface_forms(lemma_id))
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let text = extract_page_text(&page.content);
            results.push(SearchHit {
                site: site.url.trim_end_matches('/').to_string(),
                site_name: site.name.clone(),
                uri: page.path,
                snippet: snippets.build(&text.combined(), &lemma_forms),
                title: text.title,
                relevance,
            });
        }

        debug!(
            "Query '{}' matched {} pages, returning {}",
            query.query,
            count,
            results.len()
        );
        Ok(SearchResponse { count, results })
    }

    fn find_site(&self, storage: &dyn Storage, url: &str) -> Result<Option<SiteRecord>> {
        let Ok(root) = site_root(url) else {
            return Ok(None);
        };
        Ok(storage.get_site_by_url(root.as_str())?)
    }
}

/// Intersects the posting lists of all terms, summing ranks
fn intersect(storage: &dyn Storage, terms: &[QueryTerm]) -> Result<BTreeMap<i64, Candidate>> {
    let mut candidates: Option<BTreeMap<i64, Candidate>> = None;

    for term in terms {
        let mut postings: HashMap<i64, (u32, i64)> = HashMap::new();
        for row in &term.rows {
            for posting in storage.get_postings(row.id)? {
                postings.insert(posting.page_id, (posting.rank, row.id));
            }
        }

        let next = match candidates.take() {
            None => postings
                .into_iter()
                .map(|(page_id, (rank, lemma_id))| {
                    (
                        page_id,
                        Candidate {
                            relevance: u64::from(rank),
                            lemma_ids: vec![lemma_id],
                        },
                    )
                })
                .collect(),
            Some(mut current) => {
                current.retain(|page_id, _| postings.contains_key(page_id));
                for (page_id, candidate) in current.iter_mut() {
                    if let Some(&(rank, lemma_id)) = postings.get(page_id) {
                        candidate.relevance += u64::from(rank);
                        candidate.lemma_ids.push(lemma_id);
                    }
                }
                current
            }
        };

        if next.is_empty() {
            return Ok(next);
        }
        candidates = Some(next);
    }

    Ok(candidates.unwrap_or_default())
}
