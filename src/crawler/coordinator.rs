//! Crawler coordinator
//!
//! This module runs crawl sessions for all configured sites and reindexes
//! single pages:
//! - Re-crawls start from scratch: the old site row and everything under it is deleted
//! - Sites are crawled concurrently and independently
//! - A single page is refetched and reindexed without touching the rest of its site

use crate::config::{Config, SiteEntry};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::session::{replace_page, CrawlResources, CrawlSession};
use crate::indexer::{IndexOutcome, LemmaIndexer};
use crate::morph::MorphAnalyzer;
use crate::state::{CancelToken, SiteStatus};
use crate::storage::{self, SharedStorage};
use crate::url::{page_path, site_root};
use crate::{LemmaSearchError, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use url::Url;

/// Terminal state of one site after a crawl
#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub error: Option<String>,
}

/// Result of reindexing a single page
#[derive(Debug, Clone, Serialize)]
pub struct IndexedPage {
    /// Root URL of the owning site
    pub site: String,
    pub path: String,
    pub status_code: u16,
    /// Distinct lemmas written for the page
    pub lemmas: usize,
}

/// Main crawler coordinator structure
#[derive(Clone)]
pub struct Coordinator {
    config: Arc<Config>,
    resources: CrawlResources,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `storage` - Shared storage backend
    /// * `analyzer` - Morphological analyzer used for indexing
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(LemmaSearchError)` - The HTTP client could not be built
    pub fn new(
        config: Config,
        storage: SharedStorage,
        analyzer: Arc<dyn MorphAnalyzer>,
    ) -> Result<Self> {
        let fetcher = Fetcher::new(&config.connection, config.crawler.request_timeout())?;
        let resources = CrawlResources {
            indexer: LemmaIndexer::new(storage.clone(), analyzer),
            storage,
            fetcher: Arc::new(fetcher),
            crawler: config.crawler.clone(),
        };

        Ok(Self {
            config: Arc::new(config),
            resources,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.resources.storage
    }

    /// Crawls every configured site concurrently
    ///
    /// One site failing or being stopped does not affect the others.
    ///
    /// # Returns
    ///
    /// One report per configured site, in configuration order
    pub async fn crawl_all(&self, cancel: CancelToken) -> Result<Vec<SiteReport>> {
        info!("Starting crawl of {} sites", self.config.sites.len());

        let mut sessions = JoinSet::new();
        for (position, entry) in self.config.sites.iter().cloned().enumerate() {
            let coordinator = self.clone();
            let cancel = cancel.clone();
            sessions.spawn(async move {
                let outcome = coordinator.crawl_site(&entry, cancel).await;
                (position, entry, outcome)
            });
        }

        let mut reports = Vec::with_capacity(self.config.sites.len());
        while let Some(joined) = sessions.join_next().await {
            let (position, entry, outcome) =
                joined.map_err(|e| LemmaSearchError::Task(e.to_string()))?;

            let report = outcome.unwrap_or_else(|e| {
                error!("Could not start crawl of {}: {}", entry.url, e);
                SiteReport {
                    url: entry.url.clone(),
                    name: entry.name.clone(),
                    status: SiteStatus::Failed,
                    error: Some(e.to_string()),
                }
            });
            reports.push((position, report));
        }

        reports.sort_by_key(|(position, _)| *position);
        Ok(reports.into_iter().map(|(_, report)| report).collect())
    }

    /// Crawls one site from scratch
    ///
    /// Deletes any previous data for the site root, creates its row in
    /// INDEXING status and runs a session until it terminates.
    pub async fn crawl_site(&self, entry: &SiteEntry, cancel: CancelToken) -> Result<SiteReport> {
        let root = site_root(&entry.url)?;

        let site_id = {
            let mut storage = storage::lock(&self.resources.storage)?;
            if let Some(existing) = storage.get_site_by_url(root.as_str())? {
                info!("Deleting previous index of {}", root);
                storage.delete_site(existing.id)?;
            }
            storage.create_site(root.as_str(), &entry.name, SiteStatus::Indexing)?
        };

        let status = CrawlSession::new(site_id, root, &self.resources, cancel)
            .run()
            .await;

        let site = storage::lock(&self.resources.storage)?.get_site(site_id)?;
        Ok(SiteReport {
            url: site.url,
            name: site.name,
            status,
            error: site.last_error,
        })
    }

    /// Fetches and reindexes a single page of a configured site
    ///
    /// The page is fetched first. The previous copy is then replaced under one
    /// storage lock, and the frequencies of the lemmas it contributed are
    /// decremented.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute page URL; must be under a configured site root
    ///
    /// # Returns
    ///
    /// * `Ok(IndexedPage)` - The page was fetched and stored (possibly with an error code)
    /// * `Err(LemmaSearchError::PageOutsideSites)` - No configured site contains the URL
    /// * `Err(LemmaSearchError)` - A storage write failed; the site is marked FAILED
    pub async fn index_page(&self, url: &str) -> Result<IndexedPage> {
        let url = url.trim();
        let (entry, root, path) = self
            .locate(url)
            .ok_or_else(|| LemmaSearchError::PageOutsideSites {
                url: url.to_string(),
            })?;

        let site_id = {
            let mut storage = storage::lock(&self.resources.storage)?;
            match storage.get_site_by_url(root.as_str())? {
                Some(site) => {
                    storage.update_site_status(site.id, SiteStatus::Indexing, None)?;
                    site.id
                }
                None => storage.create_site(root.as_str(), &entry.name, SiteStatus::Indexing)?,
            }
        };

        let result = self.reindex(site_id, &root, url, &path).await;

        let (status, last_error) = match &result {
            Ok(page) if page.status_code == 200 => (SiteStatus::Indexed, None),
            Ok(page) => (
                SiteStatus::Indexed,
                Some(format!(
                    "Page {} could not be indexed: status {}",
                    url, page.status_code
                )),
            ),
            Err(e) => (SiteStatus::Failed, Some(e.to_string())),
        };
        storage::lock(&self.resources.storage)?.update_site_status(
            site_id,
            status,
            last_error.as_deref(),
        )?;

        result
    }

    async fn reindex(&self, site_id: i64, root: &Url, url: &str, path: &str) -> Result<IndexedPage> {
        let result = self.resources.fetcher.fetch(url).await;
        let page = replace_page(&self.resources.storage, site_id, path, &result)?;
        let (path, code) = (page.path.clone(), page.code);

        let lemmas = if code == 200 {
            match self.resources.indexer.index_async(page, CancelToken::new()).await? {
                IndexOutcome::Indexed { lemmas } => lemmas,
                IndexOutcome::Empty | IndexOutcome::Cancelled => 0,
            }
        } else {
            warn!("Page {} returned status {}", url, code);
            0
        };

        info!("Reindexed {} ({} lemmas)", url, lemmas);
        Ok(IndexedPage {
            site: root.to_string(),
            path,
            status_code: code,
            lemmas,
        })
    }

    /// Finds the configured site containing a URL
    fn locate(&self, url: &str) -> Option<(&SiteEntry, Url, String)> {
        self.config.sites.iter().find_map(|entry| {
            let root = site_root(&entry.url).ok()?;
            let path = page_path(&root, url).ok()?;
            Some((entry, root, path))
        })
    }
}
