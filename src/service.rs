//! Control surface over crawling, single-page indexing, search and statistics
//!
//! Every operation answers with a [`ServiceResponse`]: a success flag, an error
//! message on failure, and the payload on success. At most one full crawl runs at
//! a time; search and single-page indexing are refused while it runs.

use crate::config::Config;
use crate::crawler::{Coordinator, IndexedPage, SiteReport};
use crate::morph::MorphAnalyzer;
use crate::output::{load_statistics, Statistics};
use crate::search::{SearchEngine, SearchQuery, SearchResponse};
use crate::state::CancelToken;
use crate::storage::{self, SharedStorage};
use crate::{LemmaSearchError, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Outcome of a control operation
#[derive(Debug, Clone, Serialize)]
pub struct ServiceResponse<T> {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ServiceResponse<T> {
    /// Success without a payload
    pub fn done() -> Self {
        Self {
            result: true,
            error: None,
            data: None,
        }
    }

    pub fn failure(error: &LemmaSearchError) -> Self {
        Self {
            result: false,
            error: Some(error.to_string()),
            data: None,
        }
    }
}

impl<T> From<Result<T>> for ServiceResponse<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self {
                result: true,
                error: None,
                data: Some(data),
            },
            Err(e) => {
                if !matches!(e, LemmaSearchError::EmptyQuery) {
                    warn!("Request failed: {}", e);
                }
                Self::failure(&e)
            }
        }
    }
}

/// A full crawl running in the background
struct RunningCrawl {
    cancel: CancelToken,
    handle: Option<JoinHandle<Result<Vec<SiteReport>>>>,
}

/// Front door to the crawler, indexer and search engine
pub struct Service {
    coordinator: Coordinator,
    engine: SearchEngine,
    running: Arc<AtomicBool>,
    crawl: Mutex<Option<RunningCrawl>>,
}

impl Service {
    /// Creates a service over shared storage
    ///
    /// # Returns
    ///
    /// * `Ok(Service)` - Ready to accept requests
    /// * `Err(LemmaSearchError)` - The HTTP client could not be built
    pub fn new(
        config: Config,
        storage: SharedStorage,
        analyzer: Arc<dyn MorphAnalyzer>,
    ) -> Result<Self> {
        let engine = SearchEngine::new(storage.clone(), analyzer.clone(), config.search.clone());
        let coordinator = Coordinator::new(config, storage, analyzer)?;

        Ok(Self {
            coordinator,
            engine,
            running: Arc::new(AtomicBool::new(false)),
            crawl: Mutex::new(None),
        })
    }

    /// Whether a full crawl is running
    pub fn is_indexing(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Starts crawling every configured site in the background
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_indexing(&self) -> ServiceResponse<()> {
        let mut crawl = self.lock_crawl();
        if self.is_indexing() {
            return ServiceResponse::failure(&LemmaSearchError::IndexingAlreadyRunning);
        }

        info!("Starting indexing");
        self.running.store(true, Ordering::Release);

        let cancel = CancelToken::new();
        let coordinator = self.coordinator.clone();
        let running = Arc::clone(&self.running);
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let reports = coordinator.crawl_all(token).await;
            running.store(false, Ordering::Release);
            reports
        });

        *crawl = Some(RunningCrawl {
            cancel,
            handle: Some(handle),
        });
        ServiceResponse::done()
    }

    /// Asks the running crawl to stop
    ///
    /// Returns at once; sessions wind down at their next checkpoint and end FAILED
    /// with the stop message.
    pub fn stop_indexing(&self) -> ServiceResponse<()> {
        let crawl = self.lock_crawl();
        match crawl.as_ref() {
            Some(running) if self.is_indexing() => {
                info!("Stop requested");
                running.cancel.cancel();
                ServiceResponse::done()
            }
            _ => ServiceResponse::failure(&LemmaSearchError::IndexingNotRunning),
        }
    }

    /// Waits for the crawl started by [`Service::start_indexing`] to finish
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<SiteReport>)` - Terminal status of every configured site
    /// * `Err(LemmaSearchError::IndexingNotRunning)` - No crawl was started, or it
    ///   was already awaited
    pub async fn wait_for_indexing(&self) -> Result<Vec<SiteReport>> {
        let handle = self
            .lock_crawl()
            .as_mut()
            .and_then(|running| running.handle.take())
            .ok_or(LemmaSearchError::IndexingNotRunning)?;

        handle
            .await
            .map_err(|e| LemmaSearchError::Task(e.to_string()))?
    }

    /// Refetches and reindexes one page of a configured site; refused while a
    /// crawl is running
    pub async fn index_page(&self, url: &str) -> ServiceResponse<IndexedPage> {
        if self.is_indexing() {
            return ServiceResponse::failure(&LemmaSearchError::IndexingInProgress);
        }
        self.coordinator.index_page(url).await.into()
    }

    /// Searches the index; refused while a crawl is running
    pub fn search(&self, query: &SearchQuery) -> ServiceResponse<SearchResponse> {
        if self.is_indexing() {
            return ServiceResponse::failure(&LemmaSearchError::IndexingInProgress);
        }
        self.engine.search(query).into()
    }

    pub fn statistics(&self) -> ServiceResponse<Statistics> {
        let indexing = self.is_indexing();
        let stats = storage::lock(self.coordinator.storage())
            .map_err(LemmaSearchError::from)
            .and_then(|storage| load_statistics(&*storage, indexing));
        stats.into()
    }

    pub fn storage(&self) -> &SharedStorage {
        self.coordinator.storage()
    }

    fn lock_crawl(&self) -> MutexGuard<'_, Option<RunningCrawl>> {
        self.crawl.lock().unwrap_or_else(|e| e.into_inner())
    }
}
