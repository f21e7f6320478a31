//! One crawl of one site
//!
//! Every URL is handled by its own task. A task claims its URL, fetches and
//! stores the page, indexes it, then spawns one child task per new link and
//! joins all of them before it completes. The session is over when the root
//! task has joined its whole subtree.

use crate::config::CrawlerConfig;
use crate::crawler::claims::ClaimedUrls;
use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::crawler::parser::extract_links;
use crate::indexer::{IndexOutcome, LemmaIndexer};
use crate::state::{CancelToken, SiteStatus};
use crate::storage::{self, PageRecord, SharedStorage, Storage};
use crate::url::{page_path, LinkFilter};
use crate::{LemmaSearchError, Result};
use futures::future::{BoxFuture, FutureExt};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use url::Url;

/// Error text stored for a site whose crawl was stopped on request
pub const STOPPED_BY_USER: &str = "Indexing stopped by user";

/// Collaborators shared by every crawl session
#[derive(Clone)]
pub struct CrawlResources {
    pub storage: SharedStorage,
    pub fetcher: Arc<Fetcher>,
    pub indexer: LemmaIndexer,
    pub crawler: CrawlerConfig,
}

/// State of one running session, shared by all of its tasks
struct SessionContext {
    site_id: i64,
    root: Url,
    filter: LinkFilter,
    claimed: ClaimedUrls,
    resources: CrawlResources,
    permits: Semaphore,
    cancel: CancelToken,
    /// Set when a task fails so the other branches wind down
    halt: CancelToken,
    root_failure: Mutex<Option<String>>,
}

impl SessionContext {
    fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.halt.is_cancelled()
    }
}

/// Crawl session over a single site
pub struct CrawlSession {
    context: Arc<SessionContext>,
}

impl CrawlSession {
    /// Creates a session for a site whose row already exists in INDEXING status
    ///
    /// # Arguments
    ///
    /// * `site_id` - ID of the site row
    /// * `root` - Normalized site root; only links under it are followed
    /// * `resources` - Storage, fetcher, indexer and crawler settings
    /// * `cancel` - Stop signal shared with the caller
    pub fn new(site_id: i64, root: Url, resources: &CrawlResources, cancel: CancelToken) -> Self {
        let filter = LinkFilter::new(&root, &resources.crawler.skip_extensions);
        let permits = Semaphore::new(resources.crawler.max_concurrent_fetches.max(1) as usize);

        Self {
            context: Arc::new(SessionContext {
                site_id,
                root,
                filter,
                claimed: ClaimedUrls::new(),
                resources: resources.clone(),
                permits,
                cancel,
                halt: CancelToken::new(),
                root_failure: Mutex::new(None),
            }),
        }
    }

    /// Runs the crawl to completion and records the terminal site status
    ///
    /// # Returns
    ///
    /// * `SiteStatus::Indexed` - Every reachable page was processed
    /// * `SiteStatus::Failed` - The crawl was stopped, the root page could not
    ///   be fetched, or a storage write failed
    pub async fn run(self) -> SiteStatus {
        let context = self.context;
        info!("Crawling {}", context.root);

        let result = visit(Arc::clone(&context), context.root.to_string()).await;

        let root_failure = context
            .root_failure
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        let (status, last_error) = match result {
            Err(e) => {
                error!("Crawl of {} failed: {}", context.root, e);
                (SiteStatus::Failed, Some(e.to_string()))
            }
            Ok(()) if context.cancel.is_cancelled() => {
                info!("Crawl of {} stopped", context.root);
                (SiteStatus::Failed, Some(STOPPED_BY_USER.to_string()))
            }
            Ok(()) => match root_failure {
                Some(failure) => {
                    warn!("Root page of {} is unreachable: {}", context.root, failure);
                    (SiteStatus::Failed, Some(failure))
                }
                None => (SiteStatus::Indexed, None),
            },
        };

        let recorded = storage::lock(&context.resources.storage).and_then(|mut storage| {
            storage.update_site_status(context.site_id, status, last_error.as_deref())
        });
        if let Err(e) = recorded {
            error!("Failed to record status of {}: {}", context.root, e);
            return SiteStatus::Failed;
        }

        info!(
            "Crawl of {} finished: {} ({} URLs claimed)",
            context.root,
            status,
            context.claimed.len()
        );
        status
    }
}

/// Processes one URL and then its whole subtree
fn visit(context: Arc<SessionContext>, url: String) -> BoxFuture<'static, Result<()>> {
    async move {
        if context.should_stop() || !context.claimed.claim(&url) {
            return Ok(());
        }

        let links = match process(&context, &url).await {
            Ok(links) => links,
            Err(e) => {
                context.halt.cancel();
                return Err(e);
            }
        };

        if context.should_stop() {
            return Ok(());
        }

        let mut children = JoinSet::new();
        for link in links {
            if !context.claimed.is_claimed(&link) {
                children.spawn(visit(Arc::clone(&context), link));
            }
        }

        let mut first_error = None;
        while let Some(joined) = children.join_next().await {
            let outcome = joined
                .map_err(|e| LemmaSearchError::Task(e.to_string()))
                .and_then(|r| r);
            if let Err(e) = outcome {
                context.halt.cancel();
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
    .boxed()
}

/// Fetches, stores and indexes one page, returning the links to follow
async fn process(context: &SessionContext, url: &str) -> Result<Vec<String>> {
    let path = page_path(&context.root, url)?;

    let result = {
        let _permit = context
            .permits
            .acquire()
            .await
            .map_err(|e| LemmaSearchError::Task(e.to_string()))?;
        tokio::time::sleep(context.resources.crawler.politeness_delay()).await;
        context.resources.fetcher.fetch(url).await
    };

    // A fetch already in flight when the stop arrived is discarded
    if context.should_stop() {
        return Ok(Vec::new());
    }

    if let FetchResult::NetworkError { error } = &result {
        warn!("Failed to fetch {}: {}", url, error);
        if url == context.root.as_str() {
            *context
                .root_failure
                .lock()
                .unwrap_or_else(|e| e.into_inner()) = Some(error.clone());
        }
    }

    let stored = store_page(&context.resources.storage, context.site_id, &path, &result)?;

    let FetchResult::Success { body, .. } = &result else {
        return Ok(Vec::new());
    };

    let links = extract_links(body, &Url::parse(url)?, &context.filter);

    match stored {
        Some(page) if page.code == 200 => {
            debug!("Stored {}", url);
            let outcome = context
                .resources
                .indexer
                .index_async(page, context.cancel.clone())
                .await?;
            if outcome == IndexOutcome::Cancelled {
                return Ok(Vec::new());
            }
        }
        Some(page) => debug!("Stored {} ({})", url, page.code),
        // A single-page reindex got there first
        None => debug!("{} is already stored", url),
    }

    Ok(links)
}

/// Stores a fetch result as a page unless its path is already stored
///
/// # Returns
///
/// * `Ok(Some(PageRecord))` - The page was stored and the site touched
/// * `Ok(None)` - A page with this path already exists; nothing was written
pub(crate) fn store_page(
    storage: &SharedStorage,
    site_id: i64,
    path: &str,
    result: &FetchResult,
) -> Result<Option<PageRecord>> {
    let mut storage = storage::lock(storage)?;
    if storage.get_page_by_path(site_id, path)?.is_some() {
        return Ok(None);
    }
    write_page(&mut *storage, site_id, path, result).map(Some)
}

/// Stores a fetch result as a page, deleting any previous copy of the path
/// under the same lock
pub(crate) fn replace_page(
    storage: &SharedStorage,
    site_id: i64,
    path: &str,
    result: &FetchResult,
) -> Result<PageRecord> {
    let mut storage = storage::lock(storage)?;
    if let Some(previous) = storage.get_page_by_path(site_id, path)? {
        storage.delete_page(previous.id)?;
    }
    write_page(&mut *storage, site_id, path, result)
}

fn write_page(
    storage: &mut dyn Storage,
    site_id: i64,
    path: &str,
    result: &FetchResult,
) -> Result<PageRecord> {
    let code = result.status_code();
    let content = result.body();

    let id = storage.insert_page(site_id, path, code, content)?;
    storage.touch_site(site_id)?;

    Ok(PageRecord {
        id,
        site_id,
        path: path.to_string(),
        code,
        content: content.to_string(),
    })
}
