use std::collections::HashSet;
use std::sync::Mutex;

/// URLs already taken by some branch of a crawl session
///
/// Created with the session and dropped with it. The only mutation is an
/// atomic claim-if-absent, so two branches that discover the same link
/// never both process it.
#[derive(Debug, Default)]
pub struct ClaimedUrls {
    urls: Mutex<HashSet<String>>,
}

impl ClaimedUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a URL, returning false if it was already claimed
    pub fn claim(&self, url: &str) -> bool {
        let mut urls = self.urls.lock().unwrap_or_else(|e| e.into_inner());
        urls.insert(url.to_string())
    }

    pub fn is_claimed(&self, url: &str) -> bool {
        let urls = self.urls.lock().unwrap_or_else(|e| e.into_inner());
        urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
