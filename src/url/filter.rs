//! Decides which discovered links a crawl session follows

use url::Url;

/// Extensions of binary resources that are never fetched as pages
pub const DEFAULT_SKIP_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "svg", "ico", "pdf", "doc", "docx", "xls", "xlsx",
    "zip",
];

/// Characters that mark a link as carrying a fragment, a query or a quoted fragment
const FORBIDDEN_CHARS: &[char] = &['#', '?', '&', '=', '\''];

/// Same-site link filter for one crawl root
///
/// A link is crawlable when it:
/// - starts with the site root
/// - contains none of `#`, `?`, `&`, `=`, `'`
/// - does not end in a skipped (binary) extension, compared case-insensitively
#[derive(Debug, Clone)]
pub struct LinkFilter {
    root: String,
    skip_extensions: Vec<String>,
}

impl LinkFilter {
    /// Creates a filter for the given root and list of skipped extensions
    pub fn new(root: &Url, skip_extensions: &[String]) -> Self {
        Self {
            root: root.as_str().to_string(),
            skip_extensions: skip_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Returns true if the absolute link should be crawled in this session
    pub fn is_crawlable(&self, link: &str) -> bool {
        if !link.starts_with(&self.root) {
            return false;
        }

        if link.contains(FORBIDDEN_CHARS) {
            return false;
        }

        !self.has_skipped_extension(link)
    }

    fn has_skipped_extension(&self, link: &str) -> bool {
        let last_segment = link.rsplit('/').next().unwrap_or("");
        match last_segment.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_lowercase();
                self.skip_extensions.iter().any(|skip| *skip == ext)
            }
            None => false,
        }
    }
}
