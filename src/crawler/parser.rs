//! HTML link extraction
//!
//! Collects `<a href>` targets, resolves them against the page URL and keeps
//! only the ones the session's [`LinkFilter`] accepts.

use crate::url::LinkFilter;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracts the crawlable links of a page
///
/// # Exclusions
///
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - fragment-only links
/// - anything the filter rejects (other sites, queries, fragments, binaries)
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The page URL, used to resolve relative links
/// * `filter` - Same-site filter of the crawl session
///
/// # Returns
///
/// Distinct absolute URLs, in document order
///
/// # Example
///
/// ```
/// use lemma_search::crawler::extract_links;
/// use lemma_search::url::LinkFilter;
/// use url::Url;
///
/// let root = Url::parse("https://example.com/").unwrap();
/// let filter = LinkFilter::new(&root, &[]);
/// let links = extract_links(r#"<a href="/about">About</a>"#, &root, &filter);
/// assert_eq!(links, vec!["https://example.com/about".to_string()]);
/// ```
pub fn extract_links(html: &str, base_url: &Url, filter: &LinkFilter) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let Ok(selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(absolute) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        else {
            continue;
        };

        if filter.is_crawlable(&absolute) && seen.insert(absolute.clone()) {
            links.push(absolute);
        }
    }

    links
}

/// Resolves a link href to an absolute HTTP(S) URL
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}
