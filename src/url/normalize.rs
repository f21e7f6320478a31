use crate::UrlError;
use url::Url;

/// Normalizes a configured site URL into a crawl root
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only HTTP and HTTPS schemes
/// 3. Lowercase the host (done by the parser)
/// 4. Drop the query string and fragment
/// 5. Ensure the path ends with `/` so that prefix checks match whole segments
///
/// # Examples
///
/// ```
/// use lemma_search::url::site_root;
///
/// let root = site_root("https://EXAMPLE.com/blog").unwrap();
/// assert_eq!(root.as_str(), "https://example.com/blog/");
/// ```
pub fn site_root(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_query(None);
    url.set_fragment(None);

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Derives the stored page path from an absolute URL
///
/// The path is the URL with the site root stripped; it always starts with `/`
/// and the root itself maps to `/`.
///
/// # Examples
///
/// ```
/// use lemma_search::url::{page_path, site_root};
///
/// let root = site_root("https://example.com/").unwrap();
/// assert_eq!(page_path(&root, "https://example.com/news/1").unwrap(), "/news/1");
/// assert_eq!(page_path(&root, "https://example.com/").unwrap(), "/");
/// ```
pub fn page_path(root: &Url, url: &str) -> Result<String, UrlError> {
    let prefix = root.as_str().trim_end_matches('/');

    let rest = url.strip_prefix(prefix).ok_or_else(|| UrlError::OutsideRoot {
        url: url.to_string(),
        root: root.to_string(),
    })?;

    if rest.is_empty() {
        Ok("/".to_string())
    } else if rest.starts_with('/') {
        Ok(rest.to_string())
    } else {
        // "https://example.com/blogger" must not count as a page of ".../blog/"
        Err(UrlError::OutsideRoot {
            url: url.to_string(),
            root: root.to_string(),
        })
    }
}
