//! URL handling module for Lemma-Search
//!
//! This module provides site-root normalization, page-path derivation and the
//! filter that decides which discovered links belong to a crawl session.

mod filter;
mod normalize;

// Re-export main functions
pub use filter::{LinkFilter, DEFAULT_SKIP_EXTENSIONS};
pub use normalize::{page_path, site_root};
