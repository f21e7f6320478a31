//! Ranked full-text search over the lemma index
//!
//! - `engine`: query lemmatization, common-lemma filtering, posting-list
//!   intersection, relevance normalization and pagination
//! - `snippet`: highlighted excerpts around matched surface forms

mod engine;
mod snippet;

pub use engine::{SearchEngine, SearchHit, SearchQuery, SearchResponse};
pub use snippet::SnippetBuilder;
