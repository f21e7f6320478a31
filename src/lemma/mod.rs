//! Shared text pipeline used by both indexing and search
//!
//! - `text`: visible title and body text of a stored HTML page
//! - `tokenizer`: letter-only word splitting with "yo" normalization
//! - `lemmatizer`: tokens to lemmas through a `MorphAnalyzer`, dropping function words

mod lemmatizer;
mod text;
mod tokenizer;

pub use lemmatizer::{LemmatizedText, Lemmatizer};
pub use text::{extract_page_text, PageText};
pub use tokenizer::{normalize_letters, tokenize};
