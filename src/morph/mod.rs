//! Morphological analysis
//!
//! This module turns a single lowercase token into its lemma and a coarse word
//! class. It contains:
//! - The `MorphAnalyzer` trait the indexer and search engine are built against
//! - Alphabet detection used to route a token to a language
//! - Closed-class function-word tables for English and Russian
//! - `SnowballAnalyzer`, the shipped analyzer backed by Snowball stemmers

mod function_words;
mod snowball;

pub use snowball::SnowballAnalyzer;

use thiserror::Error;

/// Errors produced while analyzing a token
///
/// Both variants are non-fatal: the caller skips the token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MorphError {
    #[error("Token '{0}' is not written in a supported alphabet")]
    UnsupportedAlphabet(String),

    #[error("Analysis failed for token '{0}'")]
    AnalysisFailed(String),
}

/// Coarse part-of-speech tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordClass {
    /// Anything that carries meaning and is worth indexing
    Content,
    Preposition,
    Conjunction,
    Particle,
    Interjection,
}

impl WordClass {
    /// Returns true for classes that are never indexed or searched
    pub fn is_function_word(&self) -> bool {
        !matches!(self, Self::Content)
    }
}

/// Alphabet a token is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    Latin,
    Cyrillic,
}

impl Alphabet {
    /// Detects the alphabet of a lowercase token
    ///
    /// Returns None for empty tokens and tokens that mix alphabets or contain
    /// anything other than lowercase letters.
    pub fn detect(token: &str) -> Option<Self> {
        if token.is_empty() {
            return None;
        }
        if token.chars().all(|c| c.is_ascii_lowercase()) {
            Some(Self::Latin)
        } else if token.chars().all(|c| matches!(c, 'а'..='я' | 'ё')) {
            Some(Self::Cyrillic)
        } else {
            None
        }
    }
}

/// Primary analysis result for a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    /// Normalized base form used as the index key
    pub lemma: String,

    /// Coarse word class
    pub class: WordClass,
}

/// Turns a lowercase token into its lemma and word class
pub trait MorphAnalyzer: Send + Sync {
    fn analyze(&self, token: &str) -> Result<Analysis, MorphError>;
}
