use super::tokenizer::tokenize;
use crate::morph::MorphAnalyzer;
use crate::state::CancelToken;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::trace;

/// Lemmas of one text, in token order, with the surface forms seen for each
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LemmatizedText {
    /// One entry per indexable token
    pub lemmas: Vec<String>,

    /// Lowercase surface forms grouped by lemma
    pub forms: BTreeMap<String, BTreeSet<String>>,
}

impl LemmatizedText {
    /// Raw occurrence count of each distinct lemma
    pub fn occurrence_counts(&self) -> BTreeMap<String, u32> {
        let mut counts = BTreeMap::new();
        for lemma in &self.lemmas {
            *counts.entry(lemma.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn is_empty(&self) -> bool {
        self.lemmas.is_empty()
    }
}

/// Tokenizes text and maps every token to its lemma
///
/// Tokens the analyzer cannot handle and function words are dropped.
#[derive(Clone)]
pub struct Lemmatizer {
    analyzer: Arc<dyn MorphAnalyzer>,
}

impl Lemmatizer {
    pub fn new(analyzer: Arc<dyn MorphAnalyzer>) -> Self {
        Self { analyzer }
    }

    /// Lemma of a single token, or None if the token is skipped
    pub fn lemma_of(&self, token: &str) -> Option<String> {
        let lowered = token.to_lowercase();
        match self.analyzer.analyze(&lowered) {
            Ok(analysis) if analysis.class.is_function_word() => {
                trace!("Skipping function word '{}'", lowered);
                None
            }
            Ok(analysis) => Some(analysis.lemma),
            Err(e) => {
                trace!("Skipping token: {}", e);
                None
            }
        }
    }

    /// Lemmatizes a whole text
    ///
    /// The cancel token is checked before every token. Returns None when a
    /// stop was requested; partial results are discarded.
    pub fn lemmatize(&self, text: &str, cancel: &CancelToken) -> Option<LemmatizedText> {
        let mut result = LemmatizedText::default();

        for token in tokenize(text) {
            if cancel.is_cancelled() {
                return None;
            }

            let Some(lemma) = self.lemma_of(&token) else {
                continue;
            };

            result
                .forms
                .entry(lemma.clone())
                .or_default()
                .insert(token.to_lowercase());
            result.lemmas.push(lemma);
        }

        Some(result)
    }

    /// Distinct lemmas of a search query, in order of first appearance
    pub fn query_lemmas(&self, query: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        tokenize(query)
            .iter()
            .filter_map(|token| self.lemma_of(token))
            .filter(|lemma| seen.insert(lemma.clone()))
            .collect()
    }
}
