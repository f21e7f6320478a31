use super::function_words::classify;
use super::{Alphabet, Analysis, MorphAnalyzer, MorphError, WordClass};
use rust_stemmers::{Algorithm, Stemmer};

/// Analyzer backed by the Snowball stemmers for English and Russian
///
/// Function words are recognized from closed-class tables before stemming, so
/// their class is reported for the surface form, not the stem.
pub struct SnowballAnalyzer {
    english: Stemmer,
    russian: Stemmer,
}

impl SnowballAnalyzer {
    pub fn new() -> Self {
        Self {
            english: Stemmer::create(Algorithm::English),
            russian: Stemmer::create(Algorithm::Russian),
        }
    }
}

impl Default for SnowballAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl MorphAnalyzer for SnowballAnalyzer {
    fn analyze(&self, token: &str) -> Result<Analysis, MorphError> {
        let alphabet = Alphabet::detect(token)
            .ok_or_else(|| MorphError::UnsupportedAlphabet(token.to_string()))?;

        let class = classify(token, alphabet);
        if class != WordClass::Content {
            return Ok(Analysis {
                lemma: token.to_string(),
                class,
            });
        }

        let stemmer = match alphabet {
            Alphabet::Latin => &self.english,
            Alphabet::Cyrillic => &self.russian,
        };

        let lemma = stemmer.stem(token);
        if lemma.is_empty() {
            return Err(MorphError::AnalysisFailed(token.to_string()));
        }

        Ok(Analysis {
            lemma: lemma.into_owned(),
            class,
        })
    }
}
