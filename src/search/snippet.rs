use crate::lemma::normalize_letters;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref LETTER_RUN: Regex = Regex::new(r"[a-zA-Zа-яА-ЯёЁ]+").expect("valid regex");
}

/// Builds highlighted excerpts of page text
///
/// Every word whose letters match a surface form yields one fragment: the
/// word wrapped in `<b>` tags with up to `window` words on each side.
/// Fragments are joined with newlines; duplicates are dropped.
#[derive(Debug, Clone, Copy)]
pub struct SnippetBuilder {
    window: usize,
}

impl SnippetBuilder {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    /// Builds the snippet for a page
    ///
    /// # Arguments
    ///
    /// * `text` - Extracted title and body text of the page
    /// * `lemma_forms` - Surface forms of each matched lemma, in match order
    pub fn build(&self, text: &str, lemma_forms: &[Vec<String>]) -> String {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut fragments: Vec<String> = Vec::new();

        for forms in lemma_forms {
            let forms: HashSet<String> = forms
                .iter()
                .map(|form| normalize_letters(&form.to_lowercase()))
                .collect();

            for (position, word) in words.iter().enumerate() {
                let Some(highlighted) = highlight(word, &forms) else {
                    continue;
                };

                let start = position.saturating_sub(self.window);
                let end = (position + self.window + 1).min(words.len());
                let fragment = words[start..end]
                    .iter()
                    .enumerate()
                    .map(|(offset, w)| {
                        if start + offset == position {
                            highlighted.clone()
                        } else {
                            w.to_string()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ");

                if !fragments.contains(&fragment) {
                    fragments.push(fragment);
                }
            }
        }

        fragments.join("\n")
    }
}

/// Wraps the first letter run of `word` that is one of `forms`
fn highlight(word: &str, forms: &HashSet<String>) -> Option<String> {
    LETTER_RUN.find_iter(word).find_map(|run| {
        let normalized = normalize_letters(&run.as_str().to_lowercase());
        forms.contains(&normalized).then(|| {
            format!(
                "{}<b>{}</b>{}",
                &word[..run.start()],
                run.as_str(),
                &word[run.end()..]
            )
        })
    })
}
