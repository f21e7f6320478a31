use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_LETTERS: Regex = Regex::new(r"[^a-zA-Zа-яА-ЯёЁ]+").expect("valid regex");
}

/// Replaces the Cyrillic "yo" letters with their base letter
pub fn normalize_letters(text: &str) -> String {
    text.replace('ё', "е").replace('Ё', "Е")
}

/// Splits text into letter-only tokens
///
/// Everything except Latin and Cyrillic letters acts as a separator. Tokens
/// keep their original case; "yo" variants are normalized.
pub fn tokenize(text: &str) -> Vec<String> {
    let letters = NON_LETTERS.replace_all(text, " ");
    normalize_letters(&letters)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
