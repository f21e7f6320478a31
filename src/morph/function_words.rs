//! Closed-class word tables
//!
//! Lists of prepositions, conjunctions, particles and interjections per
//! language. A word that appears in more than one class is listed once, under
//! the class it is most often used as.

use super::{Alphabet, WordClass};
use lazy_static::lazy_static;
use std::collections::HashMap;

const ENGLISH_PREPOSITIONS: &[&str] = &[
    "aboard", "about", "above", "across", "after", "against", "along", "amid", "among", "around",
    "at", "atop", "before", "behind", "below", "beneath", "beside", "besides", "between",
    "beyond", "by", "despite", "down", "during", "except", "for", "from", "in", "inside", "into", "near",
    "of", "off", "on", "onto", "out", "outside", "over", "past", "per", "since", "through",
    "throughout", "till", "to", "toward", "towards", "under", "underneath", "until", "unto", "up",
    "upon", "via", "with", "within", "without",
];

const ENGLISH_CONJUNCTIONS: &[&str] = &[
    "and", "but", "or", "nor", "for", "yet", "so", "because", "although", "though", "if",
    "unless", "whereas", "while", "whether", "than", "that", "once", "lest", "whenever",
    "wherever", "either", "neither", "both",
];

const ENGLISH_PARTICLES: &[&str] = &["not", "no", "only", "just", "even", "too", "also"];

const ENGLISH_INTERJECTIONS: &[&str] = &[
    "ah", "aha", "alas", "hey", "hmm", "oh", "oops", "ouch", "wow", "yay", "hooray", "uh", "um",
    "er", "eh", "ugh", "bravo", "hi", "hello", "bye",
];

const RUSSIAN_PREPOSITIONS: &[&str] = &[
    "в", "во", "на", "с", "со", "к", "ко", "по", "из", "изо", "у", "о", "об", "обо", "от", "ото",
    "до", "за", "над", "надо", "под", "подо", "при", "про", "для", "без", "безо", "через",
    "между", "меж", "перед", "пред", "около", "вокруг", "после", "среди", "кроме", "вместо",
    "сквозь", "вдоль", "возле", "мимо", "ради", "против", "внутри", "вне",
];

const RUSSIAN_CONJUNCTIONS: &[&str] = &[
    "и", "а", "но", "или", "либо", "да", "что", "чтобы", "если", "когда", "хотя", "зато",
    "однако", "тоже", "также", "потому", "поэтому", "будто", "словно", "пока", "ибо", "причем",
    "притом", "как",
];

const RUSSIAN_PARTICLES: &[&str] = &[
    "не", "ни", "же", "ли", "бы", "б", "вот", "вон", "даже", "лишь", "только", "ведь", "разве",
    "неужели", "пусть", "пускай", "уж", "именно", "почти", "едва",
];

const RUSSIAN_INTERJECTIONS: &[&str] = &[
    "ах", "ох", "эх", "ой", "ай", "ого", "увы", "ура", "эй", "ну", "фу", "тьфу", "ага", "ух",
    "ахти", "батюшки", "браво",
];

fn table(
    entries: &[(&'static [&'static str], WordClass)],
) -> HashMap<&'static str, WordClass> {
    let mut map = HashMap::new();
    for (words, class) in entries {
        for word in words.iter() {
            map.entry(*word).or_insert(*class);
        }
    }
    map
}

lazy_static! {
    static ref ENGLISH: HashMap<&'static str, WordClass> = table(&[
        (ENGLISH_PREPOSITIONS, WordClass::Preposition),
        (ENGLISH_CONJUNCTIONS, WordClass::Conjunction),
        (ENGLISH_PARTICLES, WordClass::Particle),
        (ENGLISH_INTERJECTIONS, WordClass::Interjection),
    ]);
    static ref RUSSIAN: HashMap<&'static str, WordClass> = table(&[
        (RUSSIAN_PREPOSITIONS, WordClass::Preposition),
        (RUSSIAN_CONJUNCTIONS, WordClass::Conjunction),
        (RUSSIAN_PARTICLES, WordClass::Particle),
        (RUSSIAN_INTERJECTIONS, WordClass::Interjection),
    ]);
}

/// Classifies a lowercase token; unknown words are `Content`
pub fn classify(token: &str, alphabet: Alphabet) -> WordClass {
    let table = match alphabet {
        Alphabet::Latin => &*ENGLISH,
        Alphabet::Cyrillic => &*RUSSIAN,
    };
    table.get(token).copied().unwrap_or(WordClass::Content)
}
