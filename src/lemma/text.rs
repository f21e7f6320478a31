//! Visible text extraction from stored HTML

use scraper::{ElementRef, Html, Selector};

/// Elements whose text is never shown to a reader
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Visible text of a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageText {
    /// Text of the `<title>` element, empty when absent
    pub title: String,

    /// Text of the `<body>` element, empty when absent
    pub body: String,
}

impl PageText {
    /// Title followed by body, separated by a space when both are present
    pub fn combined(&self) -> String {
        match (self.title.is_empty(), self.body.is_empty()) {
            (true, _) => self.body.clone(),
            (false, true) => self.title.clone(),
            (false, false) => format!("{} {}", self.title, self.body),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.body.is_empty()
    }
}

/// Extracts the title and body text of an HTML document
///
/// Whitespace is collapsed and script/style content is skipped.
///
/// # Example
///
/// ```
/// use lemma_search::lemma::extract_page_text;
///
/// let text = extract_page_text("<html><head><title>Hi</title></head><body><p>There</p></body></html>");
/// assert_eq!(text.combined(), "Hi There");
/// ```
pub fn extract_page_text(html: &str) -> PageText {
    let document = Html::parse_document(html);

    PageText {
        title: first_element_text(&document, "title"),
        body: first_element_text(&document, "body"),
    }
}

fn first_element_text(document: &Html, tag: &str) -> String {
    let selector = match Selector::parse(tag) {
        Ok(selector) => selector,
        Err(_) => return String::new(),
    };

    document
        .select(&selector)
        .next()
        .map(visible_text)
        .unwrap_or_default()
}

fn visible_text(element: ElementRef) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |el| HIDDEN_ELEMENTS.contains(&el.name()))
        });

        if !hidden {
            parts.push(text);
        }
    }

    parts
        .iter()
        .flat_map(|part| part.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}
