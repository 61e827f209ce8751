//! Readability-style extraction for arbitrary pages.
//!
//! No third-party readability service: we walk the DOM ourselves, preferring
//! `<article>`/`<main>` containers, dropping script/style/navigation noise,
//! and collapsing whitespace.

use scraper::{ElementRef, Html, Node, Selector};

use crate::types::{AppError, Result};

/// Elements whose subtrees never contribute readable text.
const NOISE_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "form", "iframe", "svg",
    "button", "select", "template",
];

/// Elements that end a line of prose.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "li", "ul", "ol", "br", "h1", "h2", "h3", "h4", "h5", "h6",
    "blockquote", "pre", "tr", "table",
];

fn selector(pattern: &str) -> Result<Selector> {
    Selector::parse(pattern)
        .map_err(|e| AppError::Extraction(format!("Bad selector '{}': {}", pattern, e)))
}

/// Extract the readable text of an HTML document.
pub fn readable_text(html: &str) -> Result<String> {
    let document = Html::parse_document(html);

    let mut root = None;
    for container in ["article", "main", "body"] {
        if let Some(element) = document.select(&selector(container)?).next() {
            root = Some(element);
            break;
        }
    }
    let Some(root) = root else {
        return Ok(String::new());
    };

    Ok(collapse_whitespace(&collect_text(root)))
}

fn collect_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in root.descendants() {
        match node.value() {
            Node::Text(text) => {
                let noisy = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .map(|element| NOISE_TAGS.contains(&element.name()))
                        .unwrap_or(false)
                });
                if !noisy {
                    out.push_str(text);
                }
            }
            Node::Element(element) if BLOCK_TAGS.contains(&element.name()) => {
                out.push('\n');
            }
            _ => {}
        }
    }
    out
}

fn collapse_whitespace(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
