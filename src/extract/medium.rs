//! Medium article extraction.
//!
//! Medium pages keep the post body inside an `<article>` element with a flat
//! sequence of headings, paragraphs, lists, quotes and code blocks. We walk
//! those nodes in document order and keep the structure as lightweight
//! markdown, which chunks and embeds far better than a flattened blob.

use scraper::{ElementRef, Html, Selector};

use crate::types::{AppError, Result};

use super::generic;

fn selector(pattern: &str) -> Result<Selector> {
    Selector::parse(pattern)
        .map_err(|e| AppError::Extraction(format!("Bad selector '{}': {}", pattern, e)))
}

/// Extract a Medium article, preserving heading/list/code formatting.
/// Falls back to the generic readability walk when no `<article>` exists.
pub fn article_text(html: &str) -> Result<String> {
    let document = Html::parse_document(html);

    if document.select(&selector("article")?).next().is_none() {
        return generic::readable_text(html);
    }

    let flow = selector(
        "article h1, article h2, article h3, article h4, \
         article p, article li, article pre, article blockquote",
    )?;

    let mut blocks: Vec<String> = Vec::new();
    for element in document.select(&flow) {
        // Nested flow elements are rendered by their container.
        if has_flow_ancestor(&element) {
            continue;
        }
        let text = inner_text(&element);
        if text.is_empty() {
            continue;
        }

        let block = match element.value().name() {
            "h1" => format!("# {}", text),
            "h2" => format!("## {}", text),
            "h3" => format!("### {}", text),
            "h4" => format!("#### {}", text),
            "li" => format!("- {}", text),
            "pre" => format!("```\n{}\n```", raw_text(&element)),
            "blockquote" => format!("> {}", text),
            _ => text,
        };
        blocks.push(block);
    }

    Ok(blocks.join("\n\n"))
}

fn has_flow_ancestor(element: &ElementRef<'_>) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .map(|el| matches!(el.name(), "li" | "blockquote" | "pre"))
            .unwrap_or(false)
    })
}

fn inner_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Code blocks keep their own line structure.
fn raw_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
