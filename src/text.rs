//! Coarse HTML-to-text conversion and directory slugs for problem statements.
//!
//! The conversion is lossy by design: readable output, not round-trippable
//! HTML.

use once_cell::sync::Lazy;
use regex::Regex;

static BR_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<\s*br\s*/?\s*>").unwrap());
static PARAGRAPH_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</p\s*>").unwrap());
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static NON_SLUG_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9._-]+").unwrap());
static UNDERSCORE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());

/// Strip an HTML fragment down to readable plain text.
///
/// `<br>` becomes a newline, `</p>` a paragraph break, every other tag is
/// dropped, entities are decoded, and runs of 3+ newlines collapse to 2.
pub fn html_to_text(html: &str) -> String {
    let text = BR_TAG.replace_all(html, "\n");
    let text = PARAGRAPH_CLOSE.replace_all(&text, "\n\n");
    let text = ANY_TAG.replace_all(&text, "");
    let text = html_escape::decode_html_entities(&text).into_owned();
    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Filesystem-safe slug for a problem title. Runs of characters outside
/// `[a-zA-Z0-9._-]` become a single underscore; an empty result falls back
/// to the given default.
pub fn slugify(text: &str, fallback: &str) -> String {
    let slug = NON_SLUG_RUN.replace_all(text.trim(), "_");
    let slug = UNDERSCORE_RUN.replace_all(&slug, "_");
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug.to_string()
    }
}
