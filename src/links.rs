//! Hyperlink extraction from raw problem HTML.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

// Matches <a ... href="..."> with double-quoted, single-quoted or bare values.
static HREF_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap()
});

/// Pull every `<a href>` target out of an HTML fragment, resolved against
/// the page it came from. De-duplicated, first occurrence wins.
pub fn extract_links(html: &str, base_url: &str) -> Vec<String> {
    let base = Url::parse(base_url).ok();
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for cap in HREF_ATTR.captures_iter(html) {
        let href = cap
            .get(1)
            .or_else(|| cap.get(2))
            .or_else(|| cap.get(3))
            .map(|m| m.as_str().trim())
            .unwrap_or("");
        if href.is_empty() {
            continue;
        }
        let resolved = match &base {
            Some(base) => base
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        };
        if seen.insert(resolved.clone()) {
            links.push(resolved);
        }
    }

    links
}
