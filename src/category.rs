//! Problem category classification.
//!
//! Explicit API fields win; otherwise a keyword scan over the problem text.
//! Both tables are ordered slices: first match in table order is the answer.

use serde_json::Value;

/// Explicit category fields checked on the problem object, in priority order.
const CATEGORY_FIELDS: &[&str] = &["category", "cat", "topic", "type", "domain", "challengeType"];

/// Keyword table, scanned in order. Order is authoritative for ties.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("web", &["http", "cookie", "xss", "sqli", "sql", "csrf", "cors", "lfi", "rfi", "web"]),
    ("crypto", &["rsa", "cipher", "encrypt", "decrypt", "crypto", "aes", "xor", "hash", "modulus"]),
    ("reverse", &["reverse", "disasm", "decompile", "binary", "elf", "ghidra", "ida"]),
    ("pwn", &["overflow", "fmtstr", "heap", "stack", "shellcode", "ret2", "rop", "pwn"]),
    ("forensics", &["pcap", "memory", "forensic", "disk", "image", "artifact"]),
    ("osint", &["twitter", "social", "osint", "linkedin", "geo", "exif"]),
];

fn field_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => {
            let joined: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.is_empty() => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect();
            if joined.is_empty() {
                None
            } else {
                Some(joined.join(", "))
            }
        }
        _ => None,
    }
}

/// Classify a problem: explicit field first, then keyword scan over the
/// lowercased text chunks (title, description). `None` when nothing hits.
pub fn detect_category(problem: &Value, chunks: &[&str]) -> Option<String> {
    for key in CATEGORY_FIELDS {
        if let Some(found) = problem.get(*key).and_then(field_value) {
            return Some(found);
        }
    }

    let text = chunks.join(" ").to_lowercase();
    for (category, keywords) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|keyword| text.contains(keyword)) {
            return Some((*category).to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_explicit_field_wins() {
        let problem = json!({"category": "Web"});
        // Body keywords would say pwn; the explicit field takes priority.
        let got = detect_category(&problem, &["buffer overflow", "rop chain"]);
        assert_eq!(got.as_deref(), Some("Web"));
    }

    #[test]
    fn test_field_priority_order() {
        let problem = json!({"topic": "misc", "cat": "Crypto"});
        assert_eq!(detect_category(&problem, &[]).as_deref(), Some("Crypto"));
    }

    #[test]
    fn test_list_field_joined() {
        let problem = json!({"category": ["Web", "Hardware"]});
        assert_eq!(
            detect_category(&problem, &[]).as_deref(),
            Some("Web, Hardware")
        );
    }

    #[test]
    fn test_keyword_fallback_pwn() {
        let problem = json!({});
        let got = detect_category(&problem, &["buffer overflow", "rop chain"]);
        assert_eq!(got.as_deref(), Some("pwn"));
    }

    #[test]
    fn test_keyword_table_order_breaks_ties() {
        // "sql" (web) and "cipher" (crypto) both present; web comes first.
        let problem = json!({});
        let got = detect_category(&problem, &["a sql cipher puzzle"]);
        assert_eq!(got.as_deref(), Some("web"));
    }

    #[test]
    fn test_no_match() {
        let problem = json!({"category": "  "});
        assert_eq!(detect_category(&problem, &["say hello"]), None);
    }
}
