//! Heuristic detection of dynamic/containerized challenges.
//!
//! False positives and negatives are accepted; the notice only nudges the
//! user to open the problem in a browser.

use once_cell::sync::Lazy;
use regex::Regex;

pub const SPAWN_MESSAGE: &str = "Container spawn message detected; manual action may be required.";
pub const DYNAMIC_MESSAGE: &str = "Dynamic challenge content detected (likely container/polling); \
     open in browser to spawn/manage the container.";

static CONTAINER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"container\s+spawn",
        r"container\s+spawned",
        r"spawning\s+container",
        r"container\s+started",
        r"container\s+ready",
        r"container\s+will\s+be\s+ready",
        r"your\s+container",
        r"container\s+may\s+take",
        r"container\s+running",
        r"container\s+initializing",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Literal markers left behind by the platform's challenge-polling script.
const JS_MARKERS: &[&str] = &[
    "getchaldetails",
    "getchaldetails2",
    "setinterval(() => getchaldetails2",
    "loading ...",
];

/// Scan text chunks (raw HTML, converted text) for container markers.
/// Regex patterns are checked before literal markers within each chunk.
pub fn detect_container_notice(chunks: &[&str]) -> Option<&'static str> {
    for chunk in chunks {
        if chunk.is_empty() {
            continue;
        }
        let lower = chunk.to_lowercase();
        if CONTAINER_PATTERNS.iter().any(|re| re.is_match(&lower)) {
            return Some(SPAWN_MESSAGE);
        }
        if JS_MARKERS.iter().any(|marker| lower.contains(marker)) {
            return Some(DYNAMIC_MESSAGE);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_phrase() {
        let got = detect_container_notice(&["Your container is starting..."]);
        assert_eq!(got, Some(SPAWN_MESSAGE));
    }

    #[test]
    fn test_js_marker() {
        let got = detect_container_notice(&["<script>GetChalDetails2()</script>"]);
        assert_eq!(got, Some(DYNAMIC_MESSAGE));
    }

    #[test]
    fn test_regex_beats_marker() {
        let got = detect_container_notice(&["GetChalDetails(); container ready soon"]);
        assert_eq!(got, Some(SPAWN_MESSAGE));
    }

    #[test]
    fn test_no_notice() {
        assert_eq!(detect_container_notice(&["plain static challenge"]), None);
        assert_eq!(detect_container_notice(&["", ""]), None);
    }
}
