//! URL parsing for the two MetaCTF URL shapes:
//! `https://<host>/<event_id>/problems` and
//! `https://<host>/<event_id>/problem?p=<problem_id>`.

use url::Url;

use crate::error::{Error, Result};

/// Parsed event problems-page URL. The scheme is carried through so every
/// derived URL stays on the same origin as the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventUrl {
    pub scheme: String,
    pub host: String,
    pub event_id: String,
}

impl EventUrl {
    /// JSON endpoint backing the event's problems page.
    pub fn api_url(&self) -> String {
        format!(
            "{}://{}/{}/api/problems_json.php",
            self.scheme, self.host, self.event_id
        )
    }

    /// Canonical URL for one of the event's problems.
    pub fn problem_url(&self, problem_id: &str) -> String {
        format!(
            "{}://{}/{}/problem?p={}",
            self.scheme, self.host, self.event_id, problem_id
        )
    }
}

/// Parsed single-problem URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemUrl {
    pub scheme: String,
    pub host: String,
    pub event_id: String,
    pub problem_id: String,
}

impl ProblemUrl {
    /// JSON endpoint backing the problem's event.
    pub fn api_url(&self) -> String {
        format!(
            "{}://{}/{}/api/problems_json.php",
            self.scheme, self.host, self.event_id
        )
    }
}

fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Host including the port when one is present, matching what the
/// platform itself puts in its URLs.
fn authority(url: &Url) -> Option<String> {
    url.host_str().map(|host| match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Parse an event problems-page URL.
pub fn parse_event_url(problems_url: &str) -> Result<EventUrl> {
    let parsed = Url::parse(problems_url)
        .map_err(|_| Error::Usage(format!("invalid URL: {problems_url}")))?;
    let host = authority(&parsed)
        .ok_or_else(|| Error::Usage("invalid URL (missing host)".to_string()))?;

    let segments: Vec<&str> = parsed.path().trim_matches('/').split('/').collect();
    if segments.len() < 2 || segments[1] != "problems" || !is_numeric(segments[0]) {
        return Err(Error::Usage(
            "URL must look like: https://compete.metactf.com/<event_id>/problems".to_string(),
        ));
    }

    Ok(EventUrl {
        scheme: parsed.scheme().to_string(),
        host,
        event_id: segments[0].to_string(),
    })
}

/// Parse a single-problem URL.
pub fn parse_problem_url(problem_url: &str) -> Result<ProblemUrl> {
    let parsed = Url::parse(problem_url)
        .map_err(|_| Error::Usage(format!("invalid URL: {problem_url}")))?;

    let problem_id = parsed
        .query_pairs()
        .find(|(key, _)| key.as_ref() == "p")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| Error::Usage("URL must contain ?p=<problem_id>".to_string()))?;

    let host = authority(&parsed)
        .ok_or_else(|| Error::Usage("invalid URL (missing host)".to_string()))?;

    let segments: Vec<&str> = parsed.path().trim_matches('/').split('/').collect();
    if segments.is_empty() || !is_numeric(segments[0]) {
        return Err(Error::Usage(
            "could not determine event ID from URL".to_string(),
        ));
    }

    Ok(ProblemUrl {
        scheme: parsed.scheme().to_string(),
        host,
        event_id: segments[0].to_string(),
        problem_id,
    })
}
