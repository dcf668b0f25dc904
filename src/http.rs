//! Cookie-authenticated HTTP client: JSON fetch and attachment download.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_DISPOSITION, REFERER};
use reqwest::Client;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

pub const USER_AGENT: &str = "MetaCTF-Helper/1.0";

const JSON_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

// Content-Disposition filename, RFC 5987 `filename*` form checked first.
static FILENAME_EXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)filename\*\s*=\s*(?:utf-8''|"?)([^";]+)"?"#).unwrap());
static FILENAME_PLAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)filename\s*=\s*"?([^";]+)"?"#).unwrap());

/// One line of a Netscape cookies.txt file: (domain, path, name, value).
fn parse_cookie_line(line: &str) -> Option<(&str, &str, &str, &str)> {
    let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);
    if line.trim().is_empty() || line.starts_with('#') {
        return None;
    }
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 7 {
        return None;
    }
    let domain = fields[0].trim_start_matches('.');
    Some((domain, fields[2], fields[5], fields[6]))
}

/// Load a Netscape-format cookies.txt into a cookie jar.
pub fn load_cookies(cookies_path: &Path) -> Result<Arc<Jar>> {
    if !cookies_path.exists() {
        return Err(Error::Auth(format!(
            "cookies.txt not found at {}",
            cookies_path.display()
        )));
    }

    let contents = std::fs::read_to_string(cookies_path)?;
    let jar = Jar::default();
    let mut loaded = 0usize;
    for line in contents.lines() {
        let Some((domain, path, name, value)) = parse_cookie_line(line) else {
            continue;
        };
        let origin: Url = match format!("https://{domain}/").parse() {
            Ok(url) => url,
            Err(_) => continue,
        };
        jar.add_cookie_str(&format!("{name}={value}; Domain={domain}; Path={path}"), &origin);
        loaded += 1;
    }
    debug!(path = %cookies_path.display(), cookies = loaded, "loaded cookie jar");

    Ok(Arc::new(jar))
}

/// Build the shared client: cookie jar plus the two fixed headers the
/// platform's AJAX endpoints expect.
pub fn build_client(cookies_path: &Path) -> Result<Client> {
    let jar = load_cookies(cookies_path)?;

    let mut headers = HeaderMap::new();
    headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));

    let client = Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .cookie_provider(jar)
        .timeout(JSON_TIMEOUT)
        .build()?;
    Ok(client)
}

/// GET a JSON document. A body starting with `<` means the platform served
/// HTML instead, which signals a stale or missing session rather than a
/// malformed payload.
pub async fn fetch_json(client: &Client, url: &str, referer: Option<&str>) -> Result<Value> {
    let mut request = client.get(url);
    if let Some(referer) = referer {
        request = request.header(REFERER, referer);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Upstream(format!("{url} returned {status}")));
    }

    let body = response.text().await?;
    if body.trim_start().starts_with('<') {
        return Err(Error::Auth(
            "HTML response received (auth issue or wrong endpoint)".to_string(),
        ));
    }

    serde_json::from_str(&body)
        .map_err(|err| Error::Upstream(format!("failed to parse JSON from {url}: {err}")))
}

fn filename_from_headers(headers: &HeaderMap, url: &Url) -> String {
    if let Some(disposition) = headers.get(CONTENT_DISPOSITION).and_then(|v| v.to_str().ok()) {
        for re in [&*FILENAME_EXT, &*FILENAME_PLAIN] {
            if let Some(cap) = re.captures(disposition) {
                // Keep only the basename in case the header smuggles a path.
                let candidate = cap[1]
                    .trim()
                    .rsplit(['/', '\\'])
                    .next()
                    .unwrap_or("")
                    .to_string();
                if !candidate.is_empty() {
                    return candidate;
                }
            }
        }
    }

    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("download")
        .to_string()
}

/// Stream a file to `dest_dir`, creating it if needed. The filename comes
/// from Content-Disposition, then the URL path, then `"download"`. Name
/// collisions overwrite. All failures surface as [`Error::Download`] so the
/// caller can record them per link.
pub async fn download_file(client: &Client, url: &str, dest_dir: &Path) -> Result<PathBuf> {
    stream_download(client, url, dest_dir)
        .await
        .map_err(|err| match err {
            err @ Error::Download { .. } => err,
            other => Error::Download {
                url: url.to_string(),
                reason: other.to_string(),
            },
        })
}

async fn stream_download(client: &Client, url: &str, dest_dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dest_dir).await?;

    let response = client.get(url).timeout(DOWNLOAD_TIMEOUT).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Upstream(format!("{url} returned {status}")));
    }

    let parsed =
        Url::parse(url).map_err(|_| Error::Usage(format!("invalid link URL: {url}")))?;
    let filename = filename_from_headers(response.headers(), &parsed);
    let output_path = dest_dir.join(&filename);

    let mut file = tokio::fs::File::create(&output_path).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    debug!(url, file = %output_path.display(), "downloaded");

    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_line() {
        let line = ".metactf.com\tTRUE\t/\tTRUE\t0\tsession\tabc123";
        assert_eq!(
            parse_cookie_line(line),
            Some(("metactf.com", "/", "session", "abc123"))
        );
    }

    #[test]
    fn test_parse_cookie_line_httponly_prefix() {
        let line = "#HttpOnly_compete.metactf.com\tFALSE\t/\tTRUE\t0\tsid\txyz";
        assert_eq!(
            parse_cookie_line(line),
            Some(("compete.metactf.com", "/", "sid", "xyz"))
        );
    }

    #[test]
    fn test_parse_cookie_line_skips_comments_and_garbage() {
        assert_eq!(parse_cookie_line("# Netscape HTTP Cookie File"), None);
        assert_eq!(parse_cookie_line(""), None);
        assert_eq!(parse_cookie_line("not\ttab\tseparated"), None);
    }

    #[test]
    fn test_load_cookies_missing_file() {
        let err = load_cookies(Path::new("/nonexistent/cookies.txt")).unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    fn test_filename_from_content_disposition() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=\"chall.zip\""),
        );
        let url = Url::parse("https://x.test/get?id=1").unwrap();
        assert_eq!(filename_from_headers(&headers, &url), "chall.zip");
    }

    #[test]
    fn test_filename_star_preferred() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=\"plain.bin\"; filename*=UTF-8''fancy.bin"),
        );
        let url = Url::parse("https://x.test/get").unwrap();
        assert_eq!(filename_from_headers(&headers, &url), "fancy.bin");
    }

    #[test]
    fn test_filename_falls_back_to_url_path() {
        let headers = HeaderMap::new();
        let url = Url::parse("https://x.test/files/notes.pdf").unwrap();
        assert_eq!(filename_from_headers(&headers, &url), "notes.pdf");
    }

    #[test]
    fn test_filename_last_resort() {
        let headers = HeaderMap::new();
        let url = Url::parse("https://x.test/").unwrap();
        assert_eq!(filename_from_headers(&headers, &url), "download");
    }
}
