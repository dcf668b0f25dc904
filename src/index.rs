//! Event index: enumerate an event's problem IDs into a canonical URL list.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use reqwest::Client;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::http::fetch_json;
use crate::models::{id_as_string, problem_list};
use crate::urls::parse_event_url;

fn is_numeric(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// Sort key for digit strings of arbitrary length: magnitude first (leading
/// zeros stripped), then the stripped digits. IDs are kept as the platform
/// sent them, so `"012"` stays zero-padded and widths beyond `u64` survive.
fn numeric_key(id: &str) -> (usize, &str) {
    let magnitude = id.trim_start_matches('0');
    (magnitude.len(), magnitude)
}

/// Numeric problem IDs from the API payload, de-duplicated and sorted
/// ascending by value. Non-numeric IDs (category placeholder rows) are
/// dropped.
pub fn extract_problem_ids(data: &Value) -> Vec<String> {
    let Ok(items) = problem_list(data) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut ids: Vec<String> = items
        .iter()
        .filter_map(id_as_string)
        .filter(|id| is_numeric(id))
        .filter(|id| seen.insert(id.clone()))
        .collect();
    ids.sort_by(|a, b| numeric_key(a).cmp(&numeric_key(b)).then_with(|| a.cmp(b)));
    ids
}

/// Fetch the event's problem list and return one canonical URL per problem.
pub async fn fetch_problem_urls(client: &Client, problems_url: &str) -> Result<Vec<String>> {
    let event = parse_event_url(problems_url)?;
    let data = fetch_json(client, &event.api_url(), Some(problems_url)).await?;

    let ids = extract_problem_ids(&data);
    if ids.is_empty() {
        return Err(Error::Upstream(
            "no numeric problem IDs found in the response".to_string(),
        ));
    }

    Ok(ids.iter().map(|id| event.problem_url(id)).collect())
}

fn default_list_path(event_id: &str) -> PathBuf {
    PathBuf::from(format!("metactf_{event_id}_problems.txt"))
}

/// Persist the URL list, one per line. Defaults to
/// `metactf_<event_id>_problems.txt` in the working directory.
pub async fn write_problem_list(
    urls: &[String],
    event_id: &str,
    output_path: Option<&Path>,
) -> Result<PathBuf> {
    let out_file = match output_path {
        Some(path) => path.to_path_buf(),
        None => default_list_path(event_id),
    };
    tokio::fs::write(&out_file, format!("{}\n", urls.join("\n"))).await?;
    Ok(out_file)
}
