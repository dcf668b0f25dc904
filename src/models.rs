//! Views over the platform's loosely-typed problem JSON, and the result of
//! one fetch.

use std::path::PathBuf;

use serde_json::Value;

use crate::error::{Error, Result};

/// Everything one problem fetch produced. Built once, rendered to files,
/// never persisted as a struct.
#[derive(Debug, Clone)]
pub struct ProblemResult {
    pub problem_id: String,
    pub title: String,
    pub out_dir: PathBuf,
    pub problem_file: PathBuf,
    pub links_file: Option<PathBuf>,
    pub downloaded: Vec<PathBuf>,
    /// (url, error) per link that could not be downloaded.
    pub failed_downloads: Vec<(String, String)>,
    pub category: Option<String>,
    pub container_notice: Option<&'static str>,
    /// problem.txt with ANSI color on container-notice lines.
    pub console_output: String,
}

/// The API returns either `{"problems": [...]}` or a bare array.
pub fn problem_list(data: &Value) -> Result<&[Value]> {
    let items = if data.is_object() {
        data.get("problems")
    } else {
        Some(data)
    };
    items
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| Error::Upstream("unexpected JSON structure from API".to_string()))
}

/// `id` fields arrive as strings or numbers; compare stringified.
pub fn id_as_string(problem: &Value) -> Option<String> {
    match problem.get("id")? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Locate the entry whose stringified `id` equals the target.
pub fn find_problem<'a>(items: &'a [Value], problem_id: &str) -> Result<&'a Value> {
    items
        .iter()
        .find(|problem| id_as_string(problem).as_deref() == Some(problem_id))
        .ok_or_else(|| {
            Error::Upstream(format!("problem ID {problem_id} not found in API response"))
        })
}

/// First non-empty string among the given alias keys.
pub fn string_field<'a>(problem: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| problem.get(*key).and_then(Value::as_str))
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_problem_list_wrapped_and_bare() {
        let wrapped = json!({"problems": [{"id": 1}]});
        assert_eq!(problem_list(&wrapped).unwrap().len(), 1);

        let bare = json!([{"id": 1}, {"id": 2}]);
        assert_eq!(problem_list(&bare).unwrap().len(), 2);
    }

    #[test]
    fn test_problem_list_rejects_other_shapes() {
        assert!(problem_list(&json!({"items": []})).is_err());
        assert!(problem_list(&json!("nope")).is_err());
    }

    #[test]
    fn test_find_problem_stringifies_ids() {
        let items = [json!({"id": 7, "name": "seven"}), json!({"id": "8"})];
        assert_eq!(find_problem(&items, "7").unwrap()["name"], "seven");
        assert!(find_problem(&items, "8").is_ok());
        assert!(find_problem(&items, "9").is_err());
    }

    #[test]
    fn test_string_field_aliases() {
        let problem = json!({"title": "", "name": "Real Title"});
        assert_eq!(string_field(&problem, &["name", "title"]), Some("Real Title"));
        assert_eq!(string_field(&problem, &["title"]), None);
        assert_eq!(string_field(&problem, &["missing"]), None);
    }
}
