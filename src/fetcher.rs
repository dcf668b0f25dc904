//! One problem, end to end: locate it in the event's API payload, derive
//! text/category/notice/links, download attachments, write `problem.txt`
//! and `links.txt`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use reqwest::Client;
use tracing::warn;

use crate::category::detect_category;
use crate::container::detect_container_notice;
use crate::error::Result;
use crate::http::{download_file, fetch_json};
use crate::links::extract_links;
use crate::models::{find_problem, problem_list, string_field, ProblemResult};
use crate::text::{html_to_text, slugify};
use crate::urls::parse_problem_url;

const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

const TITLE_KEYS: &[&str] = &["name", "title"];
const DESCRIPTION_KEYS: &[&str] = &["description", "prompt", "body"];

/// Subdirectory for problems that flagged a container notice.
pub const CONTAINERIZED_DIR: &str = "Containerized";

/// Fetch one problem and leave its artifacts under `root_dir`. Per-link
/// download failures are collected in the result, never raised.
pub async fn fetch_problem(
    client: &Client,
    problem_url: &str,
    root_dir: &Path,
    download_links: bool,
) -> Result<ProblemResult> {
    let parsed = parse_problem_url(problem_url)?;
    let api_url = parsed.api_url();
    let problem_id = parsed.problem_id;

    let data = fetch_json(client, &api_url, Some(problem_url)).await?;
    let items = problem_list(&data)?;
    let problem = find_problem(items, &problem_id)?;

    let fallback = format!("problem_{problem_id}");
    let title = string_field(problem, TITLE_KEYS)
        .map(str::to_string)
        .unwrap_or_else(|| fallback.clone());
    let description = string_field(problem, DESCRIPTION_KEYS).unwrap_or("");

    let text = html_to_text(description);
    let category = detect_category(problem, &[&title, description]);
    let container_notice = detect_container_notice(&[description, &text]);
    let links = extract_links(description, problem_url);

    let slug = slugify(&title, &fallback);
    let out_dir = if container_notice.is_some() {
        root_dir.join(CONTAINERIZED_DIR).join(&slug)
    } else {
        root_dir.join(&slug)
    };
    tokio::fs::create_dir_all(&out_dir).await?;

    let mut downloaded: Vec<PathBuf> = Vec::new();
    let mut downloaded_map: HashMap<String, PathBuf> = HashMap::new();
    let mut failed_downloads: Vec<(String, String)> = Vec::new();
    if download_links {
        for link in &links {
            match download_file(client, link, &out_dir).await {
                Ok(path) => {
                    downloaded.push(path.clone());
                    downloaded_map.insert(link.clone(), path);
                }
                Err(err) => {
                    warn!(link = %link, error = %err, "attachment download failed");
                    let reason = match err {
                        crate::error::Error::Download { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    failed_downloads.push((link.clone(), reason));
                }
            }
        }
    }

    let links_file = if links.is_empty() {
        None
    } else {
        let path = out_dir.join("links.txt");
        let contents = render_links_file(&links, &downloaded_map, &failed_downloads);
        tokio::fs::write(&path, contents).await?;
        Some(path)
    };

    let mut summaries: Vec<String> = Vec::new();
    if let Some(path) = &links_file {
        summaries.push(format!("Links saved to {}", file_name(path)));
    }
    if !downloaded.is_empty() {
        summaries.push(format!(
            "Downloaded {} link(s) into {}",
            downloaded.len(),
            out_dir.display()
        ));
    }
    if !links.is_empty() && !download_links {
        summaries.push("Downloads skipped (links listed only)".to_string());
    }
    if !failed_downloads.is_empty() {
        summaries.push(format!(
            "{} download(s) failed; see {}",
            failed_downloads.len(),
            links_file.as_deref().map(file_name).unwrap_or("links.txt")
        ));
    }
    if let Some(notice) = container_notice {
        summaries.push(notice.to_string());
    }

    let (problem_text, console_output) =
        render_problem_text(&title, category.as_deref(), &text, &summaries, container_notice);
    let problem_file = out_dir.join("problem.txt");
    tokio::fs::write(&problem_file, &problem_text).await?;

    Ok(ProblemResult {
        problem_id,
        title,
        out_dir,
        problem_file,
        links_file,
        downloaded,
        failed_downloads,
        category,
        container_notice,
        console_output,
    })
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|name| name.to_str()).unwrap_or("links.txt")
}

/// Render `problem.txt` and its console variant. The console variant is
/// identical except container-notice lines carry red ANSI escapes.
pub fn render_problem_text(
    title: &str,
    category: Option<&str>,
    text: &str,
    summaries: &[String],
    container_notice: Option<&str>,
) -> (String, String) {
    let separator = "=".repeat(60);
    let mut lines: Vec<String> = vec![separator.clone(), title.to_string(), separator];
    if let Some(category) = category {
        lines.push(format!("Category: {category}"));
    }
    lines.push(text.to_string());
    if let Some(notice) = container_notice {
        lines.push(String::new());
        lines.push(format!("NOTE: {notice}"));
    }
    lines.push(String::new());
    lines.extend(summaries.iter().cloned());

    let output_text = format!("{}\n", lines.join("\n").trim_end());

    let console_output = match container_notice {
        Some(notice) => {
            let colored: Vec<String> = lines
                .iter()
                .map(|line| {
                    if line.contains(notice) || line.trim_start().starts_with("NOTE:") {
                        format!("{RED}{line}{RESET}")
                    } else {
                        line.clone()
                    }
                })
                .collect();
            format!("{}\n", colored.join("\n").trim_end())
        }
        None => output_text.clone(),
    };

    (output_text, console_output)
}

/// Render `links.txt`: one line per link with its download status.
pub fn render_links_file(
    links: &[String],
    downloaded: &HashMap<String, PathBuf>,
    failed: &[(String, String)],
) -> String {
    let mut lines = vec!["Links:".to_string()];
    for link in links {
        let mut status: Vec<String> = Vec::new();
        if let Some(path) = downloaded.get(link) {
            status.push(format!("downloaded -> {}", file_name(path)));
        }
        for (failed_link, err) in failed {
            if failed_link == link {
                status.push(format!("download failed: {err}"));
            }
        }
        if status.is_empty() {
            lines.push(format!("- {link}"));
        } else {
            lines.push(format!("- {link} ({})", status.join("; ")));
        }
    }
    format!("{}\n", lines.join("\n").trim_end())
}
