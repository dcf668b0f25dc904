//! Command-line surface: `index`, `fetch` and the concurrent `fetch-all`.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::Command as Process;

use clap::{Parser, Subcommand};
use futures::StreamExt;
use reqwest::Client;
use tracing::error;

use crate::error::{Error, Result};
use crate::fetcher::fetch_problem;
use crate::http::build_client;
use crate::index::{fetch_problem_urls, write_problem_list};
use crate::models::ProblemResult;
use crate::urls::parse_event_url;

const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

#[derive(Parser, Debug)]
#[command(name = "metactf", version, about = "MetaCTF problem scraper")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch problem URLs for an event problems page
    Index {
        /// https://compete.metactf.com/<event_id>/problems
        problems_url: String,
        /// Path to cookies.txt
        #[arg(long, default_value = "cookies.txt")]
        cookies: PathBuf,
        /// Optional output file path for the URL list
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Fetch a single problem
    Fetch {
        /// https://compete.metactf.com/<event_id>/problem?p=<id>
        problem_url: String,
        /// Path to cookies.txt
        #[arg(long, default_value = "cookies.txt")]
        cookies: PathBuf,
        /// Destination root directory
        #[arg(long, default_value = "CTFProblems")]
        dest: PathBuf,
        /// Do not download linked files
        #[arg(long)]
        skip_downloads: bool,
        /// Open the fetched folder in the editor
        #[arg(long)]
        open_folder: bool,
        /// Editor command
        #[arg(long, default_value = "code")]
        code_bin: String,
        /// Open the folder in a new editor window
        #[arg(long)]
        code_new_window: bool,
    },
    /// Fetch all problems from a problems URL or prebuilt list file
    FetchAll {
        /// Event problems URL or a list file with one URL per line
        source: String,
        /// Path to cookies.txt
        #[arg(long, default_value = "cookies.txt")]
        cookies: PathBuf,
        /// Destination root directory
        #[arg(long, default_value = "CTFProblems")]
        dest: PathBuf,
        /// Number of concurrent fetches (default: CPU count)
        #[arg(long)]
        concurrency: Option<NonZeroUsize>,
        /// Do not download linked files
        #[arg(long)]
        skip_downloads: bool,
        /// Open each fetched folder in the editor
        #[arg(long)]
        open_folders: bool,
        /// Editor command
        #[arg(long, default_value = "code")]
        code_bin: String,
        /// Open each folder in a new editor window
        #[arg(long)]
        code_new_window: bool,
    },
}

/// Run a parsed command and map the outcome to a process exit code.
pub async fn run(cli: Cli) -> u8 {
    match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[!] {err}");
            1
        }
    }
}

async fn dispatch(cli: Cli) -> Result<u8> {
    match cli.command {
        Command::Index {
            problems_url,
            cookies,
            output,
        } => handle_index(&problems_url, &cookies, output.as_deref()).await,
        Command::Fetch {
            problem_url,
            cookies,
            dest,
            skip_downloads,
            open_folder,
            code_bin,
            code_new_window,
        } => {
            handle_fetch(
                &problem_url,
                &cookies,
                &dest,
                skip_downloads,
                open_folder,
                &code_bin,
                code_new_window,
            )
            .await
        }
        Command::FetchAll {
            source,
            cookies,
            dest,
            concurrency,
            skip_downloads,
            open_folders,
            code_bin,
            code_new_window,
        } => {
            handle_fetch_all(
                &source,
                &cookies,
                &dest,
                concurrency,
                skip_downloads,
                open_folders,
                &code_bin,
                code_new_window,
            )
            .await
        }
    }
}

async fn handle_index(problems_url: &str, cookies: &Path, output: Option<&Path>) -> Result<u8> {
    let client = build_client(cookies)?;
    let urls = fetch_problem_urls(&client, problems_url).await?;
    let event = parse_event_url(problems_url)?;
    let out_file = write_problem_list(&urls, &event.event_id, output).await?;

    for url in &urls {
        println!("{url}");
    }
    println!("[+] Saved {} URLs to {}", urls.len(), out_file.display());
    Ok(0)
}

async fn handle_fetch(
    problem_url: &str,
    cookies: &Path,
    dest: &Path,
    skip_downloads: bool,
    open_folder: bool,
    code_bin: &str,
    code_new_window: bool,
) -> Result<u8> {
    let client = build_client(cookies)?;
    let result = fetch_problem(&client, problem_url, dest, !skip_downloads).await?;

    print!("{}", result.console_output);
    match &result.links_file {
        Some(links_file) => println!(
            "[+] Saved to {} (links in {})",
            result.problem_file.display(),
            links_file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        ),
        None => println!("[+] Saved to {} (no links found)", result.problem_file.display()),
    }

    if open_folder {
        return open_folders([result.out_dir], code_bin, code_new_window);
    }
    Ok(0)
}

#[allow(clippy::too_many_arguments)]
async fn handle_fetch_all(
    source: &str,
    cookies: &Path,
    dest: &Path,
    concurrency: Option<NonZeroUsize>,
    skip_downloads: bool,
    open_all: bool,
    code_bin: &str,
    code_new_window: bool,
) -> Result<u8> {
    let concurrency = concurrency
        .map(NonZeroUsize::get)
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(4)
        });

    let client = build_client(cookies)?;
    let (urls, list_file) = load_urls(&client, source).await?;
    if urls.is_empty() {
        eprintln!("[!] No URLs found to fetch");
        return Ok(1);
    }

    if let Some(list_file) = &list_file {
        println!("[*] Using list: {}", list_file.display());
    }
    println!(
        "[*] Fetching {} problem(s) with concurrency={concurrency}",
        urls.len()
    );

    let download_links = !skip_downloads;
    let mut stream = futures::stream::iter(urls.iter().map(|url| {
        let client = client.clone();
        let dest = dest.to_path_buf();
        let url = url.clone();
        async move {
            let outcome = fetch_problem(&client, &url, &dest, download_links).await;
            (url, outcome)
        }
    }))
    .buffer_unordered(concurrency);

    let mut results: Vec<ProblemResult> = Vec::new();
    let mut failures = 0usize;
    while let Some((url, outcome)) = stream.next().await {
        match outcome {
            Ok(result) => {
                print_fetch_all_result(&result);
                results.push(result);
            }
            Err(err) => {
                failures += 1;
                error!(url = %url, error = %err, "fetch failed");
                eprintln!("[!] Failed: {url} -> {err}");
            }
        }
    }

    if failures > 0 {
        eprintln!("[!] {failures} problem(s) failed. See logs above.");
        return Ok(1);
    }

    if open_all && !results.is_empty() {
        let rc = open_folders(results.iter().map(|r| r.out_dir.clone()), code_bin, code_new_window)?;
        if rc != 0 {
            return Ok(rc);
        }
    }

    println!("[+] Done.");
    Ok(0)
}

fn print_fetch_all_result(result: &ProblemResult) {
    let links_note = if result.links_file.is_some() {
        "links saved"
    } else {
        "no links"
    };
    let container_note = if result.container_notice.is_some() {
        "container notice"
    } else {
        "no container"
    };
    let line = format!(
        "[+] p={} -> {} ({links_note}; {container_note})",
        result.problem_id,
        result.problem_file.display()
    );
    if result.container_notice.is_some() {
        println!("{RED}{line}{RESET}");
    } else {
        println!("{line}");
    }
}

/// Read a newline-delimited URL list; blank lines and `#` comments skipped.
fn read_list_file(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Resolve a fetch-all source: an existing file is read as a URL list,
/// anything else is treated as a problems URL whose index is fetched and
/// persisted alongside.
async fn load_urls(client: &Client, source: &str) -> Result<(Vec<String>, Option<PathBuf>)> {
    let path = Path::new(source);
    if path.exists() {
        return Ok((read_list_file(path)?, Some(path.to_path_buf())));
    }

    let urls = fetch_problem_urls(client, source).await?;
    let event = parse_event_url(source)?;
    let out_file = write_problem_list(&urls, &event.event_id, None).await?;
    Ok((urls, Some(out_file)))
}

/// Open each directory in the editor once, skipping duplicates. A missing
/// editor binary is an environment error; missing folders are reported and
/// turn the exit code non-zero without stopping the loop.
fn open_folders<I>(paths: I, code_bin: &str, new_window: bool) -> Result<u8>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut visited = HashSet::new();
    let mut rc = 0u8;
    for path in paths {
        let resolved = path.canonicalize().unwrap_or(path);
        if !visited.insert(resolved.clone()) {
            continue;
        }
        if !resolved.exists() {
            eprintln!("[!] Cannot open missing folder: {}", resolved.display());
            rc = 1;
            continue;
        }

        let mut command = Process::new(code_bin);
        if new_window {
            command.arg("-n");
        }
        command.arg(&resolved);
        match command.status() {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(Error::Environment(format!(
                    "editor command not found: {code_bin}"
                )));
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(rc)
}
