/// End-to-end test for fetch-all failure isolation: a batch where one URL
/// fails must still leave complete artifacts for the rest and exit non-zero.
use std::num::NonZeroUsize;
use std::path::PathBuf;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use metactf::cli::{run, Cli, Command};

const PROBLEMS_JSON: &str = concat!(
    r#"{"problems":["#,
    r#"{"id":1,"name":"Alpha","description":"<p>first body</p>"},"#,
    r#"{"id":2,"name":"Beta","description":"<p>second body</p>"}"#,
    r#"]}"#
);

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("metactf-e2e-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Minimal HTTP listener that answers every request with the problems JSON.
async fn serve_problems(listener: TcpListener) {
    loop {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        tokio::spawn(async move {
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                PROBLEMS_JSON.len(),
                PROBLEMS_JSON
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
    }
}

#[tokio::test]
async fn test_fetch_all_isolates_one_failing_url() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_problems(listener));

    let dir = temp_dir("fetch-all");
    let cookies = dir.join("cookies.txt");
    std::fs::write(&cookies, "# Netscape HTTP Cookie File\n").unwrap();

    // Problem 3 is absent from the API payload, so its fetch must fail
    // while the other two complete.
    let list_file = dir.join("urls.txt");
    let urls: String = (1..=3)
        .map(|p| format!("http://{addr}/77/problem?p={p}\n"))
        .collect();
    std::fs::write(&list_file, urls).unwrap();

    let dest = dir.join("problems");
    let cli = Cli {
        command: Command::FetchAll {
            source: list_file.to_string_lossy().into_owned(),
            cookies,
            dest: dest.clone(),
            concurrency: Some(NonZeroUsize::new(2).unwrap()),
            skip_downloads: true,
            open_folders: false,
            code_bin: "code".to_string(),
            code_new_window: false,
        },
    };

    assert_eq!(run(cli).await, 1, "one failed URL must fail the whole batch");

    let alpha = std::fs::read_to_string(dest.join("Alpha").join("problem.txt")).unwrap();
    assert!(alpha.contains("Alpha"));
    assert!(alpha.contains("first body"));
    let beta = std::fs::read_to_string(dest.join("Beta").join("problem.txt")).unwrap();
    assert!(beta.contains("second body"));

    // Exactly the two surviving problems left artifacts behind; the failed
    // URL produced nothing.
    let produced = std::fs::read_dir(&dest).unwrap().count();
    assert_eq!(produced, 2);
}
