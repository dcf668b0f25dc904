use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use metactf::cli::{self, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    ExitCode::from(cli::run(cli).await)
}
