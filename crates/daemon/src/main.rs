// autopush: watch the current directory and push every change.

use anyhow::Context;
use autopush_daemon::runtime::DEFAULT_LOG_FILTER;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "autopush",
    version,
    about = "Stage, commit and push every change in the current git working tree"
)]
struct Cli {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let root = std::env::current_dir().context("failed to read current directory")?;
    info!(root = %root.display(), "starting autopush");
    autopush_daemon::runtime::run_standalone(&root)
        .await
        .context("autopush terminated unexpectedly")
}
