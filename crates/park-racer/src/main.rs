use anyhow::Result;
use clap::Parser;
use tracing::error;

mod cli;
mod logging;
mod run_cmd;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so the file writer flushes on exit.
    let log_guard = logging::init(cli.log_dir.as_deref())?;

    let result = run_cmd::handle_run(&cli).await;
    if let Err(e) = &result {
        error!(error = %format!("{e:#}"), "startup failed, no racing task launched");
    }
    drop(log_guard);
    result
}
