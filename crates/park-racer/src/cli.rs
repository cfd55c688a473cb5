use std::path::PathBuf;

use clap::Parser;
use racer_config::DEFAULT_CONFIG_PATH;

#[derive(Parser, Debug)]
#[command(name = "racer")]
#[command(version)]
#[command(about = "Park reservation racer: fires reservation calls the moment a window opens")]
pub struct Cli {
    /// Config file (JSON, or TOML when the extension is .toml)
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Also write logs to a timestamped file in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Run every startup step and log the plan without firing
    #[arg(long)]
    pub dry_run: bool,
}
