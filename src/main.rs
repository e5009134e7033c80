mod app;
mod catalog;
mod cli;
mod config;
mod db;
mod error;
mod history;
mod http;
mod nav;
mod paths;
mod player;

use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    init_logging()?;
    let config = config::AppConfig::from_env()?;
    tracing::info!(command = ?cli.command, "starting dubview");
    app::run(cli, config)
}

/// The browser owns the terminal, so logs go to a file.
fn init_logging() -> Result<()> {
    let dir = paths::log_dir_path()?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    let path = dir.join("dubview.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "dubview=info".into()))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .init();
    Ok(())
}
