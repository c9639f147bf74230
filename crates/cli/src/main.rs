//! stashly-preview entry point.
//!
//! Command output goes to stdout; logging goes to stderr so the JSON lines
//! printed by `fetch` stay machine-readable.

use std::io::Write;

use anyhow::Result;
use clap::Parser;
use stashly_client::{TaskRunner, WorkerPool};
use stashly_core::AppConfig;
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Command};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.json);

    let mut config = AppConfig::load()?;
    cli.global.apply(&mut config);
    config.validate()?;

    tracing::debug!(cache_dir = %config.cache_dir.display(), workers = config.workers, "configuration loaded");

    let pool = WorkerPool::from_handle(Handle::current(), config.workers);
    let runner = TaskRunner::from_config(pool, &config)?;
    let mut out = std::io::stdout();

    match cli.command {
        Command::Fetch { urls, refresh } => commands::fetch(&runner, urls, refresh, &mut out).await?,
        Command::Images { url } => commands::images(&runner, url, &mut out).await?,
        Command::Warm { data_file } => {
            let data_file = data_file.unwrap_or_else(|| config.data_file.clone());
            let summary = commands::warm(&runner, &data_file).await?;
            writeln!(out, "{}", serde_json::to_string(&summary)?)?;
        }
        Command::Remove { urls } => commands::remove(&runner, urls, &mut out).await?,
    }

    out.flush()?;
    Ok(())
}
