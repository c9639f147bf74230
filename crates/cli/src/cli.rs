//! Command-line definitions for `stashly-preview`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use stashly_core::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "stashly-preview")]
#[command(about = "Fetch, cache, and inspect Stashly link previews")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides applied on top of the loaded configuration.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Cache root (default: ~/.stashly/cache)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Number of background workers
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Request timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the preview record of each URL as a JSON line
    Fetch {
        #[arg(required = true)]
        urls: Vec<String>,

        /// Ignore cached records and fetch again
        #[arg(long)]
        refresh: bool,
    },

    /// Load the thumbnail and favicon of a URL
    Images { url: String },

    /// Prefetch previews and images for every saved bookmark
    Warm {
        /// Bookmark file (default: data.json next to the cache)
        #[arg(long)]
        data_file: Option<PathBuf>,
    },

    /// Delete cache entries
    Remove {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

impl GlobalArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
    }
}
