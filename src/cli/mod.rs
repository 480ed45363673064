//! CLI definitions and entry point.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Daily issue-tracker snapshots and trend rollups (`SQLite`)
#[derive(Parser, Debug)]
#[command(name = "bt", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ./bt.yaml when present)
    #[arg(long, global = true, env = "BT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Snapshot database path
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Maximum concurrent read connections
    #[arg(long, global = true)]
    pub read_pool_size: Option<usize>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Also write JSON log lines to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a tracker search result as the full snapshot for one day
    Ingest(IngestArgs),

    /// List the issues of one snapshot day
    Issues(DateArgs),

    /// One snapshot day: issues plus rollup against the previous day
    Snapshot(DateArgs),

    /// Rollups over a configured release's window
    Release(ReleaseArgs),

    /// Rollups for every configured release
    Releases(FilterArgs),

    /// Rollups over the trailing 63 days
    Rollups(FilterArgs),

    /// Rollups for every recorded snapshot day
    History(FilterArgs),

    /// List snapshot dates and ingestion runs
    Dates(DatesArgs),

    /// Delete superseded snapshot rows
    Prune,

    /// Show the effective configuration
    Config,
}

/// Component filter shared by query commands.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Restrict to these components (repeatable or comma-separated)
    #[arg(long = "component", short = 'c', value_delimiter = ',')]
    pub components: Vec<String>,
}

impl FilterArgs {
    /// `None` when no component was given.
    #[must_use]
    pub fn components(&self) -> Option<Vec<String>> {
        (!self.components.is_empty()).then(|| self.components.clone())
    }
}

#[derive(Args, Debug, Clone)]
pub struct DateArgs {
    /// YYYY-MM-DD, `_latest` or `_earliest`
    #[arg(default_value = "_latest")]
    pub date: String,

    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ReleaseArgs {
    /// Release name as configured
    pub name: String,

    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// Tracker search result (JSON); `-` reads stdin
    #[arg(default_value = "-")]
    pub input: PathBuf,

    /// Snapshot day (default: today, UTC)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DatesArgs {
    /// Also list this many recent ingestion runs
    #[arg(long, default_value_t = 0)]
    pub runs: usize,
}
