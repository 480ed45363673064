//! Output formatting for `bug_trends`.
//!
//! Supports human-readable text output and machine-parseable JSON.
//! JSON mode sends clean JSON to stdout with diagnostics to stderr.
//!
//! # Output Types
//!
//! - [`IssueView`] - Issue with age and customer-case flag (issues/snapshot)
//! - [`SnapshotView`] - One day's issues plus its rollup (snapshot)
//! - [`ReleaseView`] - Release metadata, window and rollups (release/releases)
//! - [`RollupSeries`] - Rollups over a window (rollups/history)
//! - [`DateListing`] - Snapshot dates and ingestion runs (dates)

mod output;
mod text;

pub use output::{DateCount, DateListing, IssueView, ReleaseView, RollupSeries, SnapshotView};
pub use text::{
    format_breakdown, format_date_listing, format_issue_line, format_issue_list, format_release,
    format_replace_outcome, format_rollup_table, format_series, format_snapshot, terminal_width,
};

use crate::error::Result;
use serde::Serialize;

/// Print `value` as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
