//! Plain text rendering for terminal output.
//!
//! - Issue lines (id, score, status, component, summary)
//! - Breakdown cells (`total +new -closed`)
//! - Rollup tables, one row per snapshot date

use super::output::{DateListing, IssueView, ReleaseView, RollupSeries, SnapshotView};
use crate::model::{Breakdown, Category, Rollup};
use crate::storage::ReplaceOutcome;
use crate::util::{format_day, pad_display, truncate_display};
use std::fmt::Write as _;

const ID_WIDTH: usize = 9;
const SCORE_WIDTH: usize = 5;
const STATUS_WIDTH: usize = 12;
const COMPONENT_WIDTH: usize = 18;
const DATE_WIDTH: usize = 10;
const CELL_WIDTH: usize = 18;

/// Terminal width from `COLUMNS`, defaulting to 80.
#[must_use]
pub fn terminal_width() -> usize {
    if let Ok(columns) = std::env::var("COLUMNS") {
        if let Ok(value) = columns.trim().parse::<usize>() {
            if value > 0 {
                return value;
            }
        }
    }
    80
}

/// `12 +3 -1`, or just the total when nothing changed.
#[must_use]
pub fn format_breakdown(breakdown: Breakdown) -> String {
    if breakdown.new == 0 && breakdown.closed == 0 {
        return breakdown.total.to_string();
    }
    format!(
        "{} +{} -{}",
        breakdown.total, breakdown.new, breakdown.closed
    )
}

/// One issue per line, summary truncated to `max_width` columns.
#[must_use]
pub fn format_issue_line(view: &IssueView, max_width: Option<usize>) -> String {
    let issue = &view.issue;
    let marker = if view.customer_case { "$" } else { " " };
    let prefix = format!(
        "{} {} {} {} {marker} ",
        pad_display(&issue.id.to_string(), ID_WIDTH),
        pad_display(&issue.pm_score.to_string(), SCORE_WIDTH),
        pad_display(&truncate_display(&issue.status, STATUS_WIDTH), STATUS_WIDTH),
        pad_display(
            &truncate_display(&issue.component, COMPONENT_WIDTH),
            COMPONENT_WIDTH
        ),
    );
    let summary = max_width.map_or_else(
        || issue.summary.clone(),
        |width| truncate_display(&issue.summary, width.saturating_sub(prefix.len())),
    );
    format!("{prefix}{summary}")
}

/// Table of rollups: date plus one column per category.
#[must_use]
pub fn format_rollup_table(rollups: &[Rollup]) -> String {
    let mut out = String::new();
    let _ = write!(out, "{}", pad_display("date", DATE_WIDTH));
    for category in Category::ALL {
        let _ = write!(out, "  {}", pad_display(category.as_str(), CELL_WIDTH));
    }
    out.truncate(out.trim_end().len());
    out.push('\n');

    for rollup in rollups {
        let mut line = format_day(rollup.date);
        for category in Category::ALL {
            let _ = write!(
                line,
                "  {}",
                pad_display(&format_breakdown(rollup.get(category)), CELL_WIDTH)
            );
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[must_use]
pub fn format_issue_list(issues: &[IssueView], max_width: Option<usize>) -> String {
    let mut out = String::new();
    for view in issues {
        out.push_str(&format_issue_line(view, max_width));
        out.push('\n');
    }
    let _ = writeln!(out, "{} issue(s)", issues.len());
    out
}

#[must_use]
pub fn format_snapshot(snapshot: &SnapshotView, max_width: Option<usize>) -> String {
    let mut out = format!("Snapshot {}\n\n", format_day(snapshot.date));
    out.push_str(&format_issue_list(&snapshot.issues, max_width));
    out.push('\n');
    out.push_str(&format_rollup_table(std::slice::from_ref(&snapshot.rollup)));
    out
}

#[must_use]
pub fn format_release(release: &ReleaseView) -> String {
    let mut out = format!(
        "Release {} ({} to {})\n",
        release.name,
        format_day(release.window.start),
        format_day(release.window.end)
    );
    if !release.targets.is_empty() {
        let _ = writeln!(out, "Targets: {}", release.targets.join(", "));
    }
    let milestones = [
        ("start", &release.milestones.start),
        ("feature complete", &release.milestones.feature_complete),
        ("code freeze", &release.milestones.code_freeze),
        ("ga", &release.milestones.ga),
    ];
    for (label, value) in milestones {
        if !value.is_empty() {
            let _ = writeln!(out, "  {label}: {value}");
        }
    }
    out.push('\n');
    if release.rollups.is_empty() {
        out.push_str("No snapshots in window.\n");
    } else {
        out.push_str(&format_rollup_table(&release.rollups));
    }
    out
}

#[must_use]
pub fn format_series(series: &RollupSeries) -> String {
    let mut out = String::new();
    if let Some(window) = series.window {
        let _ = writeln!(
            out,
            "{} to {}\n",
            format_day(window.start),
            format_day(window.end)
        );
    }
    if series.rollups.is_empty() {
        out.push_str("No snapshots.\n");
    } else {
        out.push_str(&format_rollup_table(&series.rollups));
    }
    out
}

#[must_use]
pub fn format_date_listing(listing: &DateListing) -> String {
    let mut out = String::new();
    for entry in &listing.dates {
        let _ = writeln!(out, "{}  {}", format_day(entry.date), entry.issues);
    }
    if !listing.runs.is_empty() {
        out.push_str("\nIngestion runs:\n");
        for run in &listing.runs {
            let _ = writeln!(
                out,
                "  #{:<6} {}  {:>6} issue(s)  {}",
                run.generation,
                format_day(run.datestamp),
                run.issue_count,
                run.ingested_at
            );
        }
    }
    if listing.dates.is_empty() {
        out.push_str("No snapshots recorded.\n");
    }
    out
}

#[must_use]
pub fn format_replace_outcome(outcome: &ReplaceOutcome) -> String {
    let mut out = format!(
        "Recorded {} issue(s) for {}",
        outcome.inserted,
        format_day(outcome.date)
    );
    if outcome.replaced > 0 {
        let _ = write!(out, ", replacing {}", outcome.replaced);
    }
    if outcome.duplicates > 0 {
        let _ = write!(out, " ({} duplicate id(s) dropped)", outcome.duplicates);
    }
    out
}
