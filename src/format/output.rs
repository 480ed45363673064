use crate::model::{IssueRow, Milestones, Rollup, ReleaseWindow, TrackedIssue};
use crate::storage::SnapshotRun;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Issue as returned by the `issues` and `snapshot` queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueView {
    #[serde(flatten)]
    pub issue: IssueRow,
    pub age_days: i64,
    pub customer_case: bool,
}

impl IssueView {
    #[must_use]
    pub fn new(tracked: TrackedIssue, customer_tracker_id: i64) -> Self {
        let customer_case = tracked.issue.has_external(customer_tracker_id);
        Self {
            issue: tracked.issue,
            age_days: tracked.age_days,
            customer_case,
        }
    }
}

/// One day's issues with its rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotView {
    pub date: NaiveDate,
    pub issues: Vec<IssueView>,
    pub rollup: Rollup,
}

/// A release with its resolved window and rollup series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseView {
    pub name: String,
    pub targets: Vec<String>,
    pub milestones: Milestones,
    pub window: ReleaseWindow,
    pub rollups: Vec<Rollup>,
}

/// A rollup series and the window it was computed over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupSeries {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<ReleaseWindow>,
    pub rollups: Vec<Rollup>,
}

/// Snapshot date with its visible issue count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateCount {
    pub date: NaiveDate,
    pub issues: usize,
}

impl From<(NaiveDate, usize)> for DateCount {
    fn from((date, issues): (NaiveDate, usize)) -> Self {
        Self { date, issues }
    }
}

/// Store listing for `bt dates`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateListing {
    pub dates: Vec<DateCount>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub runs: Vec<SnapshotRun>,
}
