//! Snapshot storage.
//!
//! - `schema` - DDL and connection pragmas
//! - `filter` - issue filter predicate and count query rendering
//! - `pool` - read-only connection pool
//! - `sqlite` - [`SnapshotStore`] (ingestion writer) and [`ReadView`]
//!   (pinned point-in-time reader)

pub mod filter;
pub mod pool;
pub mod schema;
pub mod sqlite;

pub use filter::IssueFilter;
pub use sqlite::{ReadView, ReplaceOutcome, SnapshotRun, SnapshotStore, StoreOptions};

use crate::error::Result;
use crate::model::{Breakdown, TrackedIssue};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Read contract the analytics layer needs from the store.
///
/// Every call on one reader answers from the same point in time.
pub trait SnapshotReader: Sync {
    /// Most recent snapshot date.
    ///
    /// # Errors
    ///
    /// `NoSnapshots` when the store is empty.
    fn latest_date(&self) -> Result<NaiveDate>;

    /// Oldest snapshot date.
    ///
    /// # Errors
    ///
    /// `NoSnapshots` when the store is empty.
    fn earliest_date(&self) -> Result<NaiveDate>;

    /// Oldest snapshot date carrying any of `targets`.
    ///
    /// # Errors
    ///
    /// `EmptyTargets` for an empty list, `TargetsNotFound` when no snapshot
    /// ever carried one of them.
    fn earliest_date_for_targets(&self, targets: &[String]) -> Result<NaiveDate>;

    /// Latest snapshot date strictly before `date`, or `None` when `date` is
    /// the earliest snapshot.
    ///
    /// # Errors
    ///
    /// `DateNotFound` when `date` itself has no snapshot.
    fn previous_distinct_date(&self, date: NaiveDate) -> Result<Option<NaiveDate>>;

    /// Every snapshot date, oldest first.
    ///
    /// # Errors
    ///
    /// Store failures only; an empty store yields an empty list.
    fn snapshot_dates(&self) -> Result<Vec<NaiveDate>>;

    /// # Errors
    ///
    /// Store failures only.
    fn has_snapshot(&self, date: NaiveDate) -> Result<bool>;

    /// Issues on `date` matching `filter`, highest priority score first.
    ///
    /// # Errors
    ///
    /// Store failures only; a date without snapshot yields an empty list.
    fn issues(&self, date: NaiveDate, filter: &IssueFilter) -> Result<Vec<TrackedIssue>>;

    /// Total/new/closed for `end` relative to `start`. `None` for `start`
    /// means nothing existed before `end`.
    ///
    /// # Errors
    ///
    /// Store failures only; an `end` without snapshot yields all zeros.
    fn breakdown(
        &self,
        start: Option<NaiveDate>,
        end: NaiveDate,
        filter: &IssueFilter,
    ) -> Result<Breakdown>;

    /// Breakdown of every snapshot date against its previous snapshot date.
    ///
    /// # Errors
    ///
    /// Store failures only.
    fn breakdowns_for_all_dates(&self, filter: &IssueFilter)
    -> Result<BTreeMap<NaiveDate, Breakdown>>;
}
