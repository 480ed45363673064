//! Release reporting windows.
//!
//! A release configures its milestones loosely: a literal day, a sentinel,
//! or nothing. Resolution turns that into a concrete inclusive window:
//!
//! - end: GA milestone; empty or `_latest` is the latest snapshot,
//!   `_earliest` the earliest.
//! - start: start milestone through the same rules when set; otherwise the
//!   first snapshot carrying one of the release targets, or the end minus
//!   the fallback span when no snapshot ever did.
//!
//! A window ending before it starts is an error naming the release.

use crate::error::{Result, TrendsError};
use crate::model::{Release, ReleaseWindow};
use crate::storage::SnapshotReader;
use crate::util::time::{DateSpec, RECENT_WINDOW_DAYS, days_before};
use chrono::NaiveDate;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseDateResolver {
    fallback_days: i64,
}

impl Default for ReleaseDateResolver {
    fn default() -> Self {
        Self {
            fallback_days: RECENT_WINDOW_DAYS,
        }
    }
}

impl ReleaseDateResolver {
    /// Resolver whose missing-start fallback spans `fallback_days`.
    #[must_use]
    pub const fn with_fallback_days(fallback_days: i64) -> Self {
        Self { fallback_days }
    }

    /// Resolve a date input against the store.
    ///
    /// # Errors
    ///
    /// `NoSnapshots` for a sentinel on an empty store.
    pub fn resolve_date<R>(&self, reader: &R, spec: DateSpec) -> Result<NaiveDate>
    where
        R: SnapshotReader + ?Sized,
    {
        match spec {
            DateSpec::Latest => reader.latest_date(),
            DateSpec::Earliest => reader.earliest_date(),
            DateSpec::Day(day) => Ok(day),
        }
    }

    /// Concrete window for `release`.
    ///
    /// # Errors
    ///
    /// `InvalidDate` for an unparseable milestone, `NoSnapshots` when a
    /// sentinel needs data, `InvalidRange` when end precedes start, and store
    /// failures from the target lookup.
    pub fn resolve_window<R>(&self, reader: &R, release: &Release) -> Result<ReleaseWindow>
    where
        R: SnapshotReader + ?Sized,
    {
        let end = self.resolve_date(reader, DateSpec::parse(&release.milestones.ga)?)?;

        let start = if release.milestones.start.trim().is_empty() {
            match reader.earliest_date_for_targets(&release.targets) {
                Ok(day) => day,
                Err(err @ (TrendsError::TargetsNotFound { .. } | TrendsError::EmptyTargets)) => {
                    let fallback = days_before(end, self.fallback_days);
                    debug!(
                        release = %release.name,
                        reason = %err,
                        %fallback,
                        "No snapshot carries the release targets; using fallback start"
                    );
                    fallback
                }
                Err(err) => return Err(err),
            }
        } else {
            self.resolve_date(reader, DateSpec::parse(&release.milestones.start)?)?
        };

        if end < start {
            return Err(TrendsError::InvalidRange {
                release: release.name.clone(),
                start,
                end,
            });
        }

        Ok(ReleaseWindow { start, end })
    }

    /// Trailing window ending on the latest snapshot.
    ///
    /// # Errors
    ///
    /// `NoSnapshots` when the store is empty.
    pub fn recent_window<R>(&self, reader: &R) -> Result<ReleaseWindow>
    where
        R: SnapshotReader + ?Sized,
    {
        let end = reader.latest_date()?;
        Ok(ReleaseWindow {
            start: days_before(end, self.fallback_days),
            end,
        })
    }
}
