//! Sparse per-date rollup series.

use crate::analytics::breakdown::{BreakdownEngine, CategoryFilters};
use crate::error::Result;
use crate::model::{Rollup, ReleaseWindow};
use crate::storage::{IssueFilter, SnapshotReader};
use chrono::NaiveDate;
use std::thread;
use tracing::{debug, warn};

/// Default number of dates computed concurrently.
pub const DEFAULT_PARALLELISM: usize = 4;

/// Builds rollup series from a reader.
///
/// The blocker keyword set is fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct RollupAssembler<'c> {
    blocker_keywords: &'c [String],
    parallelism: usize,
}

impl<'c> RollupAssembler<'c> {
    #[must_use]
    pub const fn new(blocker_keywords: &'c [String]) -> Self {
        Self {
            blocker_keywords,
            parallelism: DEFAULT_PARALLELISM,
        }
    }

    /// Limit concurrent workers; match this to the read pool size.
    #[must_use]
    pub fn with_parallelism(mut self, workers: usize) -> Self {
        self.parallelism = workers.max(1);
        self
    }

    /// One rollup per snapshot date inside `window`, oldest first.
    ///
    /// Dates without a snapshot are absent from the result. Each date is
    /// compared with the nearest earlier snapshot date, even one outside the
    /// window. A date whose breakdowns fail is logged and dropped.
    ///
    /// # Errors
    ///
    /// Fails only if the snapshot date list itself cannot be read.
    pub fn assemble<R>(
        &self,
        reader: &R,
        window: ReleaseWindow,
        filter: &IssueFilter,
    ) -> Result<Vec<Rollup>>
    where
        R: SnapshotReader + ?Sized,
    {
        let dates = reader.snapshot_dates()?;
        let work: Vec<(NaiveDate, Option<NaiveDate>)> = dates
            .iter()
            .enumerate()
            .filter(|(_, d)| **d >= window.start && **d <= window.end)
            .map(|(idx, d)| (*d, idx.checked_sub(1).map(|prev| dates[prev])))
            .collect();

        if work.is_empty() {
            debug!(start = %window.start, end = %window.end, "No snapshots in window");
            return Ok(Vec::new());
        }

        let filters = CategoryFilters::new(filter, self.blocker_keywords);
        let engine = BreakdownEngine::new(reader);
        let per_worker = work.len().div_ceil(self.parallelism);

        let rollups: Vec<Rollup> = thread::scope(|s| {
            let handles: Vec<_> = work
                .chunks(per_worker)
                .map(|chunk| {
                    let filters = &filters;
                    s.spawn(move || {
                        chunk
                            .iter()
                            .filter_map(|&(date, previous)| {
                                rollup_for(&engine, date, previous, filters)
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        warn!("Rollup worker panicked; its dates are dropped");
                        Vec::new()
                    })
                })
                .collect()
        });

        debug!(
            requested = work.len(),
            returned = rollups.len(),
            "Assembled rollup series"
        );
        Ok(rollups)
    }

    /// Rollups for every snapshot date, using the batch breakdown query.
    ///
    /// # Errors
    ///
    /// Propagates store failures; the batch form has no per-date fallback.
    pub fn assemble_all<R>(&self, reader: &R, filter: &IssueFilter) -> Result<Vec<Rollup>>
    where
        R: SnapshotReader + ?Sized,
    {
        let filters = CategoryFilters::new(filter, self.blocker_keywords);
        let engine = BreakdownEngine::new(reader);
        let all = engine.all_dates(&filters.all)?;
        let blockers = engine.all_dates(&filters.blockers)?;
        let customer_cases = engine.all_dates(&filters.customer_cases)?;

        Ok(all
            .into_iter()
            .map(|(date, breakdown)| Rollup {
                date,
                all: breakdown,
                blockers: blockers.get(&date).copied().unwrap_or_default(),
                customer_cases: customer_cases.get(&date).copied().unwrap_or_default(),
            })
            .collect())
    }
}

fn rollup_for<R>(
    engine: &BreakdownEngine<'_, R>,
    date: NaiveDate,
    previous: Option<NaiveDate>,
    filters: &CategoryFilters,
) -> Option<Rollup>
where
    R: SnapshotReader + ?Sized,
{
    let computed = engine.between(previous, date, &filters.all).and_then(|all| {
        Ok(Rollup {
            date,
            all,
            blockers: engine.between(previous, date, &filters.blockers)?,
            customer_cases: engine.between(previous, date, &filters.customer_cases)?,
        })
    });

    match computed {
        Ok(rollup) => Some(rollup),
        Err(err) => {
            warn!(%date, error = %err, "Dropping date from rollup series");
            None
        }
    }
}
