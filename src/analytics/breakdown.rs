//! Total/new/closed computation for one date pair and filter.

use crate::error::Result;
use crate::model::{Breakdown, Category};
use crate::storage::{IssueFilter, SnapshotReader};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Filters for the three rollup categories, derived from one base filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFilters {
    pub all: IssueFilter,
    pub blockers: IssueFilter,
    pub customer_cases: IssueFilter,
}

impl CategoryFilters {
    /// `blockers` adds the blocker keyword set; `customer_cases` adds the
    /// customer-case flag and drops any keyword restriction.
    #[must_use]
    pub fn new(base: &IssueFilter, blocker_keywords: &[String]) -> Self {
        let blockers = base.clone().with_keywords(blocker_keywords.iter().cloned());
        let customer_cases = IssueFilter {
            keywords: None,
            ..base.clone()
        }
        .with_customer_case();
        Self {
            all: base.clone(),
            blockers,
            customer_cases,
        }
    }

    #[must_use]
    pub const fn get(&self, category: Category) -> &IssueFilter {
        match category {
            Category::All => &self.all,
            Category::Blockers => &self.blockers,
            Category::CustomerCases => &self.customer_cases,
        }
    }
}

/// Computes breakdowns against a [`SnapshotReader`].
#[derive(Debug)]
pub struct BreakdownEngine<'r, R: SnapshotReader + ?Sized> {
    reader: &'r R,
}

impl<R: SnapshotReader + ?Sized> Clone for BreakdownEngine<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: SnapshotReader + ?Sized> Copy for BreakdownEngine<'_, R> {}

impl<'r, R: SnapshotReader + ?Sized> BreakdownEngine<'r, R> {
    #[must_use]
    pub const fn new(reader: &'r R) -> Self {
        Self { reader }
    }

    /// Breakdown of `end` relative to `start` (`None`: nothing existed before).
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn between(
        &self,
        start: Option<NaiveDate>,
        end: NaiveDate,
        filter: &IssueFilter,
    ) -> Result<Breakdown> {
        self.reader.breakdown(start, end, filter)
    }

    /// Breakdown of `date` relative to its previous snapshot date.
    ///
    /// # Errors
    ///
    /// `DateNotFound` when `date` has no snapshot; store failures propagate.
    pub fn on(&self, date: NaiveDate, filter: &IssueFilter) -> Result<Breakdown> {
        let previous = self.reader.previous_distinct_date(date)?;
        self.between(previous, date, filter)
    }

    /// Breakdowns for every snapshot date in one batch.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn all_dates(&self, filter: &IssueFilter) -> Result<BTreeMap<NaiveDate, Breakdown>> {
        self.reader.breakdowns_for_all_dates(filter)
    }
}
