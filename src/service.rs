//! Query facade.
//!
//! Every operation pins one [`ReadView`] and answers entirely from it, so the
//! figures returned by one call describe a single point in time even while a
//! new day is being ingested. Failures come back as [`PublicError`]: the full
//! underlying error is logged, the caller only sees a curated message.

use crate::analytics::{BreakdownEngine, CategoryFilters, ReleaseDateResolver, RollupAssembler};
use crate::config::TrendsConfig;
use crate::error::{PublicError, Result, TrendsError};
use crate::format::{DateCount, DateListing, IssueView, ReleaseView, RollupSeries, SnapshotView};
use crate::model::{Release, ReleaseWindow, Rollup};
use crate::storage::{IssueFilter, ReadView, SnapshotReader, SnapshotStore};
use crate::util::DateSpec;
use chrono::NaiveDate;
use tracing::{debug, info_span};

/// Result of a facade operation.
pub type QueryResult<T> = std::result::Result<T, PublicError>;

/// Answers analytic queries against a store with explicit configuration.
#[derive(Debug, Clone, Copy)]
pub struct TrendService<'a> {
    store: &'a SnapshotStore,
    config: &'a TrendsConfig,
    resolver: ReleaseDateResolver,
}

impl<'a> TrendService<'a> {
    #[must_use]
    pub fn new(store: &'a SnapshotStore, config: &'a TrendsConfig) -> Self {
        Self {
            store,
            config,
            resolver: ReleaseDateResolver::default(),
        }
    }

    #[must_use]
    pub const fn with_resolver(mut self, resolver: ReleaseDateResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Issues recorded on `date` (a day or sentinel), highest score first.
    ///
    /// # Errors
    ///
    /// `NotFound` when the date has no snapshot, `ConfigError` for an
    /// unparseable date, `StoreFailure` otherwise.
    pub fn issues(&self, date: &str, components: Option<Vec<String>>) -> QueryResult<Vec<IssueView>> {
        let _span = info_span!("issues", date).entered();
        self.issues_inner(date, components)
            .map_err(|err| PublicError::from_internal(&err, "Error getting list of bugs"))
    }

    /// One day's issues plus its rollup against the previous snapshot day.
    ///
    /// The rollup ignores target releases.
    ///
    /// # Errors
    ///
    /// As [`Self::issues`]; a failing breakdown fails the whole call.
    pub fn snapshot(&self, date: &str, components: Option<Vec<String>>) -> QueryResult<SnapshotView> {
        let _span = info_span!("snapshot", date).entered();
        self.snapshot_inner(date, components).map_err(|err| {
            PublicError::from_internal(&err, format!("Error getting snapshot for date '{date}'"))
        })
    }

    /// A configured release with rollups over its resolved window.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown release or empty store, `InvalidRange` when
    /// the window ends before it starts, `StoreFailure` otherwise.
    pub fn release(&self, name: &str, components: Option<Vec<String>>) -> QueryResult<ReleaseView> {
        let _span = info_span!("release", name).entered();
        let result = self.config.release(name).and_then(|release| {
            let view = self.store.begin_read()?;
            self.release_in(&view, release, components)
        });
        result.map_err(|err| {
            PublicError::from_internal(&err, format!("Error querying for release '{name}'"))
        })
    }

    /// Every configured release, in configuration order.
    ///
    /// # Errors
    ///
    /// The first release that fails fails the whole call.
    pub fn releases(&self, components: Option<Vec<String>>) -> QueryResult<Vec<ReleaseView>> {
        let _span = info_span!("releases", count = self.config.releases.len()).entered();
        let view = self
            .store
            .begin_read()
            .map_err(|err| PublicError::from_internal(&err, "Unable to get list of releases"))?;

        self.config
            .releases
            .iter()
            .map(|release| {
                self.release_in(&view, release, components.clone())
                    .map_err(|err| {
                        PublicError::from_internal(
                            &err,
                            format!("Unable to retrieve release information for '{}'", release.name),
                        )
                    })
            })
            .collect()
    }

    /// Rollups over the trailing window ending on the latest snapshot.
    ///
    /// # Errors
    ///
    /// `NotFound` on an empty store, `StoreFailure` if the date list cannot
    /// be read. Individual failing dates are dropped, not reported.
    pub fn rollups(&self, components: Option<Vec<String>>) -> QueryResult<RollupSeries> {
        let _span = info_span!("rollups").entered();
        self.rollups_inner(components)
            .map_err(|err| PublicError::from_internal(&err, "Unable to get list of rollup data"))
    }

    /// Rollups for every snapshot date, computed in one batch per category.
    ///
    /// # Errors
    ///
    /// Any store failure fails the whole call.
    pub fn history(&self, components: Option<Vec<String>>) -> QueryResult<RollupSeries> {
        let _span = info_span!("history").entered();
        self.history_inner(components)
            .map_err(|err| PublicError::from_internal(&err, "Unable to get rollup history"))
    }

    /// Snapshot dates with their issue counts, plus the most recent
    /// ingestion runs when `runs` is non-zero.
    ///
    /// # Errors
    ///
    /// `StoreFailure` only.
    pub fn dates(&self, runs: usize) -> QueryResult<DateListing> {
        let _span = info_span!("dates").entered();
        self.dates_inner(runs)
            .map_err(|err| PublicError::from_internal(&err, "Unable to list snapshot dates"))
    }

    fn assembler(&self) -> RollupAssembler<'a> {
        RollupAssembler::new(&self.config.blockers).with_parallelism(self.config.read_pool_size)
    }

    /// Resolve a date input and require a snapshot on it.
    fn snapshot_date(&self, view: &ReadView<'_>, date: &str) -> Result<NaiveDate> {
        let spec = DateSpec::parse(date)?;
        let day = self.resolver.resolve_date(view, spec)?;
        if matches!(spec, DateSpec::Day(_)) && !view.has_snapshot(day)? {
            return Err(TrendsError::DateNotFound { date: day });
        }
        Ok(day)
    }

    fn issue_views(
        &self,
        view: &ReadView<'_>,
        day: NaiveDate,
        filter: &IssueFilter,
    ) -> Result<Vec<IssueView>> {
        let tracker = self.store.customer_tracker_id();
        Ok(view
            .issues(day, filter)?
            .into_iter()
            .map(|tracked| IssueView::new(tracked, tracker))
            .collect())
    }

    fn issues_inner(&self, date: &str, components: Option<Vec<String>>) -> Result<Vec<IssueView>> {
        let view = self.store.begin_read()?;
        let day = self.snapshot_date(&view, date)?;
        let issues = self.issue_views(&view, day, &IssueFilter::for_components(components))?;
        debug!(%day, count = issues.len(), "Listed issues");
        Ok(issues)
    }

    fn snapshot_inner(&self, date: &str, components: Option<Vec<String>>) -> Result<SnapshotView> {
        let view = self.store.begin_read()?;
        let day = self.snapshot_date(&view, date)?;
        let base = IssueFilter::for_components(components);
        let issues = self.issue_views(&view, day, &base)?;

        let filters = CategoryFilters::new(&base, &self.config.blockers);
        let engine = BreakdownEngine::new(&view);
        let rollup = Rollup {
            date: day,
            all: engine.on(day, &filters.all)?,
            blockers: engine.on(day, &filters.blockers)?,
            customer_cases: engine.on(day, &filters.customer_cases)?,
        };

        Ok(SnapshotView {
            date: day,
            issues,
            rollup,
        })
    }

    fn release_in(
        &self,
        view: &ReadView<'_>,
        release: &Release,
        components: Option<Vec<String>>,
    ) -> Result<ReleaseView> {
        let window = self.resolver.resolve_window(view, release)?;
        let filter =
            IssueFilter::for_components(components).with_targets(release.targets.iter().cloned());
        let rollups = self.assembler().assemble(view, window, &filter)?;
        debug!(
            release = %release.name,
            start = %window.start,
            end = %window.end,
            rollups = rollups.len(),
            "Resolved release"
        );

        Ok(ReleaseView {
            name: release.name.clone(),
            targets: release.targets.clone(),
            milestones: release.milestones.clone(),
            window,
            rollups,
        })
    }

    fn rollups_inner(&self, components: Option<Vec<String>>) -> Result<RollupSeries> {
        let view = self.store.begin_read()?;
        let window = self.resolver.recent_window(&view)?;
        let rollups =
            self.assembler()
                .assemble(&view, window, &IssueFilter::for_components(components))?;
        Ok(RollupSeries {
            window: Some(window),
            rollups,
        })
    }

    fn history_inner(&self, components: Option<Vec<String>>) -> Result<RollupSeries> {
        let view = self.store.begin_read()?;
        let rollups = self
            .assembler()
            .assemble_all(&view, &IssueFilter::for_components(components))?;
        let window = match (rollups.first(), rollups.last()) {
            (Some(first), Some(last)) => Some(ReleaseWindow {
                start: first.date,
                end: last.date,
            }),
            _ => None,
        };
        Ok(RollupSeries { window, rollups })
    }

    fn dates_inner(&self, runs: usize) -> Result<DateListing> {
        let view = self.store.begin_read()?;
        let dates = view.date_counts()?.into_iter().map(DateCount::from).collect();
        let runs = if runs == 0 {
            Vec::new()
        } else {
            self.store.run_history(Some(runs))?
        };
        Ok(DateListing { dates, runs })
    }
}
