//! `SQLite` storage implementation.

use crate::error::{Result, TrendsError};
use crate::model::{Breakdown, DEFAULT_CUSTOMER_TRACKER_ID, IssueRow, TrackedIssue};
use crate::storage::filter::{
    CountQuery, DateRef, IssueFilter, ReadScope, breakdown_series_sql, lifecycle_count_sql,
};
use crate::storage::pool::{
    DEFAULT_CHECKOUT_TIMEOUT, DEFAULT_POOL_SIZE, PooledConnection, ReadPool, ReaderSource,
};
use crate::storage::schema::{DEFAULT_BUSY_TIMEOUT_MS, apply_schema, configure_connection};
use crate::storage::SnapshotReader;
use crate::util::time::DAY_FORMAT;
use crate::util::format_day;
use chrono::{NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OpenFlags, OptionalExtension, TransactionBehavior, params, params_from_iter};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

static MEMORY_DB_COUNTER: AtomicU64 = AtomicU64::new(0);

const ISSUE_COLUMNS: &str = "p.id, p.component, p.target_release, p.assignee, p.status, p.summary, \
     p.keywords, p.pm_score, p.externals, p.datestamp";

/// Tuning for a [`SnapshotStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Maximum concurrently open read connections.
    pub read_pool_size: usize,
    pub busy_timeout_ms: u64,
    /// How long a reader waits for a free pooled connection.
    pub checkout_timeout: Duration,
    /// External tracker id that marks a customer case.
    pub customer_tracker_id: i64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            read_pool_size: DEFAULT_POOL_SIZE,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            checkout_timeout: DEFAULT_CHECKOUT_TIMEOUT,
            customer_tracker_id: DEFAULT_CUSTOMER_TRACKER_ID,
        }
    }
}

/// SQLite-backed snapshot store: one writer connection plus a read pool.
#[derive(Debug)]
pub struct SnapshotStore {
    writer: Mutex<Connection>,
    readers: ReadPool,
    /// Open read views per pinned generation.
    pins: Mutex<BTreeMap<i64, usize>>,
    customer_tracker_id: i64,
}

/// Result of replacing one day's snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplaceOutcome {
    pub date: NaiveDate,
    pub generation: i64,
    /// Rows written for the day.
    pub inserted: usize,
    /// Previously visible rows for the day that were superseded.
    pub replaced: usize,
    /// Payload entries dropped because a later entry had the same id.
    pub duplicates: usize,
}

/// One ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRun {
    pub generation: i64,
    pub datestamp: NaiveDate,
    pub issue_count: i64,
    pub ingested_at: String,
}

impl SnapshotStore {
    /// Open (or create) the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, &StoreOptions::default())
    }

    /// Open (or create) the database at the given path with explicit options.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open_with(path: &Path, options: &StoreOptions) -> Result<Self> {
        let writer = Connection::open(path)?;
        configure_connection(&writer, options.busy_timeout_ms)?;
        apply_schema(&writer)?;

        let source = ReaderSource {
            target: path.display().to_string(),
            flags: OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            busy_timeout_ms: options.busy_timeout_ms,
        };
        debug!(path = %path.display(), pool = options.read_pool_size, "Opened snapshot store");
        Self::assemble(writer, &source, options)
    }

    /// Open a private in-memory database, mainly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        Self::open_memory_with(&StoreOptions::default())
    }

    /// In-memory database with explicit options.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory_with(options: &StoreOptions) -> Result<Self> {
        // Shared cache lets pooled readers see the writer's database; the
        // writer connection keeps it alive.
        let n = MEMORY_DB_COUNTER.fetch_add(1, Ordering::Relaxed);
        let uri = format!(
            "file:bug_trends_mem_{}_{n}?mode=memory&cache=shared",
            std::process::id()
        );
        let writer = Connection::open_with_flags(
            &uri,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        configure_connection(&writer, options.busy_timeout_ms)?;
        apply_schema(&writer)?;

        let source = ReaderSource {
            target: uri,
            flags: OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            busy_timeout_ms: options.busy_timeout_ms,
        };
        Self::assemble(writer, &source, options)
    }

    fn assemble(writer: Connection, source: &ReaderSource, options: &StoreOptions) -> Result<Self> {
        Ok(Self {
            writer: Mutex::new(writer),
            readers: source.build_pool(options.read_pool_size, options.checkout_timeout)?,
            pins: Mutex::new(BTreeMap::new()),
            customer_tracker_id: options.customer_tracker_id,
        })
    }

    #[must_use]
    pub const fn customer_tracker_id(&self) -> i64 {
        self.customer_tracker_id
    }

    #[must_use]
    pub const fn read_pool(&self) -> &ReadPool {
        &self.readers
    }

    /// Pin the latest committed generation and return a reader bound to it.
    ///
    /// The pin stays registered until the view drops, so pruning never
    /// removes rows the view can still see.
    ///
    /// # Errors
    ///
    /// Returns an error if no read connection is available or the query fails.
    pub fn begin_read(&self) -> Result<ReadView<'_>> {
        let conn = self.readers.get()?;
        let mut pins = self.lock_pins()?;
        let pin: i64 = conn.query_row(
            "SELECT COALESCE(MAX(generation), 0) FROM snapshot_runs",
            [],
            |row| row.get(0),
        )?;
        *pins.entry(pin).or_default() += 1;
        drop(pins);
        debug!(pin, "Pinned read view");
        Ok(ReadView {
            store: self,
            scope: ReadScope {
                pin,
                customer_tracker_id: self.customer_tracker_id,
            },
        })
    }

    fn lock_pins(&self) -> Result<MutexGuard<'_, BTreeMap<i64, usize>>> {
        self.pins
            .lock()
            .map_err(|_| TrendsError::Pool("pin registry lock poisoned".to_string()))
    }

    fn release_pin(&self, pin: i64) {
        let Ok(mut pins) = self.pins.lock() else {
            return;
        };
        if let Some(count) = pins.get_mut(&pin) {
            *count -= 1;
            if *count == 0 {
                pins.remove(&pin);
            }
        }
    }

    /// Oldest generation an open view is pinned to.
    ///
    /// # Errors
    ///
    /// Returns `Pool` if the pin registry lock is poisoned.
    pub fn oldest_pin(&self) -> Result<Option<i64>> {
        Ok(self.lock_pins()?.keys().next().copied())
    }

    /// Atomically replace the full snapshot for `date`.
    ///
    /// In one immediate transaction: record a new generation, supersede the
    /// day's visible rows, then insert `issues` stamped with `date`. Readers
    /// pinned before the commit keep seeing the old rows; superseded rows stay
    /// on disk until [`Self::prune_superseded`].
    ///
    /// # Errors
    ///
    /// Returns `EmptySnapshot` for an empty payload and store errors otherwise;
    /// the transaction is rolled back on any error.
    pub fn replace_day(&self, date: NaiveDate, issues: &[IssueRow]) -> Result<ReplaceOutcome> {
        if issues.is_empty() {
            return Err(TrendsError::EmptySnapshot { date });
        }

        let (rows, duplicates) = keep_last_per_id(issues);
        if duplicates > 0 {
            warn!(%date, duplicates, "Payload repeats issue ids; keeping the last occurrence");
        }

        let day = format_day(date);
        let mut conn = self
            .writer
            .lock()
            .map_err(|_| TrendsError::Pool("writer lock poisoned".to_string()))?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO snapshot_runs (datestamp, issue_count, ingested_at) VALUES (?, ?, ?)",
            params![
                day,
                i64::try_from(rows.len()).unwrap_or(i64::MAX),
                Utc::now().to_rfc3339()
            ],
        )?;
        let generation = tx.last_insert_rowid();

        let replaced = tx.execute(
            "UPDATE issue_rows SET superseded_by = ? WHERE datestamp = ? AND superseded_by IS NULL",
            params![generation, day],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO issue_rows (
                    id, component, target_release, assignee, status, summary,
                    keywords, pm_score, externals, datestamp, generation
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for issue in &rows {
                stmt.execute(params![
                    issue.id,
                    issue.component,
                    issue.target_release,
                    issue.assignee,
                    issue.status,
                    issue.summary,
                    serde_json::to_string(&issue.keywords)?,
                    issue.pm_score,
                    serde_json::to_string(&issue.externals)?,
                    day,
                    generation,
                ])?;
            }
        }

        tx.commit()?;

        info!(
            %date,
            generation,
            inserted = rows.len(),
            replaced,
            "Replaced daily snapshot"
        );
        Ok(ReplaceOutcome {
            date,
            generation,
            inserted: rows.len(),
            replaced,
            duplicates,
        })
    }

    /// Physically delete superseded rows no open view can see.
    ///
    /// A row superseded at generation `g` is still visible to views pinned
    /// below `g`, so only rows with `superseded_by <= oldest pin` go. With no
    /// open views every superseded row goes.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn prune_superseded(&self) -> Result<usize> {
        let conn = self
            .writer
            .lock()
            .map_err(|_| TrendsError::Pool("writer lock poisoned".to_string()))?;
        // The writer lock blocks new generations, so a view opened after this
        // point pins at least `latest`.
        let latest: i64 = conn.query_row(
            "SELECT COALESCE(MAX(generation), 0) FROM snapshot_runs",
            [],
            |row| row.get(0),
        )?;
        let horizon = self.oldest_pin()?.map_or(latest, |pin| pin.min(latest));
        let removed = conn.execute(
            "DELETE FROM issue_rows WHERE superseded_by IS NOT NULL AND superseded_by <= ?",
            [horizon],
        )?;
        info!(removed, horizon, "Pruned superseded snapshot rows");
        Ok(removed)
    }

    /// Ingestion runs, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn run_history(&self, limit: Option<usize>) -> Result<Vec<SnapshotRun>> {
        let conn = self.readers.get()?;
        let mut sql = String::from(
            "SELECT generation, datestamp, issue_count, ingested_at FROM snapshot_runs ORDER BY generation DESC",
        );
        if let Some(limit) = limit {
            let _ = write!(sql, " LIMIT {limit}");
        }
        let mut stmt = conn.prepare(&sql)?;
        let runs = stmt
            .query_map([], |row| {
                Ok(SnapshotRun {
                    generation: row.get(0)?,
                    datestamp: day_column(row, 1)?,
                    issue_count: row.get(2)?,
                    ingested_at: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(runs)
    }
}

/// Keep the last occurrence of each issue id, in payload order.
fn keep_last_per_id(issues: &[IssueRow]) -> (Vec<&IssueRow>, usize) {
    let last: HashMap<i64, usize> = issues
        .iter()
        .enumerate()
        .map(|(idx, issue)| (issue.id, idx))
        .collect();
    let rows: Vec<&IssueRow> = issues
        .iter()
        .enumerate()
        .filter(|(idx, issue)| last.get(&issue.id) == Some(idx))
        .map(|(_, issue)| issue)
        .collect();
    let duplicates = issues.len() - rows.len();
    (rows, duplicates)
}

/// Point-in-time reader over a [`SnapshotStore`].
///
/// Every query checks out its own pooled connection and filters rows to the
/// pinned generation, so a view can be shared across threads. Dropping the
/// view releases its pin.
#[derive(Debug)]
pub struct ReadView<'a> {
    store: &'a SnapshotStore,
    scope: ReadScope,
}

impl Drop for ReadView<'_> {
    fn drop(&mut self) {
        self.store.release_pin(self.scope.pin);
    }
}

impl ReadView<'_> {
    /// Generation this view is pinned to.
    #[must_use]
    pub const fn pin(&self) -> i64 {
        self.scope.pin
    }

    #[must_use]
    pub const fn scope(&self) -> ReadScope {
        self.scope
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.store.readers.get()?)
    }

    fn count(&self, query: &CountQuery) -> Result<usize> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row(&query.sql, params_from_iter(query.params.iter()), |row| {
            row.get(0)
        })?;
        Ok(usize::try_from(n).unwrap_or_default())
    }

    fn optional_day(&self, sql: &str, params: &[rusqlite::types::Value]) -> Result<Option<NaiveDate>> {
        let conn = self.conn()?;
        let text: Option<String> =
            conn.query_row(sql, params_from_iter(params.iter()), |row| row.get(0))?;
        text.as_deref().map(parse_stored_day).transpose()
    }

    /// Visible issue count for every snapshot date, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn date_counts(&self) -> Result<Vec<(NaiveDate, usize)>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT r.datestamp, COUNT(*) FROM issue_rows r WHERE {} GROUP BY r.datestamp ORDER BY r.datestamp",
            self.scope.visible("r")
        );
        let mut stmt = conn.prepare(&sql)?;
        let counts = stmt
            .query_map([], |row| {
                let n: i64 = row.get(1)?;
                Ok((day_column(row, 0)?, usize::try_from(n).unwrap_or_default()))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(counts)
    }
}

impl SnapshotReader for ReadView<'_> {
    fn latest_date(&self) -> Result<NaiveDate> {
        let sql = format!(
            "SELECT MAX(r.datestamp) FROM issue_rows r WHERE {}",
            self.scope.visible("r")
        );
        self.optional_day(&sql, &[])?.ok_or(TrendsError::NoSnapshots)
    }

    fn earliest_date(&self) -> Result<NaiveDate> {
        let sql = format!(
            "SELECT MIN(r.datestamp) FROM issue_rows r WHERE {}",
            self.scope.visible("r")
        );
        self.optional_day(&sql, &[])?.ok_or(TrendsError::NoSnapshots)
    }

    fn earliest_date_for_targets(&self, targets: &[String]) -> Result<NaiveDate> {
        if targets.is_empty() {
            return Err(TrendsError::EmptyTargets);
        }
        let filter = IssueFilter::new().with_targets(targets.iter().cloned());
        let mut sql = format!(
            "SELECT MIN(p.datestamp) FROM issue_rows p WHERE {}",
            self.scope.visible("p")
        );
        let mut params = Vec::new();
        filter.push_predicates("p", self.scope, &mut sql, &mut params);
        self.optional_day(&sql, &params)?
            .ok_or_else(|| TrendsError::TargetsNotFound {
                targets: targets.to_vec(),
            })
    }

    fn previous_distinct_date(&self, date: NaiveDate) -> Result<Option<NaiveDate>> {
        if !self.has_snapshot(date)? {
            return Err(TrendsError::DateNotFound { date });
        }
        let sql = format!(
            "SELECT MAX(r.datestamp) FROM issue_rows r WHERE r.datestamp < ? AND {}",
            self.scope.visible("r")
        );
        self.optional_day(&sql, &[rusqlite::types::Value::Text(format_day(date))])
    }

    fn snapshot_dates(&self) -> Result<Vec<NaiveDate>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT DISTINCT r.datestamp FROM issue_rows r WHERE {} ORDER BY r.datestamp",
            self.scope.visible("r")
        );
        let mut stmt = conn.prepare(&sql)?;
        let dates = stmt
            .query_map([], |row| day_column(row, 0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(dates)
    }

    fn has_snapshot(&self, date: NaiveDate) -> Result<bool> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT 1 FROM issue_rows r WHERE r.datestamp = ? AND {} LIMIT 1",
            self.scope.visible("r")
        );
        let found = conn
            .query_row(&sql, [format_day(date)], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn issues(&self, date: NaiveDate, filter: &IssueFilter) -> Result<Vec<TrackedIssue>> {
        let mut params = vec![rusqlite::types::Value::Text(format_day(date))];
        let mut sql = format!(
            "SELECT {ISSUE_COLUMNS},
                (SELECT MIN(f.datestamp) FROM issue_rows f WHERE f.id = p.id AND {first_seen})
             FROM issue_rows p WHERE p.datestamp = ? AND {visible}",
            first_seen = self.scope.visible("f"),
            visible = self.scope.visible("p"),
        );
        filter.push_predicates("p", self.scope, &mut sql, &mut params);
        sql.push_str(" ORDER BY p.pm_score DESC, p.id ASC");

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let issues = stmt
            .query_map(params_from_iter(params.iter()), tracked_issue_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(issues)
    }

    fn breakdown(
        &self,
        start: Option<NaiveDate>,
        end: NaiveDate,
        filter: &IssueFilter,
    ) -> Result<Breakdown> {
        if !self.has_snapshot(end)? {
            return Ok(Breakdown::default());
        }

        let total = self.count(&lifecycle_count_sql(
            DateRef::Day(end),
            None,
            filter,
            self.scope,
        ))?;

        let Some(start) = start else {
            return Ok(Breakdown {
                total,
                new: total,
                closed: 0,
            });
        };

        let new = self.count(&lifecycle_count_sql(
            DateRef::Day(end),
            Some(DateRef::Day(start)),
            filter,
            self.scope,
        ))?;
        let closed = self.count(&lifecycle_count_sql(
            DateRef::Day(start),
            Some(DateRef::Day(end)),
            filter,
            self.scope,
        ))?;

        Ok(Breakdown { total, new, closed })
    }

    fn breakdowns_for_all_dates(
        &self,
        filter: &IssueFilter,
    ) -> Result<BTreeMap<NaiveDate, Breakdown>> {
        let query = breakdown_series_sql(filter, self.scope);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&query.sql)?;
        let rows = stmt
            .query_map(params_from_iter(query.params.iter()), |row| {
                let counts: [i64; 3] = [row.get(1)?, row.get(2)?, row.get(3)?];
                let [total, new, closed] = counts.map(|n| usize::try_from(n).unwrap_or_default());
                Ok((day_column(row, 0)?, Breakdown { total, new, closed }))
            })?
            .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;
        Ok(rows)
    }
}

fn parse_stored_day(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, DAY_FORMAT).map_err(|_| TrendsError::InvalidDate {
        value: text.to_string(),
    })
}

fn day_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, DAY_FORMAT)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn json_column<T: DeserializeOwned>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn tracked_issue_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TrackedIssue> {
    let datestamp = day_column(row, 9)?;
    let first_seen = day_column(row, 10)?;
    Ok(TrackedIssue {
        issue: IssueRow {
            id: row.get(0)?,
            component: row.get(1)?,
            target_release: row.get(2)?,
            assignee: row.get(3)?,
            status: row.get(4)?,
            summary: row.get(5)?,
            keywords: json_column(row, 6)?,
            pm_score: row.get(7)?,
            externals: json_column(row, 8)?,
            datestamp,
        },
        age_days: (datestamp - first_seen).num_days(),
    })
}
