//! Snapshot ingestion from tracker search results.
//!
//! Accepts the JSON body of a tracker search, either bare
//! (`{"bugs": [...]}`) or wrapped in a JSON-RPC envelope
//! (`{"result": {"bugs": [...]}}`), and records it as the full snapshot for
//! one day.

use crate::error::{OptionExt, Result, TrendsError};
use crate::model::{ExternalLink, IssueRow};
use crate::storage::{ReplaceOutcome, SnapshotStore};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// One bug as returned by the tracker search API.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerBug {
    pub id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub component: OneOrMany,
    #[serde(default)]
    pub target_release: OneOrMany,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub cf_pm_score: Option<Score>,
    #[serde(default)]
    pub external_bugs: Option<Vec<Value>>,
}

/// A field the tracker sends either as a scalar or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
    Null(()),
}

impl Default for OneOrMany {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl OneOrMany {
    /// First value, or empty. Extra values are ignored.
    #[must_use]
    pub fn first(&self) -> String {
        match self {
            Self::One(value) => value.clone(),
            Self::Many(values) => values.first().cloned().unwrap_or_default(),
            Self::Null(()) => String::new(),
        }
    }
}

/// Priority score, numeric or numeric text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Score {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Score {
    fn value(&self, bug: i64) -> Result<i64> {
        match self {
            Self::Int(n) => Ok(*n),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(f) => Ok(f.trunc() as i64),
            Self::Text(text) if text.trim().is_empty() => Ok(0),
            Self::Text(text) => text.trim().parse().map_err(|_| {
                TrendsError::payload(format!("bug {bug}: cf_pm_score '{text}' is not a number"))
            }),
        }
    }
}

impl TrackerBug {
    /// Convert to a snapshot row for `date`.
    ///
    /// # Errors
    ///
    /// Returns `Payload` if the priority score is malformed.
    pub fn into_row(self, date: NaiveDate) -> Result<IssueRow> {
        let pm_score = match &self.cf_pm_score {
            Some(score) => score.value(self.id)?,
            None => 0,
        };
        let externals = self
            .external_bugs
            .unwrap_or_default()
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<ExternalLink>(raw) {
                Ok(link) => Some(link),
                Err(err) => {
                    warn!(bug = self.id, error = %err, "Skipping unreadable external link");
                    None
                }
            })
            .collect();

        Ok(IssueRow {
            id: self.id,
            component: self.component.first(),
            target_release: self.target_release.first(),
            assignee: self.assigned_to.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            summary: self.summary.unwrap_or_default(),
            keywords: self.keywords.unwrap_or_default(),
            pm_score,
            externals,
            datestamp: date,
        })
    }
}

/// Parse a tracker search result into snapshot rows for `date`.
///
/// # Errors
///
/// Returns `Json` for invalid JSON and `Payload` when the bug list is missing
/// or a bug is malformed.
pub fn parse_payload(text: &str, date: NaiveDate) -> Result<Vec<IssueRow>> {
    let mut root: Value = serde_json::from_str(text)?;
    let pointer = if root.get("bugs").is_some() {
        "/bugs"
    } else {
        "/result/bugs"
    };
    let bugs = root.pointer_mut(pointer).map(Value::take).required("bugs")?;
    let Value::Array(bugs) = bugs else {
        return Err(TrendsError::payload("'bugs' is not a list"));
    };

    bugs.into_iter()
        .enumerate()
        .map(|(idx, raw)| {
            serde_json::from_value::<TrackerBug>(raw)
                .map_err(|err| TrendsError::payload(format!("bug #{idx}: {err}")))
                .and_then(|bug| bug.into_row(date))
        })
        .collect()
}

/// Records full daily snapshots into a store.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotIngestor<'s> {
    store: &'s SnapshotStore,
}

impl<'s> SnapshotIngestor<'s> {
    #[must_use]
    pub const fn new(store: &'s SnapshotStore) -> Self {
        Self { store }
    }

    /// Replace the snapshot for `date` with `issues`.
    ///
    /// # Errors
    ///
    /// See [`SnapshotStore::replace_day`].
    pub fn replace_day(&self, date: NaiveDate, issues: &[IssueRow]) -> Result<ReplaceOutcome> {
        self.store.replace_day(date, issues)
    }

    /// Parse a payload and record it for `date`.
    ///
    /// # Errors
    ///
    /// Parse errors, `EmptySnapshot`, and store failures.
    pub fn ingest_str(&self, date: NaiveDate, text: &str) -> Result<ReplaceOutcome> {
        let rows = parse_payload(text, date)?;
        debug!(%date, issues = rows.len(), "Parsed tracker payload");
        self.replace_day(date, &rows)
    }

    /// Read a payload from `reader` and record it for `date`.
    ///
    /// # Errors
    ///
    /// I/O errors plus everything [`Self::ingest_str`] returns.
    pub fn ingest_reader<R: Read>(&self, date: NaiveDate, mut reader: R) -> Result<ReplaceOutcome> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.ingest_str(date, &text)
    }

    /// Read a payload file and record it for `date`.
    ///
    /// # Errors
    ///
    /// `InputNotFound` for a missing file plus everything
    /// [`Self::ingest_str`] returns.
    pub fn ingest_path(&self, date: NaiveDate, path: &Path) -> Result<ReplaceOutcome> {
        if !path.exists() {
            return Err(TrendsError::InputNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path)?;
        self.ingest_str(date, &text)
    }
}
