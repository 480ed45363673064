//! Core data types for `bug_trends`.
//!
//! This module defines the fundamental types used throughout the application:
//! - `IssueRow` - One issue as recorded in one daily snapshot
//! - `ExternalLink` - A reference from an issue into another tracking system
//! - `Breakdown` - Total/new/closed counts for one day and filter
//! - `Rollup` - One day's three breakdowns
//! - `Release` / `Milestones` - Configured release reporting windows

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Tracker id of the customer-portal external tracker. An issue linked to it
/// carries a customer case.
pub const DEFAULT_CUSTOMER_TRACKER_ID: i64 = 60;

/// Link from an issue to a record in an external tracking system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalLink {
    /// Identifier of the external tracking system. Trackers send it as a
    /// number or as numeric text.
    #[serde(rename = "ext_bz_id", deserialize_with = "tracker_id_from_number_or_text")]
    pub tracker_id: i64,
    /// Identifier of the record inside that system.
    #[serde(rename = "ext_bz_bug_id", default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<Value>,
    /// Any other fields the tracker sent along; kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExternalLink {
    #[must_use]
    pub fn new(tracker_id: i64) -> Self {
        Self {
            tracker_id,
            record_id: None,
            extra: Map::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(i64),
    Text(String),
}

fn tracker_id_from_number_or_text<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(text) => text.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("ext_bz_id '{text}' is not a number"))
        }),
    }
}

/// One issue in one daily snapshot.
///
/// Presence of a row on a date means the issue existed, in exactly this
/// state, on that date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRow {
    pub id: i64,
    pub component: String,
    pub target_release: String,
    pub assignee: String,
    pub status: String,
    pub summary: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub pm_score: i64,
    #[serde(default)]
    pub externals: Vec<ExternalLink>,
    pub datestamp: NaiveDate,
}

impl IssueRow {
    /// Does this issue reference the given external tracker?
    #[must_use]
    pub fn has_external(&self, tracker_id: i64) -> bool {
        self.externals.iter().any(|link| link.tracker_id == tracker_id)
    }
}

/// An issue row plus how long its id has been known to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedIssue {
    #[serde(flatten)]
    pub issue: IssueRow,
    /// Days between the first snapshot containing this id and `issue.datestamp`.
    pub age_days: i64,
}

/// Total/new/closed counts for one date and filter, relative to a comparison date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub total: usize,
    pub new: usize,
    pub closed: usize,
}

/// The three fixed breakdown categories of a rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    All,
    Blockers,
    CustomerCases,
}

impl Category {
    pub const ALL: [Self; 3] = [Self::All, Self::Blockers, Self::CustomerCases];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Blockers => "blockers",
            Self::CustomerCases => "customer_cases",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One date and its three breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rollup {
    pub date: NaiveDate,
    pub all: Breakdown,
    pub blockers: Breakdown,
    pub customer_cases: Breakdown,
}

impl Rollup {
    #[must_use]
    pub const fn get(&self, category: Category) -> Breakdown {
        match category {
            Category::All => self.all,
            Category::Blockers => self.blockers,
            Category::CustomerCases => self.customer_cases,
        }
    }
}

/// Milestone dates of a release. Each is empty, a sentinel, or `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Milestones {
    pub start: String,
    pub feature_complete: String,
    pub code_freeze: String,
    pub ga: String,
}

/// A configured product release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub name: String,
    /// Target-release labels this release aggregates.
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default, alias = "dates")]
    pub milestones: Milestones,
}

/// Concrete, inclusive reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReleaseWindow {
    /// Every calendar day in the window, oldest first.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}
