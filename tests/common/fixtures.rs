#![allow(dead_code)]

use bug_trends::model::{ExternalLink, IssueRow};
use bug_trends::storage::SnapshotStore;
use chrono::NaiveDate;
use serde_json::{Value, json};

pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid test date")
}

pub fn issue(id: i64) -> IssueRow {
    IssueBuilder::new(id).build()
}

pub struct IssueBuilder {
    issue: IssueRow,
}

impl IssueBuilder {
    pub fn new(id: i64) -> Self {
        Self {
            issue: IssueRow {
                id,
                component: "Kernel".to_string(),
                target_release: "---".to_string(),
                assignee: "dev@example.com".to_string(),
                status: "NEW".to_string(),
                summary: format!("Issue {id}"),
                keywords: Vec::new(),
                pm_score: 0,
                externals: Vec::new(),
                datestamp: day("2024-01-01"),
            },
        }
    }

    pub fn component(mut self, component: &str) -> Self {
        self.issue.component = component.to_string();
        self
    }

    pub fn target(mut self, target: &str) -> Self {
        self.issue.target_release = target.to_string();
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.issue.status = status.to_string();
        self
    }

    pub fn keyword(mut self, keyword: &str) -> Self {
        self.issue.keywords.push(keyword.to_string());
        self
    }

    pub fn score(mut self, score: i64) -> Self {
        self.issue.pm_score = score;
        self
    }

    pub fn customer_case(mut self) -> Self {
        self.issue.externals.push(ExternalLink::new(60));
        self
    }

    pub fn external(mut self, tracker_id: i64) -> Self {
        self.issue.externals.push(ExternalLink::new(tracker_id));
        self
    }

    pub fn build(self) -> IssueRow {
        self.issue
    }
}

/// Record `issues` as the snapshot for `date`, stamping each row with it.
pub fn record(store: &SnapshotStore, date: &str, issues: &[IssueRow]) {
    let date = day(date);
    let rows: Vec<IssueRow> = issues
        .iter()
        .cloned()
        .map(|mut row| {
            row.datestamp = date;
            row
        })
        .collect();
    store.replace_day(date, &rows).expect("replace_day");
}

/// Tracker search payload for `issues`, as the tracker would send it.
pub fn tracker_payload(issues: &[IssueRow]) -> Value {
    let bugs: Vec<Value> = issues
        .iter()
        .map(|row| {
            json!({
                "id": row.id,
                "status": row.status,
                "summary": row.summary,
                "component": [row.component],
                "target_release": [row.target_release],
                "assigned_to": row.assignee,
                "keywords": row.keywords,
                "cf_pm_score": row.pm_score.to_string(),
                "external_bugs": row.externals,
            })
        })
        .collect();
    json!({ "bugs": bugs })
}
