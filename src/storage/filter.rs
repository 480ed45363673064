//! Issue filter predicate and the lifecycle count query builder.
//!
//! Every Total/New/Closed count is rendered by [`lifecycle_count_sql`]. The
//! filter binds only the primary side of a count; the side an id must be
//! absent from is checked against the whole unfiltered snapshot. New counts
//! therefore track ids that are brand new to the tracker, and Closed counts
//! ids that left it entirely, not ids that drifted in or out of the filter.

use chrono::NaiveDate;
use rusqlite::types::Value;
use std::fmt::Write as _;

use crate::util::format_day;

/// Optional restrictions on issue rows. An absent or empty list does not
/// restrict its dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    /// Component labels, OR-matched.
    pub components: Option<Vec<String>>,
    /// Keyword set; a row matches when it carries any of them.
    pub keywords: Option<Vec<String>>,
    /// Only rows linked to the customer-case tracker.
    pub customer_case: bool,
    /// Target-release labels, OR-matched.
    pub targets: Option<Vec<String>>,
}

impl IssueFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on components only.
    #[must_use]
    pub fn for_components(components: Option<Vec<String>>) -> Self {
        Self {
            components,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub const fn with_customer_case(mut self) -> Self {
        self.customer_case = true;
        self
    }

    #[must_use]
    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    /// True when no dimension is restricted.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        active(self.components.as_ref()).is_none()
            && active(self.keywords.as_ref()).is_none()
            && !self.customer_case
            && active(self.targets.as_ref()).is_none()
    }

    /// Append ` AND ...` predicates on `alias` to `sql`, pushing bound values.
    pub(crate) fn push_predicates(
        &self,
        alias: &str,
        scope: ReadScope,
        sql: &mut String,
        params: &mut Vec<Value>,
    ) {
        if let Some(components) = active(self.components.as_ref()) {
            let _ = write!(
                sql,
                " AND {alias}.component IN ({})",
                placeholders(components.len())
            );
            push_text(params, components);
        }

        if let Some(keywords) = active(self.keywords.as_ref()) {
            let _ = write!(
                sql,
                " AND EXISTS (SELECT 1 FROM json_each({alias}.keywords) kw WHERE kw.value IN ({}))",
                placeholders(keywords.len())
            );
            push_text(params, keywords);
        }

        if self.customer_case {
            let _ = write!(
                sql,
                " AND EXISTS (SELECT 1 FROM json_each({alias}.externals) ext \
                 WHERE CAST(json_extract(ext.value, '$.ext_bz_id') AS INTEGER) = ?)"
            );
            params.push(Value::Integer(scope.customer_tracker_id));
        }

        if let Some(targets) = active(self.targets.as_ref()) {
            let _ = write!(
                sql,
                " AND {alias}.target_release IN ({})",
                placeholders(targets.len())
            );
            push_text(params, targets);
        }
    }
}

/// What a reader is allowed to see and how it interprets customer links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadScope {
    /// Highest ingestion generation visible to this reader.
    pub pin: i64,
    /// External tracker id that marks a customer case.
    pub customer_tracker_id: i64,
}

impl ReadScope {
    /// SQL condition selecting rows of `alias` visible at the pin.
    ///
    /// The pin is an integer owned by the store, never caller text.
    #[must_use]
    pub fn visible(&self, alias: &str) -> String {
        format!(
            "{alias}.generation <= {pin} AND ({alias}.superseded_by IS NULL OR {alias}.superseded_by > {pin})",
            pin = self.pin
        )
    }
}

/// A day in a count query: a bound literal or a column of an enclosing query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRef<'a> {
    Day(NaiveDate),
    Column(&'a str),
}

impl DateRef<'_> {
    fn render(&self, params: &mut Vec<Value>) -> String {
        match self {
            Self::Day(day) => {
                params.push(Value::Text(format_day(*day)));
                "?".to_string()
            }
            Self::Column(column) => (*column).to_string(),
        }
    }
}

/// Rendered SQL and its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Render one lifecycle count.
///
/// Counts rows on `primary` that match `filter`. With `absent_from`, only
/// rows whose id has no visible row at all on that day are counted.
///
/// - Total: `(end, None)`
/// - New: `(end, Some(start))`
/// - Closed: `(start, Some(end))`
#[must_use]
pub fn lifecycle_count_sql(
    primary: DateRef<'_>,
    absent_from: Option<DateRef<'_>>,
    filter: &IssueFilter,
    scope: ReadScope,
) -> CountQuery {
    let mut params = Vec::new();
    let mut sql = String::from("SELECT COUNT(*) FROM issue_rows p WHERE p.datestamp = ");
    sql.push_str(&primary.render(&mut params));
    let _ = write!(sql, " AND {}", scope.visible("p"));
    filter.push_predicates("p", scope, &mut sql, &mut params);

    if let Some(other) = absent_from {
        let day = other.render(&mut params);
        let _ = write!(
            sql,
            " AND NOT EXISTS (SELECT 1 FROM issue_rows o WHERE o.id = p.id AND o.datestamp = {day} AND {})",
            scope.visible("o")
        );
    }

    CountQuery { sql, params }
}

/// Render the batch form: one row per visible snapshot date with
/// `(day, total, new, closed)` relative to the previous visible date.
#[must_use]
pub fn breakdown_series_sql(filter: &IssueFilter, scope: ReadScope) -> CountQuery {
    let total = lifecycle_count_sql(DateRef::Column("days.day"), None, filter, scope);
    let new = lifecycle_count_sql(
        DateRef::Column("days.day"),
        Some(DateRef::Column("days.prev")),
        filter,
        scope,
    );
    let closed = lifecycle_count_sql(
        DateRef::Column("days.prev"),
        Some(DateRef::Column("days.day")),
        filter,
        scope,
    );

    // A NULL prev matches no row: New falls back to Total and Closed to 0.
    let sql = format!(
        "WITH days AS (
            SELECT datestamp AS day, LAG(datestamp) OVER (ORDER BY datestamp) AS prev
            FROM (SELECT DISTINCT r.datestamp AS datestamp FROM issue_rows r WHERE {visible})
        )
        SELECT days.day, ({total}), ({new}), ({closed}) FROM days ORDER BY days.day",
        visible = scope.visible("r"),
        total = total.sql,
        new = new.sql,
        closed = closed.sql,
    );

    let mut params = total.params;
    params.extend(new.params);
    params.extend(closed.params);
    CountQuery { sql, params }
}

fn active(list: Option<&Vec<String>>) -> Option<&[String]> {
    list.map(Vec::as_slice).filter(|items| !items.is_empty())
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

fn push_text(params: &mut Vec<Value>, values: &[String]) {
    params.extend(values.iter().cloned().map(Value::Text));
}
