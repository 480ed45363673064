//! Structured error output for scripted callers.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Retryability flags
//! - Context for debugging

use crate::error::{ErrorKind, TrendsError};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
/// Format: `SCREAMING_SNAKE_CASE` for easy parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // === Not found (exit code 3) ===
    /// No snapshot has been recorded yet
    NoSnapshots,
    /// Requested day has no snapshot
    DateNotFound,
    /// No snapshot carries the target releases
    TargetsNotFound,
    /// Unknown release name
    ReleaseNotFound,
    /// Input file missing
    InputNotFound,

    // === Range (exit code 4) ===
    /// Resolved window ends before it starts
    InvalidRange,

    // === Store (exit code 2) ===
    /// Database operation failed
    DatabaseError,
    /// Connection pool exhausted or poisoned
    PoolError,

    // === Config (exit code 7) ===
    /// Configuration error
    ConfigError,
    /// Date is not a sentinel or YYYY-MM-DD
    InvalidDate,
    /// YAML parsing error
    YamlError,

    // === Input (exit code 6) ===
    /// Empty snapshot refused
    EmptySnapshot,
    /// Tracker payload could not be read
    PayloadError,
    /// JSON serialization error
    JsonError,

    // === I/O (exit code 8) ===
    /// File I/O error
    IoError,

    // === Internal (exit code 1) ===
    /// Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoSnapshots => "NO_SNAPSHOTS",
            Self::DateNotFound => "DATE_NOT_FOUND",
            Self::TargetsNotFound => "TARGETS_NOT_FOUND",
            Self::ReleaseNotFound => "RELEASE_NOT_FOUND",
            Self::InputNotFound => "INPUT_NOT_FOUND",
            Self::InvalidRange => "INVALID_RANGE",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::PoolError => "POOL_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::InvalidDate => "INVALID_DATE",
            Self::YamlError => "YAML_ERROR",
            Self::EmptySnapshot => "EMPTY_SNAPSHOT",
            Self::PayloadError => "PAYLOAD_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::IoError => "IO_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Map an internal error onto its code.
    #[must_use]
    pub fn from_error(err: &TrendsError) -> Self {
        match err {
            TrendsError::NoSnapshots => Self::NoSnapshots,
            TrendsError::DateNotFound { .. } => Self::DateNotFound,
            TrendsError::TargetsNotFound { .. } => Self::TargetsNotFound,
            TrendsError::ReleaseNotFound { .. } => Self::ReleaseNotFound,
            TrendsError::InputNotFound { .. } => Self::InputNotFound,
            TrendsError::InvalidRange { .. } => Self::InvalidRange,
            TrendsError::Database(_) => Self::DatabaseError,
            TrendsError::Pool(_) => Self::PoolError,
            TrendsError::Config(_) | TrendsError::EmptyTargets => Self::ConfigError,
            TrendsError::InvalidDate { .. } => Self::InvalidDate,
            TrendsError::Yaml(_) => Self::YamlError,
            TrendsError::EmptySnapshot { .. } => Self::EmptySnapshot,
            TrendsError::Payload { .. } => Self::PayloadError,
            TrendsError::Json(_) => Self::JsonError,
            TrendsError::Io(_) => Self::IoError,
            TrendsError::Query(public) => public.code,
            TrendsError::WithContext { source, .. } => source
                .downcast_ref::<TrendsError>()
                .map_or(Self::InternalError, Self::from_error),
            TrendsError::Other(_) => Self::InternalError,
        }
    }

    /// Taxonomy bucket for this code.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NoSnapshots
            | Self::DateNotFound
            | Self::TargetsNotFound
            | Self::ReleaseNotFound
            | Self::InputNotFound => ErrorKind::NotFound,
            Self::InvalidRange => ErrorKind::InvalidRange,
            Self::DatabaseError | Self::PoolError | Self::IoError => ErrorKind::StoreFailure,
            Self::ConfigError | Self::InvalidDate | Self::YamlError => ErrorKind::ConfigError,
            Self::EmptySnapshot | Self::PayloadError | Self::JsonError => ErrorKind::InvalidInput,
            Self::InternalError => ErrorKind::Internal,
        }
    }

    /// Whether this error is potentially retryable.
    ///
    /// Nothing is retried automatically; this only tells the caller that
    /// re-running the whole request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::DatabaseError | Self::PoolError | Self::IoError)
    }

    /// Get the exit code for this error category.
    ///
    /// Exit codes are grouped by error category:
    /// - 1: Internal/unknown errors
    /// - 2: Store errors
    /// - 3: Not found
    /// - 4: Invalid range
    /// - 6: Bad ingestion input
    /// - 7: Config errors
    /// - 8: I/O errors
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::DatabaseError | Self::PoolError => 2,
            Self::NoSnapshots
            | Self::DateNotFound
            | Self::TargetsNotFound
            | Self::ReleaseNotFound
            | Self::InputNotFound => 3,
            Self::InvalidRange => 4,
            Self::EmptySnapshot | Self::PayloadError | Self::JsonError => 6,
            Self::ConfigError | Self::InvalidDate | Self::YamlError => 7,
            Self::IoError => 8,
            Self::InternalError => 1,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `TrendsError`.
    #[must_use]
    pub fn from_error(err: &TrendsError) -> Self {
        let code = ErrorCode::from_error(err);
        let context = Self::extract_context(err);

        Self {
            code,
            message: err.to_string(),
            hint: err.suggestion().map(str::to_string),
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Format as JSON for machine consumption.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_context(err: &TrendsError) -> Option<Value> {
        match err {
            TrendsError::DateNotFound { date } => Some(json!({"date": date.to_string()})),
            TrendsError::TargetsNotFound { targets } => Some(json!({"targets": targets})),
            TrendsError::ReleaseNotFound { name } => Some(json!({"release": name})),
            TrendsError::InvalidRange { release, start, end } => Some(json!({
                "release": release,
                "start": start.to_string(),
                "end": end.to_string(),
            })),
            TrendsError::InvalidDate { value } => Some(json!({"provided": value})),
            TrendsError::EmptySnapshot { date } => Some(json!({"date": date.to_string()})),
            TrendsError::InputNotFound { path } => {
                Some(json!({"path": path.display().to_string()}))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PublicError;
    use chrono::NaiveDate;

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(ErrorCode::DatabaseError.exit_code(), 2);
        assert_eq!(ErrorCode::ReleaseNotFound.exit_code(), 3);
        assert_eq!(ErrorCode::InvalidRange.exit_code(), 4);
        assert_eq!(ErrorCode::ConfigError.exit_code(), 7);
        assert_eq!(ErrorCode::InternalError.exit_code(), 1);
    }

    #[test]
    fn test_structured_from_invalid_range() {
        let err = TrendsError::InvalidRange {
            release: "4.10".to_string(),
            start: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        let structured = StructuredError::from_error(&err);
        assert_eq!(structured.code, ErrorCode::InvalidRange);
        assert!(!structured.retryable);
        let json = structured.to_json();
        assert_eq!(json["error"]["code"], "INVALID_RANGE");
        assert_eq!(json["error"]["context"]["start"], "2024-06-01");
    }

    #[test]
    fn test_structured_from_query_keeps_public_code() {
        let public = PublicError {
            code: ErrorCode::DatabaseError,
            message: "Unable to get list of rollup data".to_string(),
        };
        let structured = StructuredError::from_error(&TrendsError::Query(public));
        assert_eq!(structured.code, ErrorCode::DatabaseError);
        assert!(structured.retryable);
        assert_eq!(structured.message, "Unable to get list of rollup data");
    }

    #[test]
    fn test_to_human_plain() {
        let structured = StructuredError::from_error(&TrendsError::NoSnapshots);
        assert_eq!(
            structured.to_human(false),
            "Error: No snapshots recorded\nHint: Record a snapshot first: bt ingest <file>"
        );
    }
}
