//! Error types and handling for `bug_trends`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration through the `Other` variant
//! - Every variant maps onto one [`ErrorKind`] (not found, invalid range,
//!   store failure, configuration)
//! - Facade operations convert into a [`PublicError`] whose message is safe to
//!   hand to a remote caller; the CLI renders a [`StructuredError`]

mod context;
mod public;
mod structured;

pub use context::{OptionExt, ResultExt};
pub use public::PublicError;
pub use structured::{ErrorCode, StructuredError};

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `bug_trends` operations.
#[derive(Error, Debug)]
pub enum TrendsError {
    // === Not found ===
    /// The store holds no snapshot at all.
    #[error("No snapshots recorded")]
    NoSnapshots,

    /// The requested day has no snapshot.
    #[error("No snapshot for date {date}")]
    DateNotFound { date: NaiveDate },

    /// No snapshot ever carried one of the given target releases.
    #[error("No snapshot carries any of the target releases {targets:?}")]
    TargetsNotFound { targets: Vec<String> },

    /// Unknown release name.
    #[error("Release not found: {name}")]
    ReleaseNotFound { name: String },

    // === Invalid range ===
    /// Resolved release window ends before it starts.
    #[error("Invalid dates for release '{release}': end {end} is before start {start}")]
    InvalidRange {
        release: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    // === Store failures ===
    /// `SQLite` database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Read connection pool could not hand out a connection.
    #[error("Connection pool error: {0}")]
    Pool(String),

    // === Configuration ===
    /// Configuration file or value error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A target-release lookup was asked for an empty target list.
    #[error("Target release list cannot be empty")]
    EmptyTargets,

    /// A date value is neither a sentinel nor `YYYY-MM-DD`.
    #[error("Invalid date '{value}': expected YYYY-MM-DD, '_latest' or '_earliest'")]
    InvalidDate { value: String },

    // === Ingestion ===
    /// A snapshot payload with zero issues was offered for a day.
    #[error("Refusing to record an empty snapshot for {date}")]
    EmptySnapshot { date: NaiveDate },

    /// A tracker payload could not be interpreted.
    #[error("Malformed tracker payload: {reason}")]
    Payload { reason: String },

    /// Input file does not exist.
    #[error("Input not found at '{path}'")]
    InputNotFound { path: PathBuf },

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Facade ===
    /// A facade operation failed; the message is already caller-safe.
    #[error("{0}")]
    Query(#[from] PublicError),

    // === Wrapped errors ===
    /// Error with additional context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse error taxonomy used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No snapshot, unknown release, absent date.
    NotFound,
    /// Resolved end before start.
    InvalidRange,
    /// Transient I/O or query failure in the store.
    StoreFailure,
    /// Malformed configuration or filter.
    ConfigError,
    /// Bad input handed to ingestion.
    InvalidInput,
    /// Anything else.
    Internal,
}

impl TrendsError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoSnapshots
            | Self::DateNotFound { .. }
            | Self::TargetsNotFound { .. }
            | Self::ReleaseNotFound { .. }
            | Self::InputNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidRange { .. } => ErrorKind::InvalidRange,
            Self::Database(_) | Self::Pool(_) | Self::Io(_) => ErrorKind::StoreFailure,
            Self::Config(_) | Self::EmptyTargets | Self::InvalidDate { .. } | Self::Yaml(_) => {
                ErrorKind::ConfigError
            }
            Self::EmptySnapshot { .. } | Self::Payload { .. } | Self::Json(_) => {
                ErrorKind::InvalidInput
            }
            Self::Query(public) => public.kind(),
            Self::WithContext { source, .. } => source
                .downcast_ref::<Self>()
                .map_or(ErrorKind::Internal, Self::kind),
            Self::Other(_) => ErrorKind::Internal,
        }
    }

    /// True when the error only says that something is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Can the user fix this without code changes?
    #[must_use]
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotFound
                | ErrorKind::InvalidRange
                | ErrorKind::ConfigError
                | ErrorKind::InvalidInput
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NoSnapshots => Some("Record a snapshot first: bt ingest <file>"),
            Self::DateNotFound { .. } => Some("Run: bt dates to list recorded snapshot days"),
            Self::ReleaseNotFound { .. } => Some("Run: bt releases to list configured releases"),
            Self::InvalidRange { .. } => {
                Some("Update the release start milestone or remove the release from the config")
            }
            Self::InvalidDate { .. } => Some("Use YYYY-MM-DD, _latest or _earliest"),
            Self::EmptySnapshot { .. } => Some("Check the tracker search returns issues"),
            _ => None,
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a payload error.
    #[must_use]
    pub fn payload(reason: impl Into<String>) -> Self {
        Self::Payload {
            reason: reason.into(),
        }
    }
}

/// Result type using `TrendsError`.
pub type Result<T> = std::result::Result<T, TrendsError>;
