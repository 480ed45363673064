//! Caller-safe errors for the query facade.
//!
//! A `PublicError` never carries SQL text or driver messages. The full
//! underlying error is logged when the public error is built: store and
//! internal failures at error level, expected outcomes such as an unknown
//! release or a bad date at warn.

use super::{ErrorCode, ErrorKind, TrendsError};
use serde::Serialize;
use std::fmt;
use tracing::{Level, error, warn};

/// Error returned by facade operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicError {
    /// Machine-readable category.
    pub code: ErrorCode,
    /// Message that is safe to show to any caller.
    pub message: String,
}

impl PublicError {
    /// Build a public error from an internal one, logging the internal detail.
    ///
    /// `fallback` is used whenever the internal error is not safe to expose.
    #[must_use]
    pub fn from_internal(err: &TrendsError, fallback: impl Into<String>) -> Self {
        let fallback = fallback.into();
        let kind = err.kind();
        if log_level(kind) == Level::ERROR {
            error!(error = %err, ?kind, "{fallback}");
        } else {
            warn!(error = %err, ?kind, "{fallback}");
        }
        Self {
            code: ErrorCode::from_error(err),
            message: safe_message(err).unwrap_or(fallback),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }
}

/// Level at which a facade failure of this kind is logged.
const fn log_level(kind: ErrorKind) -> Level {
    match kind {
        ErrorKind::StoreFailure | ErrorKind::Internal => Level::ERROR,
        ErrorKind::NotFound
        | ErrorKind::InvalidRange
        | ErrorKind::ConfigError
        | ErrorKind::InvalidInput => Level::WARN,
    }
}

fn safe_message(err: &TrendsError) -> Option<String> {
    match err {
        TrendsError::NoSnapshots
        | TrendsError::DateNotFound { .. }
        | TrendsError::TargetsNotFound { .. }
        | TrendsError::ReleaseNotFound { .. }
        | TrendsError::InvalidDate { .. }
        | TrendsError::EmptyTargets
        | TrendsError::EmptySnapshot { .. } => Some(err.to_string()),
        TrendsError::InvalidRange { release, .. } => {
            Some(format!("Invalid dates for release '{release}'"))
        }
        TrendsError::WithContext { source, .. } => source
            .downcast_ref::<TrendsError>()
            .and_then(safe_message),
        _ => None,
    }
}

impl fmt::Display for PublicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for PublicError {}
