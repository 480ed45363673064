//! Context helpers for attaching a description to foreign errors.

use super::{Result, TrendsError};

/// Extension trait that wraps any error into [`TrendsError::WithContext`].
pub trait ResultExt<T> {
    /// Attach a fixed context message.
    ///
    /// # Errors
    ///
    /// Returns the wrapped error when `self` is `Err`.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Attach a lazily built context message.
    ///
    /// # Errors
    ///
    /// Returns the wrapped error when `self` is `Err`.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|source| TrendsError::WithContext {
            context: context.into(),
            source: Box::new(source),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| TrendsError::WithContext {
            context: f().into(),
            source: Box::new(source),
        })
    }
}

/// Extension trait turning a missing value into a payload error.
pub trait OptionExt<T> {
    /// Fail with [`TrendsError::Payload`] naming the missing field.
    ///
    /// # Errors
    ///
    /// Returns an error when `self` is `None`.
    fn required(self, field: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, field: &str) -> Result<T> {
        self.ok_or_else(|| TrendsError::payload(format!("missing field '{field}'")))
    }
}
