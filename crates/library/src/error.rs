//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Per-attachment failures never surface here: they are reported inside the
//! batch result as [`organize::Error`](crate::organize::error::Error). These
//! kinds cover what aborts a whole call, plus the errors host collaborators
//! report back to us.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The subfolder template does not compile; no file was touched.
    #[display("issue with path generation from template")]
    Template,
    /// A host collaborator (catalog, transaction runner, file picker) failed.
    #[display("host operation failed: {_0}")]
    Host(#[error(not(source))] String),
    /// A filesystem operation failed outside of any per-attachment pipeline.
    Storage,
    /// Preferences could not be read from the host store.
    Preferences,
    /// Importing a new attachment failed.
    Import,
}

impl ErrorKind {
    /// Shorthand for collaborator implementations.
    pub fn host(message: impl Into<String>) -> Self {
        Self::Host(message.into())
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Host(_) | Self::Storage)
    }
}
