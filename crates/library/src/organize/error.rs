//! Error types for the [`organize`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An organize error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for organize operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies why a single attachment could not be moved, copied or deleted.
///
/// ### Operational Errors
/// - [`ErrorKind::PathTooLong`]
/// - [`ErrorKind::Conflict`]
/// - [`ErrorKind::Commit`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Storage`]
/// - [`ErrorKind::Host`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A filesystem operation (copy, remove, stat) failed.
    Storage,
    /// A host catalog call outside the metadata unit of work failed.
    Host,
    /// The metadata unit of work failed. Its changes were rolled back and the
    /// new copy removed; the source is untouched.
    #[display("metadata update failed and was rolled back")]
    Commit,
    /// The destination is too long even with the fallback file name.
    #[display("destination path too long: {}", _0.display())]
    PathTooLong(#[error(not(source))] PathBuf),
    /// Every numbered alternative of the destination is already taken.
    #[display("no free file name for {}", _0.display())]
    Conflict(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage | Self::Host | Self::Commit)
    }
}
