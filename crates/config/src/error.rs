//! Config Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Defaults, config file and environment could not be merged into valid preferences.
    #[display("invalid configuration")]
    Load,
    /// A stored preference value has the wrong shape.
    #[display("invalid value for preference '{key}': {reason}")]
    InvalidPreference { key: String, reason: String },
    /// The preference store refused a read or write.
    #[display("preference store unavailable for '{_0}'")]
    Store(#[error(not(source))] String),
    /// No custom wildcard group with this key.
    #[display("unknown custom wildcard group '{_0}'")]
    UnknownGroup(#[error(not(source))] String),
    /// Editing a custom wildcard list at a position that doesn't exist.
    #[display("no command at index {index} in custom wildcard group '{group}'")]
    IndexOutOfRange { group: String, index: usize },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
