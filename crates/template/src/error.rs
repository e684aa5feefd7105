//! Template Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Every variant is a syntax problem in
//! user-authored template or command text; evaluation itself never fails.

use derive_more::{Display, Error};

/// A template error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for template operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Offsets are byte offsets into the text handed to the parser, so a caller
/// can point the user at the offending character.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A `%` opened a command region that was never closed.
    #[display("unterminated command starting at offset {_0}")]
    UnterminatedCommand(#[error(not(source))] usize),
    /// A command region contained no name at all (`%%`, `%  %`).
    #[display("empty command at offset {_0}")]
    EmptyCommand(#[error(not(source))] usize),
    /// The command name is neither a built-in wildcard nor a known custom group.
    #[display("unknown wildcard '{name}' at offset {offset}")]
    UnknownWildcard {
        /// The name as written by the user.
        name: String,
        /// Offset of the first character of the name.
        offset: usize,
    },
    /// The argument list could not be read, or does not fit the wildcard's schema.
    #[display("malformed arguments at offset {offset}: {reason}")]
    MalformedArguments {
        /// Offset where the problem was detected.
        offset: usize,
        /// Human readable explanation.
        reason: String,
    },
    /// Something other than whitespace followed a complete command.
    #[display("unexpected trailing content at offset {_0}")]
    TrailingContent(#[error(not(source))] usize),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Template text is either valid or it isn't.
        false
    }

    /// Byte offset the error refers to.
    pub fn offset(&self) -> usize {
        match self {
            Self::UnterminatedCommand(offset) | Self::EmptyCommand(offset) | Self::TrailingContent(offset) => *offset,
            Self::UnknownWildcard { offset, .. } | Self::MalformedArguments { offset, .. } => *offset,
        }
    }

    /// Shifts the reported offset, used when command text is parsed as a
    /// slice of a larger template.
    pub(crate) fn shifted(self, by: usize) -> Self {
        match self {
            Self::UnterminatedCommand(o) => Self::UnterminatedCommand(o + by),
            Self::EmptyCommand(o) => Self::EmptyCommand(o + by),
            Self::TrailingContent(o) => Self::TrailingContent(o + by),
            Self::UnknownWildcard { name, offset } => Self::UnknownWildcard { name, offset: offset + by },
            Self::MalformedArguments { offset, reason } => Self::MalformedArguments { offset: offset + by, reason },
        }
    }
}
