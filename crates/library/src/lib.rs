//! Attachment file organization for reference managers.
//!
//! The [`Organizer`] moves, copies and deletes attachment files according to
//! path templates, talking to the host application only through the
//! collaborator traits in [`host`]. [`Actions`] wires it to the user's
//! preferences.

pub mod actions;
pub mod error;
pub mod host;
pub mod import;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod organize;

pub use crate::actions::Actions;
pub use crate::organize::{OperationResult, Organizer, SkipReason};

/// Attachments processed concurrently within one batch.
pub const MAX_PROCESS_CONCURRENCY: usize = 100;
