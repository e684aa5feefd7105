//! The file operation orchestrator.
//!
//! Moves, copies and deletes attachment files according to the per-call
//! [`FileOperationOptions`](reshelf_config::FileOperationOptions). The
//! destination of each file is the destination root, the subfolder template
//! resolved against the item's metadata, and the file name.
//!
//! A move goes through these states, never backwards:
//!
//! ```text
//! Pending -> PathResolved -> Copying -> MetadataCommitting -> Committed -> OriginalDeleted
//!                                                          \-> CommitFailed -> CopyRolledBack
//! ```
//!
//! Collisions at the destination are resolved by numbering (`X 1.pdf`,
//! `X 2.pdf`, ...); existing files are never overwritten.

mod batch;
mod conflict;
mod delete;
pub mod error;
mod file;

pub use self::batch::Organizer;
pub use self::delete::NOISE_FILES;
pub(crate) use self::delete::is_noise;
pub use self::file::{OperationResult, SkipReason};
