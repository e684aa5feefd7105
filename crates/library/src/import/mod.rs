//! Bringing files into the host's storage.
//!
//! - [`Organizer::convert_to_stored`](crate::organize::Organizer::convert_to_stored)
//!   turns linked files back into host-managed ones.
//! - [`Organizer::attach_last_modified`](crate::organize::Organizer::attach_last_modified)
//!   attaches the newest file of a directory (typically downloads) to an item.

mod convert;
pub mod error;
mod file;
