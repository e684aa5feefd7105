//! Path templates for reshelf.
//!
//! A template such as `%creator% - %year%/%title%.pdf` is compiled once into a
//! [`CompiledTemplate`], then [`resolve`]d against any number of
//! [`NormalizedItem`]s into sanitized path components.

pub mod command;
pub mod consts;
pub mod error;
pub mod item;
mod resolve;
mod sanitize;
mod template;

pub use crate::command::{
    Arg, ArgDefault, ArgSpec, ArgType, ColumnData, CustomWildcards, EvalContext, WildcardCommand, WildcardKind,
};
pub use crate::item::{Collection, CollectionId, Creator, CreatorRecord, CreatorRole, ItemRecord, LibraryId, NormalizedItem, PartialDate};
pub use crate::resolve::{join, resolve, resolve_path};
pub use crate::sanitize::{MAX_COMPONENT_BYTES, Platform, sanitize, sanitize_for};
pub use crate::template::{CompiledTemplate, Segment};
