//! Preferences and per-invocation options for reshelf.
//!
//! - [`Preferences`]: persisted settings, loaded with figment or read from
//!   the host's [`PreferenceStore`].
//! - [`FileOperationOptions`]: the options one move/copy/delete batch runs
//!   with, built fresh per call.
//! - [`WildcardListEditor`]: editing of custom wildcard groups.

pub mod error;
mod options;
mod preferences;
mod store;
mod wildcards;

pub use crate::options::{DEFAULT_TAG, FileOperationOptions, OptionOverrides};
pub use crate::preferences::{ENV_PREFIX, FileBehavior, Preferences};
pub use crate::store::{MemoryPreferenceStore, PreferenceStore, PreferenceStoreExt};
pub use crate::wildcards::{CUSTOM_WILDCARDS_KEY, WildcardListEditor};
