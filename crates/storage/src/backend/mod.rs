//! Filesystem trait and implementations.
//!
//! This module defines the [`Filesystem`] trait, the narrow set of physical
//! operations the attachment orchestrator needs, so that file-level logic can
//! run against the real disk ([`LocalFilesystem`]) or entirely in memory
//! (`MockFilesystem`, behind the `mock` feature).

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalFilesystem;
#[cfg(feature = "mock")]
pub use self::mock::MockFilesystem;
use crate::error::Result;
use crate::models::FileInfo;
use async_trait::async_trait;
use std::path::Path;
use time::OffsetDateTime;

/// Physical file operations on absolute host paths.
///
/// All operations are asynchronous so that a batch of attachments can be
/// processed concurrently without blocking on I/O.
///
/// # Path Handling
/// Every path must be absolute. Implementations normalize paths with
/// [`normalize_path`](crate::normalize_path) and reject anything it rejects.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use reshelf_storage::{Filesystem, error::Result};
///
/// async fn duplicate(fs: &dyn Filesystem, from: &Path, to: &Path) -> Result<u64> {
///     if fs.exists(to).await? {
///         return Ok(0);
///     }
///     fs.copy_new(from, to).await
/// }
/// ```
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Check if a file or directory exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Copy a file to a path that must not exist yet, creating missing parent
    /// directories. Returns the number of bytes copied.
    ///
    /// Returns [`AlreadyExists`](crate::error::ErrorKind::AlreadyExists) rather
    /// than overwriting, and [`NotFound`](crate::error::ErrorKind::NotFound) if
    /// the source is missing. A failed copy leaves no partial destination
    /// behind.
    async fn copy_new(&self, from: &Path, to: &Path) -> Result<u64>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn remove_file(&self, path: &Path) -> Result<()>;

    /// Delete an empty directory.
    ///
    /// Returns [`DirectoryNotEmpty`](crate::error::ErrorKind::DirectoryNotEmpty)
    /// if it still has entries.
    async fn remove_dir(&self, path: &Path) -> Result<()>;

    /// Direct children of a directory, in no particular order.
    async fn read_dir(&self, path: &Path) -> Result<Vec<FileInfo>>;

    /// Get metadata for a file or directory.
    async fn stat(&self, path: &Path) -> Result<FileInfo>;

    /// Overwrite a file's modification time.
    async fn set_modified(&self, path: &Path, modified: OffsetDateTime) -> Result<()>;
}
