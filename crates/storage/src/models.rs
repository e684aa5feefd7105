//! Storage models.

use std::path::PathBuf;
use time::OffsetDateTime;

/// What a directory entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    File,
    Directory,
    /// Sockets, devices, and (most likely broken) symlinks.
    Other,
}

/// File metadata returned by [`Filesystem`](crate::Filesystem) implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Absolute, normalized path
    pub path: PathBuf,
    /// File size in bytes (zero for directories)
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
    pub kind: FileKind,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: OffsetDateTime, kind: FileKind) -> Self {
        Self { path: path.into(), size, modified, kind }
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// Final path component, lossily converted.
    pub fn file_name(&self) -> String {
        self.path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
    }
}
