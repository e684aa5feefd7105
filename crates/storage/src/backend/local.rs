//! Local filesystem backend.
//!
//! Accesses the host's disk via `tokio::fs` for async I/O.

use crate::error::{ErrorKind, Result};
use crate::models::{FileInfo, FileKind};
use crate::path::normalize as normalize_path;
use crate::Filesystem;
use async_trait::async_trait;
use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;
use time::OffsetDateTime;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{instrument, warn};

/// The machine's own filesystem.
///
/// # Examples
///
/// ```no_run
/// use reshelf_storage::backend::LocalFilesystem;
/// use reshelf_storage::{Filesystem, FsHandle};
/// use std::path::Path;
/// use std::sync::Arc;
///
/// # async fn example() -> reshelf_storage::error::Result<()> {
/// let fs: FsHandle = Arc::new(LocalFilesystem::new());
/// fs.copy_new(Path::new("/downloads/paper.pdf"), Path::new("/library/Doe/paper.pdf")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;
impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }

    /// Re-use same data collection from file metadata for both read_dir and stat functions
    fn metadata(path: &Path, metadata: &Metadata) -> Result<FileInfo> {
        let modified: OffsetDateTime = metadata.modified().map_err(ErrorKind::Io)?.into();
        let kind = match (metadata.is_file(), metadata.is_dir()) {
            (true, _) => FileKind::File,
            (_, true) => FileKind::Directory,
            _ => FileKind::Other,
        };
        let size = if kind == FileKind::File { metadata.len() } else { 0 };
        Ok(FileInfo::new(path, size, modified, kind))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists(path.to_path_buf()),
            std::io::ErrorKind::DirectoryNotEmpty => ErrorKind::DirectoryNotEmpty(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }
}

#[async_trait]
impl Filesystem for LocalFilesystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = normalize_path(path)?;
        Ok(fs::try_exists(&path).await.map_err(ErrorKind::Io)?)
    }

    #[instrument(skip(self))]
    async fn copy_new(&self, from: &Path, to: &Path) -> Result<u64> {
        let from = normalize_path(from)?;
        let to = normalize_path(to)?;
        let mut source = fs::File::open(&from).await.map_err(|e| Self::map_io_error(e, &from))?;
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, parent))?;
        }
        // `create_new` is the existence check: atomic, unlike try_exists + create.
        let mut target = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&to)
            .await
            .map_err(|e| Self::map_io_error(e, &to))?;
        let copied = match tokio::io::copy(&mut source, &mut target).await {
            Ok(copied) => target.flush().await.map(|()| copied),
            Err(e) => Err(e),
        };
        match copied {
            Ok(copied) => Ok(copied),
            Err(e) => {
                drop(target);
                if let Err(cleanup) = fs::remove_file(&to).await {
                    warn!(path = %to.display(), error = %cleanup, "could not remove partial copy");
                }
                exn::bail!(Self::map_io_error(e, &to))
            },
        }
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        let path = normalize_path(path)?;
        Ok(fs::remove_file(&path).await.map_err(|e| Self::map_io_error(e, &path))?)
    }

    async fn remove_dir(&self, path: &Path) -> Result<()> {
        let path = normalize_path(path)?;
        Ok(fs::remove_dir(&path).await.map_err(|e| Self::map_io_error(e, &path))?)
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<FileInfo>> {
        let path = normalize_path(path)?;
        let mut entries = fs::read_dir(&path).await.map_err(|e| Self::map_io_error(e, &path))?;
        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| Self::map_io_error(e, &path))? {
            let child = entry.path();
            match entry.metadata().await {
                Ok(metadata) => children.push(Self::metadata(&child, &metadata)?),
                // Vanished between listing and stat.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => exn::bail!(Self::map_io_error(e, &child)),
            }
        }
        Ok(children)
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let path = normalize_path(path)?;
        let metadata = fs::metadata(&path).await.map_err(|e| Self::map_io_error(e, &path))?;
        Self::metadata(&path, &metadata)
    }

    async fn set_modified(&self, path: &Path, modified: OffsetDateTime) -> Result<()> {
        let path = normalize_path(path)?;
        let file = OpenOptions::new().write(true).open(&path).await.map_err(|e| Self::map_io_error(e, &path))?;
        let file = file.into_std().await;
        let result = tokio::task::spawn_blocking(move || file.set_modified(SystemTime::from(modified)))
            .await
            .map_err(|e| ErrorKind::Io(e.into()))?;
        result.map_err(|e| Self::map_io_error(e, &path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use time::macros::datetime;

    async fn write(path: &Path, data: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(path, data).await.unwrap();
    }

    #[tokio::test]
    async fn test_copy_new_creates_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let from = temp_dir.path().join("in/paper.pdf");
        let to = temp_dir.path().join("out/a/b/paper.pdf");
        write(&from, b"%PDF-1.7").await;
        let copied = LocalFilesystem.copy_new(&from, &to).await.unwrap();
        assert_eq!(copied, 8);
        assert_eq!(fs::read(&to).await.unwrap(), b"%PDF-1.7");
        // Source untouched
        assert!(LocalFilesystem.exists(&from).await.unwrap());
    }

    #[tokio::test]
    async fn test_copy_new_never_overwrites() {
        let temp_dir = tempfile::tempdir().unwrap();
        let from = temp_dir.path().join("new.pdf");
        let to = temp_dir.path().join("existing.pdf");
        write(&from, b"new").await;
        write(&to, b"old").await;
        let err = LocalFilesystem.copy_new(&from, &to).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::AlreadyExists(_)));
        assert_eq!(fs::read(&to).await.unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_copy_new_missing_source() {
        let temp_dir = tempfile::tempdir().unwrap();
        let to = temp_dir.path().join("out/copy.pdf");
        let err = LocalFilesystem.copy_new(&temp_dir.path().join("missing.pdf"), &to).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        assert!(!LocalFilesystem.exists(&to).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("file.txt");
        write(&path, b"data").await;
        LocalFilesystem.remove_file(&path).await.unwrap();
        assert!(!LocalFilesystem.exists(&path).await.unwrap());
        // Deleting nonexistent file returns error
        let err = LocalFilesystem.remove_file(&path).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_dir_only_when_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("dir");
        write(&dir.join("file.txt"), b"data").await;
        let err = LocalFilesystem.remove_dir(&dir).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::DirectoryNotEmpty(_)), "{err:?}");
        LocalFilesystem.remove_file(&dir.join("file.txt")).await.unwrap();
        LocalFilesystem.remove_dir(&dir).await.unwrap();
        assert!(!LocalFilesystem.exists(&dir).await.unwrap());
    }

    #[tokio::test]
    async fn test_read_dir_and_stat() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(&temp_dir.path().join("a.pdf"), b"12345").await;
        write(&temp_dir.path().join("sub/b.pdf"), b"").await;
        let mut children = LocalFilesystem.read_dir(temp_dir.path()).await.unwrap();
        children.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(children.len(), 2);
        assert!(children[0].is_file());
        assert_eq!(children[0].size, 5);
        assert_eq!(children[0].file_name(), "a.pdf");
        assert!(children[1].is_dir());
        let info = LocalFilesystem.stat(&temp_dir.path().join("a.pdf")).await.unwrap();
        assert_eq!(info, children[0]);
    }

    #[tokio::test]
    async fn test_set_modified() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("file.txt");
        write(&path, b"data").await;
        let when = datetime!(2020-05-17 12:00 UTC);
        LocalFilesystem.set_modified(&path, when).await.unwrap();
        assert_eq!(LocalFilesystem.stat(&path).await.unwrap().modified, when);
    }

    #[tokio::test]
    async fn test_set_modified_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("gone.txt");
        let err = LocalFilesystem.set_modified(&path, datetime!(2020-05-17 12:00 UTC)).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(missing) if *missing == path));
    }

    #[tokio::test]
    async fn test_relative_paths_rejected() {
        let relative = PathBuf::from("relative/file.txt");
        assert!(LocalFilesystem.exists(&relative).await.is_err());
        assert!(LocalFilesystem.remove_file(&relative).await.is_err());
        assert!(LocalFilesystem.copy_new(&relative, &relative).await.is_err());
    }
}
