use crate::organize::error::{ErrorKind, Result};
use exn::ResultExt;
use reshelf_storage::Filesystem;
use reshelf_storage::error::ErrorKind as StorageErrorKind;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Numbered alternatives tried before giving up with [`ErrorKind::Conflict`].
pub(crate) const MAX_SUFFIX_ATTEMPTS: u32 = 10_000;
/// Longest destination path, in characters, before the fallback file name is used.
pub(crate) const MAX_PATH_LENGTH: usize = 260;
/// Stem of the file name used when the computed one makes the path too long.
pub(crate) const FALLBACK_FILE_STEM: &str = "paper";

type LockMap = HashMap<PathBuf, Arc<Mutex<()>>>;

/// One async mutex per destination directory.
///
/// Holding a directory's guard serializes "is this name free?" checks with
/// the copy that claims the name, so that two items of the same batch never
/// pick the same numbered alternative. An entry lives only while some task
/// holds or waits for its lock.
#[derive(Default)]
pub(crate) struct DirectoryLocks {
    locks: Arc<StdMutex<LockMap>>,
}
impl DirectoryLocks {
    pub(crate) async fn lock(&self, dir: &Path) -> DirectoryGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(dir.to_path_buf()).or_default().clone()
        };
        DirectoryGuard {
            dir: dir.to_path_buf(),
            locks: Arc::clone(&self.locks),
            guard: lock.lock_owned().await,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Exclusive access to one destination directory.
pub(crate) struct DirectoryGuard {
    dir: PathBuf,
    locks: Arc<StdMutex<LockMap>>,
    guard: OwnedMutexGuard<()>,
}
impl Drop for DirectoryGuard {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map and this guard reference the mutex: nobody is waiting.
        if Arc::strong_count(OwnedMutexGuard::mutex(&self.guard)) == 2 {
            locks.remove(&self.dir);
        }
    }
}

/// `"<stem> <n>.<ext>"`, or `"<stem> <n>"` for files without an extension.
pub(crate) fn numbered(path: &Path, n: u32) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default();
    let mut name = OsString::from(stem);
    name.push(format!(" {n}"));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}

/// `paper.<ext>` in the same directory as `wanted`, keeping the source's
/// lowercase extension.
pub(crate) fn fallback(wanted: &Path, extension: Option<&str>) -> PathBuf {
    match extension {
        Some(ext) => wanted.with_file_name(format!("{FALLBACK_FILE_STEM}.{ext}")),
        None => wanted.with_file_name(FALLBACK_FILE_STEM),
    }
}

fn too_long(path: &Path) -> bool {
    path.to_string_lossy().chars().count() > MAX_PATH_LENGTH
}

/// Copies `source` to `wanted`, or to the first free numbered alternative.
///
/// Candidates are tried in order (`wanted`, then `n = 1, 2, ...`). A name
/// counts as taken if it exists or if the no-overwrite copy reports that it
/// appeared in the meantime. The caller holds the destination directory's
/// lock for the duration.
///
/// # Errors
/// - [`ErrorKind::PathTooLong`] as soon as a candidate exceeds
///   [`MAX_PATH_LENGTH`]; nothing has been written.
/// - [`ErrorKind::Conflict`] after [`MAX_SUFFIX_ATTEMPTS`] taken alternatives.
/// - [`ErrorKind::Storage`] for any other filesystem failure.
pub(crate) async fn copy_to_free_path(fs: &dyn Filesystem, source: &Path, wanted: &Path) -> Result<PathBuf> {
    for n in 0..=MAX_SUFFIX_ATTEMPTS {
        let candidate = match n {
            0 => wanted.to_path_buf(),
            n => numbered(wanted, n),
        };
        if too_long(&candidate) {
            exn::bail!(ErrorKind::PathTooLong(candidate));
        }
        if fs.exists(&candidate).await.or_raise(|| ErrorKind::Storage)? {
            continue;
        }
        match fs.copy_new(source, &candidate).await {
            Ok(_) => return Ok(candidate),
            Err(e) if matches!(&*e, StorageErrorKind::AlreadyExists(_)) => continue,
            Err(e) => return Err(e).or_raise(|| ErrorKind::Storage),
        }
    }
    exn::bail!(ErrorKind::Conflict(wanted.to_path_buf()))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use reshelf_storage::backend::MockFilesystem;
    use rstest::rstest;
    use std::pin::pin;

    #[rstest]
    #[case("/lib/X.pdf", 1, "/lib/X 1.pdf")]
    #[case("/lib/X.pdf", 12, "/lib/X 12.pdf")]
    #[case("/lib/archive.tar.gz", 2, "/lib/archive.tar 2.gz")]
    #[case("/lib/README", 1, "/lib/README 1")]
    fn test_numbered(#[case] path: &str, #[case] n: u32, #[case] expected: &str) {
        assert_eq!(numbered(Path::new(path), n), Path::new(expected));
    }

    #[test]
    fn test_fallback() {
        assert_eq!(fallback(Path::new("/lib/long name.PDF"), Some("pdf")), Path::new("/lib/paper.pdf"));
        assert_eq!(fallback(Path::new("/lib/long name"), None), Path::new("/lib/paper"));
    }

    #[tokio::test]
    async fn test_directory_locks_are_released() {
        let locks = DirectoryLocks::default();
        let a = locks.lock(Path::new("/lib/a")).await;
        let b = locks.lock(Path::new("/lib/b")).await;
        assert_eq!(locks.len(), 2);
        drop(a);
        assert_eq!(locks.len(), 1);
        drop(b);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_directory_lock_kept_while_awaited() {
        let locks = DirectoryLocks::default();
        let dir = Path::new("/lib/a");
        let first = locks.lock(dir).await;
        let mut waiter = pin!(locks.lock(dir));
        assert!(futures::poll!(&mut waiter).is_pending());

        drop(first);
        assert_eq!(locks.len(), 1);
        let second = waiter.await;
        assert_eq!(locks.len(), 1);
        drop(second);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_free_path_is_used_directly() {
        let fs = MockFilesystem::with_files([("/src/a.pdf", "a")]);
        let target = copy_to_free_path(&fs, Path::new("/src/a.pdf"), Path::new("/lib/a.pdf")).await.unwrap();
        assert_eq!(target, Path::new("/lib/a.pdf"));
        assert_eq!(fs.read("/lib/a.pdf").await.unwrap(), b"a");
    }

    #[tokio::test]
    async fn test_collisions_are_suffixed_sequentially() {
        let fs = MockFilesystem::with_files([("/src/a.pdf", "new"), ("/lib/X.pdf", "old"), ("/lib/X 1.pdf", "older")]);
        let target = copy_to_free_path(&fs, Path::new("/src/a.pdf"), Path::new("/lib/X.pdf")).await.unwrap();
        assert_eq!(target, Path::new("/lib/X 2.pdf"));
        assert_eq!(fs.read("/lib/X.pdf").await.unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_too_long_writes_nothing() {
        let fs = MockFilesystem::with_files([("/src/a.pdf", "a")]);
        let wanted = PathBuf::from(format!("/lib/{}.pdf", "x".repeat(MAX_PATH_LENGTH)));
        let err = copy_to_free_path(&fs, Path::new("/src/a.pdf"), &wanted).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::PathTooLong(path) if *path == wanted));
        assert_eq!(fs.files().await, [PathBuf::from("/src/a.pdf")]);
    }

    #[tokio::test]
    async fn test_missing_source() {
        let fs = MockFilesystem::default();
        let err = copy_to_free_path(&fs, Path::new("/src/gone.pdf"), Path::new("/lib/a.pdf")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Storage));
    }
}
