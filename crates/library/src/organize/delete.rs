use crate::MAX_PROCESS_CONCURRENCY;
use crate::host::Attachment;
use crate::organize::Organizer;
use crate::organize::error::{ErrorKind, Result};
use crate::organize::file::OperationResult;
use exn::ResultExt;
use futures::{StreamExt, stream};
use reshelf_config::FileOperationOptions;
use reshelf_storage::{FileInfo, normalize_path};
use reshelf_template::LibraryId;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Operating system metadata files that don't keep a directory alive.
pub const NOISE_FILES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

pub(crate) fn is_noise(entry: &FileInfo) -> bool {
    entry.is_file() && NOISE_FILES.contains(&entry.file_name().as_str())
}

/// The file of `item` if it may be deleted: a linked file in the home
/// library, strictly inside `home_root`.
fn deletable(item: &Attachment, home: LibraryId, home_root: &Path) -> Option<PathBuf> {
    if !item.is_file_attachment() || item.library_id != home || !item.is_linked_file() {
        return None;
    }
    let path = normalize_path(item.path.as_deref()?).ok()?;
    (path.starts_with(home_root) && path != home_root).then_some(path)
}

impl Organizer {
    /// Deletes linked attachment files that live under `home_root`.
    ///
    /// Host-managed files, other libraries and files outside `home_root` are
    /// ignored. With `prune_empty_dirs`, every directory between the deleted
    /// file and `home_root` that holds nothing but [`NOISE_FILES`] is removed
    /// too, bottom-up. `home_root` itself is never removed. Catalog records
    /// are left for the host to deal with.
    pub async fn delete_items(
        &self,
        items: &[Attachment],
        home_root: &Path,
        options: &FileOperationOptions,
    ) -> Vec<OperationResult> {
        if home_root.as_os_str().is_empty() {
            return Vec::new();
        }
        let home_root = match normalize_path(home_root) {
            Ok(root) => root,
            Err(err) => {
                warn!(root = %home_root.display(), error = ?err, "invalid home directory, nothing deleted");
                return Vec::new();
            },
        };
        let home = self.catalog.home_library();
        let pending: Vec<_> = items
            .iter()
            .filter_map(|item| deletable(item, home, &home_root).map(|path| (item, path)))
            .map(|(item, path)| self.delete_one(item, path, &home_root, options))
            .collect();
        stream::iter(pending).buffered(MAX_PROCESS_CONCURRENCY).collect().await
    }

    async fn delete_one(
        &self,
        item: &Attachment,
        path: PathBuf,
        home_root: &Path,
        options: &FileOperationOptions,
    ) -> OperationResult {
        let removed = {
            let _guard = self.locks.lock(path.parent().unwrap_or(home_root)).await;
            self.fs.remove_file(&path).await.or_raise(|| ErrorKind::Storage)
        };
        if let Err(err) = removed {
            warn!(path = %path.display(), error = ?err, "attachment file not deleted");
            return OperationResult::Failed(err);
        }
        if options.prune_empty_dirs {
            self.prune(&path, home_root).await;
        }
        OperationResult::Success { path, item: item.clone() }
    }

    /// Walks up from the deleted file's directory, removing directories left
    /// with only noise files, until one is in use or `home_root` is reached.
    async fn prune(&self, file: &Path, home_root: &Path) {
        let mut dir = file.parent();
        while let Some(current) = dir
            && current != home_root
            && current.starts_with(home_root)
        {
            let _guard = self.locks.lock(current).await;
            match self.prune_dir(current).await {
                Ok(true) => dir = current.parent(),
                Ok(false) => break,
                Err(err) => {
                    debug!(path = %current.display(), error = ?err, "stopped pruning");
                    break;
                },
            }
        }
    }

    /// Removes `dir` if it only holds noise files; `false` if it is in use.
    async fn prune_dir(&self, dir: &Path) -> Result<bool> {
        let entries = self.fs.read_dir(dir).await.or_raise(|| ErrorKind::Storage)?;
        if !entries.iter().all(is_noise) {
            return Ok(false);
        }
        for entry in &entries {
            self.fs.remove_file(&entry.path).await.or_raise(|| ErrorKind::Storage)?;
        }
        self.fs.remove_dir(dir).await.or_raise(|| ErrorKind::Storage)?;
        debug!(path = %dir.display(), "removed empty directory");
        Ok(true)
    }
}
