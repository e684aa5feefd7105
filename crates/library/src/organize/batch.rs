use crate::MAX_PROCESS_CONCURRENCY;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::host::{Attachment, CatalogHandle, TransactionHandle};
use crate::organize::conflict::DirectoryLocks;
use crate::organize::file::{Mode, OperationResult, Plan, source_path};
use exn::ResultExt;
use futures::{StreamExt, stream};
use reshelf_config::FileOperationOptions;
use reshelf_storage::FsHandle;
use reshelf_template::CompiledTemplate;
use std::path::Path;
use tracing::info;

/// Moves, copies and deletes batches of attachments.
///
/// Every item of a batch runs through its own pipeline, concurrently with
/// the others (up to [`MAX_PROCESS_CONCURRENCY`] at a time). One item
/// failing never cancels or rolls back its siblings. Results come back in
/// input order, one per attempted item.
pub struct Organizer {
    pub(crate) fs: FsHandle,
    pub(crate) catalog: CatalogHandle,
    pub(crate) transactions: TransactionHandle,
    pub(crate) locks: DirectoryLocks,
}

impl Organizer {
    pub fn new(fs: FsHandle, catalog: CatalogHandle, transactions: TransactionHandle) -> Self {
        Self { fs, catalog, transactions, locks: DirectoryLocks::default() }
    }

    pub fn catalog(&self) -> &CatalogHandle {
        &self.catalog
    }

    /// Moves attachment files under `destination` and relinks them.
    ///
    /// Each file is copied (never overwriting), the catalog is updated in a
    /// single transaction, and only then is the original deleted. A failed
    /// transaction removes the copy again.
    ///
    /// Only attachments in the home library are moved, regardless of
    /// `allow_group_libraries`.
    ///
    /// # Errors
    /// Returns [`Template`](LibraryErrorKind::Template) when the subfolder
    /// template doesn't compile, before any file is touched. Per-item failures
    /// are reported as [`OperationResult::Failed`].
    pub async fn move_items(
        &self,
        items: &[Attachment],
        destination: &Path,
        options: &FileOperationOptions,
    ) -> LibraryResult<Vec<OperationResult>> {
        self.relocate_all(items, destination, options, Mode::Move).await
    }

    /// Copies attachment files under `destination`. Sources and the catalog
    /// are left alone.
    ///
    /// # Errors
    /// Same as [`move_items`](Self::move_items).
    pub async fn copy_items(
        &self,
        items: &[Attachment],
        destination: &Path,
        options: &FileOperationOptions,
    ) -> LibraryResult<Vec<OperationResult>> {
        self.relocate_all(items, destination, options, Mode::Copy).await
    }

    async fn relocate_all(
        &self,
        items: &[Attachment],
        destination: &Path,
        options: &FileOperationOptions,
        mode: Mode,
    ) -> LibraryResult<Vec<OperationResult>> {
        if destination.as_os_str().is_empty() {
            return Ok(Vec::new());
        }
        let template = match options.into_subfolder {
            true => Some(
                CompiledTemplate::parse_with(&options.subdir_template, &options.custom_wildcards)
                    .or_raise(|| LibraryErrorKind::Template)?,
            ),
            false => None,
        };
        let plan = Plan { destination, options, template };
        let home = self.catalog.home_library();

        let pending: Vec<_> = items
            .iter()
            .filter_map(|item| source_path(item, mode, home, options).map(|source| (item, source)))
            .map(|(item, source)| self.relocate(item, source, &plan, mode))
            .collect();
        info!(?mode, destination = %destination.display(), attempted = pending.len(), ignored = items.len() - pending.len(), "Processing batch");
        Ok(stream::iter(pending).buffered(MAX_PROCESS_CONCURRENCY).collect().await)
    }
}
