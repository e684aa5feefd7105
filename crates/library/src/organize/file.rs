use crate::error::{ErrorKind as LibraryErrorKind, Error as LibraryError};
use crate::host::{Attachment, ItemId, UnitOfWork, extension_of};
use crate::organize::Organizer;
use crate::organize::conflict::{copy_to_free_path, fallback};
use crate::organize::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use reshelf_config::FileOperationOptions;
use reshelf_storage::normalize_path;
use reshelf_template::{CompiledTemplate, EvalContext, LibraryId, NormalizedItem, resolve_path};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// The outcome for one attempted attachment.
///
/// Attachments filtered out before any work (wrong library, disallowed
/// extension, no file) get no result at all.
#[derive(Debug)]
pub enum OperationResult {
    /// The file is at `path`. For a move, `item` is the new linked-file
    /// attachment; for a copy or delete, the unchanged source attachment.
    Success { path: PathBuf, item: Attachment },
    /// Nothing needed doing.
    Skipped(SkipReason),
    /// This attachment failed; the rest of the batch is unaffected.
    Failed(Error),
}
impl OperationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Path the attachment ended up at, on success.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Success { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Why an attempted attachment was left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The computed destination is the file's current path.
    AlreadyInPlace(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Move,
    Copy,
}

/// Inputs shared by every item of one batch.
pub(crate) struct Plan<'a> {
    pub(crate) destination: &'a Path,
    pub(crate) options: &'a FileOperationOptions,
    /// Compiled subfolder template; `None` places files flat in `destination`.
    pub(crate) template: Option<CompiledTemplate>,
}

/// The source file of `item` if the batch should attempt it.
///
/// - only file attachments with a file name,
/// - only the home library, except copies with `allow_group_libraries`,
/// - moves need a saved item and, with `ignore_linked_only`, a host-managed file,
/// - the extension must be allowed (case-insensitive).
pub(crate) fn source_path<'a>(
    item: &'a Attachment,
    mode: Mode,
    home: LibraryId,
    options: &FileOperationOptions,
) -> Option<&'a Path> {
    if !item.is_file_attachment() {
        return None;
    }
    let home_only = mode == Mode::Move || !options.allow_group_libraries;
    if home_only && item.library_id != home {
        return None;
    }
    if mode == Mode::Move && (item.id.is_none() || (options.ignore_linked_only && !item.link_mode.is_imported())) {
        return None;
    }
    let path = item.path.as_deref()?;
    path.file_name()?;
    options.allows_extension(path.extension().and_then(OsStr::to_str)).then_some(path)
}

impl Organizer {
    /// Runs one attachment through the move/copy pipeline. Never fails: an
    /// error becomes [`OperationResult::Failed`].
    pub(crate) async fn relocate(&self, item: &Attachment, source: &Path, plan: &Plan<'_>, mode: Mode) -> OperationResult {
        match self.relocate_inner(item, source, plan, mode).await {
            Ok(result) => result,
            Err(err) => {
                warn!(source = %source.display(), error = ?err, "attachment not relocated");
                OperationResult::Failed(err)
            },
        }
    }

    #[instrument(level = "debug", skip(self, item, plan), fields(item = ?item.id))]
    async fn relocate_inner(&self, item: &Attachment, source: &Path, plan: &Plan<'_>, mode: Mode) -> Result<OperationResult> {
        let wanted = self.destination_for(item, source, plan).await?;
        let same = match (normalize_path(&wanted), normalize_path(source)) {
            (Ok(a), Ok(b)) => a == b,
            _ => wanted == source,
        };
        if same {
            // Re-linking a file onto itself would just trigger the host's
            // attachment handlers again.
            return Ok(OperationResult::Skipped(SkipReason::AlreadyInPlace(wanted)));
        }

        let dir = wanted.parent().unwrap_or(plan.destination);
        let guard = self.locks.lock(dir).await;
        let target = match copy_to_free_path(&*self.fs, source, &wanted).await {
            Err(err) if matches!(&*err, ErrorKind::PathTooLong(_)) => {
                let fallback = fallback(&wanted, extension_of(source).as_deref());
                warn!(path = %wanted.display(), fallback = %fallback.display(), "destination too long, using fallback file name");
                copy_to_free_path(&*self.fs, source, &fallback).await?
            },
            other => other?,
        };
        drop(guard);
        debug!(target = %target.display(), "file copied");

        match mode {
            Mode::Copy => Ok(OperationResult::Success { path: target, item: item.clone() }),
            Mode::Move => {
                let Some(source_id) = item.id else {
                    exn::bail!(ErrorKind::Host);
                };
                self.commit_move(item, source_id, source, target, plan.options).await
            },
        }
    }

    /// Computes where `item` belongs: destination root, then the resolved
    /// subfolder components, then the (possibly host-renamed) file name.
    async fn destination_for(&self, item: &Attachment, source: &Path, plan: &Plan<'_>) -> Result<PathBuf> {
        let mut file_name = source.file_name().unwrap_or_default().to_os_string();
        if plan.options.rename_file
            && let Some(parent) = item.parent
            && let Some(base) = self.catalog.renamed_base_name(parent, source).await.or_raise(|| ErrorKind::Host)?
        {
            file_name = match extension_of(source) {
                Some(ext) => format!("{base}.{ext}").into(),
                None => base.into(),
            };
        }

        let dir = match &plan.template {
            Some(template) => {
                let normalized = NormalizedItem::from_record(&item.metadata);
                let ctx = EvalContext::new(&plan.options.undefined_placeholder)
                    .with_preferred_collection(plan.options.preferred_collection)
                    .with_custom_wildcards(&plan.options.custom_wildcards);
                resolve_path(plan.destination, template, &normalized, &ctx)
            },
            None => plan.destination.to_path_buf(),
        };
        Ok(dir.join(file_name))
    }

    /// Points the catalog at the new copy and retires the original.
    ///
    /// The linked clone is saved, children, relations and full-text index are
    /// carried over, the source's modification time is applied to the copy
    /// and the original record is erased, all as one unit. Only once that
    /// unit has committed is the source file removed. If it fails, the copy
    /// is removed and the source stays untouched.
    async fn commit_move(
        &self,
        item: &Attachment,
        source_id: ItemId,
        source: &Path,
        target: PathBuf,
        options: &FileOperationOptions,
    ) -> Result<OperationResult> {
        let mut clone = item.linked_clone(target.clone());
        if options.rename_title
            && let Some(name) = target.file_name()
        {
            clone.title = name.to_string_lossy().into_owned();
        }
        if options.add_tag {
            clone.tags.insert(options.tag_text.clone());
        }

        let mut saved = None;
        let work: UnitOfWork<'_> = Box::pin(async {
            let modified = self.fs.stat(source).await.or_raise(|| LibraryErrorKind::Storage)?.modified;
            let id = self.catalog.save(&clone).await?;
            self.catalog.move_child_items(source_id, id).await?;
            self.catalog.copy_relations(source_id, id).await?;
            if let Err(err) = self.catalog.transfer_fulltext(source_id, id).await {
                warn!(from = source_id, to = id, error = ?err, "full-text index not transferred");
            }
            self.fs.set_modified(&target, modified).await.or_raise(|| LibraryErrorKind::Storage)?;
            self.catalog.erase(source_id).await?;
            saved = Some(id);
            Ok::<(), LibraryError>(())
        });
        let committed = self.transactions.run(work).await;

        let id = match (committed, saved) {
            (Ok(()), Some(id)) => id,
            (Ok(()), None) => {
                self.discard_copy(&target).await;
                exn::bail!(ErrorKind::Commit);
            },
            (Err(err), _) => {
                self.discard_copy(&target).await;
                return Err(err).or_raise(|| ErrorKind::Commit);
            },
        };

        if let Err(err) = self.fs.remove_file(source).await {
            // The catalog already points at the new file; the stray original
            // is only clutter.
            warn!(path = %source.display(), error = ?err, "moved, but the original file could not be removed");
        }
        clone.id = Some(id);
        Ok(OperationResult::Success { path: target, item: clone })
    }

    async fn discard_copy(&self, path: &Path) {
        warn!(path = %path.display(), "metadata update failed, removing copy");
        if let Err(err) = self.fs.remove_file(path).await {
            warn!(path = %path.display(), error = ?err, "copy left behind after failed metadata update");
        }
    }
}
