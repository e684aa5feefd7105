use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::host::{Attachment, ImportRequest, RegularItem};
use crate::import::error::{ErrorKind, Result as ImportResult};
use crate::organize::{Organizer, is_noise};
use exn::ResultExt;
use reshelf_config::FileOperationOptions;
use reshelf_storage::FileInfo;
use std::path::Path;
use tracing::{debug, info, warn};

/// The most recently modified regular file directly inside `dir`.
///
/// Directories, noise files and disallowed extensions are ignored. Ties go
/// to the entry listed first.
pub(crate) fn newest_file<'a>(entries: &'a [FileInfo], options: &FileOperationOptions) -> Option<&'a FileInfo> {
    entries
        .iter()
        .filter(|entry| entry.is_file() && !is_noise(entry))
        .filter(|entry| options.allows_extension(entry.path.extension().and_then(|ext| ext.to_str())))
        .fold(None, |newest: Option<&FileInfo>, entry| match newest {
            Some(current) if current.modified >= entry.modified => Some(current),
            _ => Some(entry),
        })
}

impl Organizer {
    /// Attaches the most recently modified file in `search_dir` to `parent`.
    ///
    /// The file is imported as a stored attachment, renamed by the host's
    /// rules when both `rename_file` and `rename_title` are set. If the host
    /// stored a copy, the file in `search_dir` is deleted. Returns `None` if
    /// there was no candidate file.
    pub async fn attach_last_modified(
        &self,
        parent: &RegularItem,
        search_dir: &Path,
        options: &FileOperationOptions,
    ) -> LibraryResult<Option<Attachment>> {
        self.attach_last_modified_inner(parent, search_dir, options).await.or_raise(|| LibraryErrorKind::Import)
    }

    async fn attach_last_modified_inner(
        &self,
        parent: &RegularItem,
        search_dir: &Path,
        options: &FileOperationOptions,
    ) -> ImportResult<Option<Attachment>> {
        let entries = self.fs.read_dir(search_dir).await.or_raise(|| ErrorKind::Storage)?;
        let Some(newest) = newest_file(&entries, options) else {
            info!(dir = %search_dir.display(), "no file to attach");
            return Ok(None);
        };
        let file = newest.path.clone();

        let base_name = match options.rename_file && options.rename_title {
            true => self.catalog.renamed_base_name(parent.id, &file).await.or_raise(|| ErrorKind::Host)?,
            false => None,
        };
        let request = ImportRequest { file, base_name, parent: parent.id, library_id: parent.library_id };
        let attachment = self.catalog.import_file(&request).await.or_raise(|| ErrorKind::Host)?;
        debug!(source = %request.file.display(), item = ?attachment.id, "file attached");

        if attachment.path.as_deref() != Some(request.file.as_path())
            && let Err(err) = self.fs.remove_file(&request.file).await
        {
            warn!(path = %request.file.display(), error = ?err, "attached, but the source file could not be removed");
        }
        Ok(Some(attachment))
    }
}
