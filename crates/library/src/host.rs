//! Collaborators supplied by the host application.
//!
//! The orchestrator never reaches into global host state. Everything it needs
//! from the reference manager comes through these traits, injected at
//! construction: the item catalog, a transaction facility for metadata
//! updates, and a directory picker.

use crate::error::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use reshelf_template::{ItemRecord, LibraryId};
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;

/// Host identifier of an item (regular item or attachment).
pub type ItemId = u64;

/// Library id of the user's own library in the host.
pub const USER_LIBRARY_ID: LibraryId = 1;

/// How an attachment's file is stored by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkMode {
    /// Copied into, and managed by, the host's storage directory.
    ImportedFile,
    /// Downloaded from a URL into the host's storage directory.
    ImportedUrl,
    /// A file anywhere on disk the host only points at.
    LinkedFile,
    /// A web link; no file at all.
    LinkedUrl,
    /// An embedded image (annotations, notes).
    Embedded,
}
impl LinkMode {
    /// Returns `true` if attachments in this mode are backed by a file.
    pub fn is_file(self) -> bool {
        !matches!(self, Self::LinkedUrl)
    }

    /// Returns `true` if the host manages the file.
    pub fn is_imported(self) -> bool {
        matches!(self, Self::ImportedFile | Self::ImportedUrl)
    }
}

/// Snapshot of an attachment item, as handed over by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// `None` until the catalog has saved it.
    pub id: Option<ItemId>,
    /// The regular item this attachment belongs to, if any.
    pub parent: Option<ItemId>,
    pub library_id: LibraryId,
    pub link_mode: LinkMode,
    /// Absolute path of the file; `None` if the host can't locate it.
    pub path: Option<PathBuf>,
    pub title: String,
    pub date_added: OffsetDateTime,
    pub tags: BTreeSet<String>,
    /// Bibliographic fields templates are evaluated against, normally those
    /// of the parent item.
    pub metadata: ItemRecord,
}
impl Attachment {
    /// A saved attachment in the user's library, titled after its file.
    pub fn new(id: ItemId, link_mode: LinkMode, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let title = path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
        Self {
            id: Some(id),
            parent: None,
            library_id: USER_LIBRARY_ID,
            link_mode,
            path: Some(path),
            title,
            date_added: OffsetDateTime::now_utc(),
            tags: BTreeSet::new(),
            metadata: ItemRecord::default(),
        }
    }

    pub fn with_parent(mut self, parent: ItemId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn in_library(mut self, library_id: LibraryId) -> Self {
        self.library_id = library_id;
        self
    }

    pub fn with_metadata(mut self, metadata: ItemRecord) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Returns `true` for attachments backed by a file (anything but a link).
    pub fn is_file_attachment(&self) -> bool {
        self.link_mode.is_file()
    }

    /// Returns `true` for files the host only links to.
    pub fn is_linked_file(&self) -> bool {
        self.link_mode == LinkMode::LinkedFile
    }

    /// Unsaved copy pointing at `path` as a linked file. Keeps the parent,
    /// library, title, tags, date added and metadata.
    pub(crate) fn linked_clone(&self, path: PathBuf) -> Self {
        Self {
            id: None,
            link_mode: LinkMode::LinkedFile,
            path: Some(path),
            ..self.clone()
        }
    }
}

/// Lowercase extension of a file path, without the dot.
pub(crate) fn extension_of(path: &Path) -> Option<String> {
    path.extension().and_then(OsStr::to_str).map(str::to_lowercase)
}

/// A regular (non-attachment) item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegularItem {
    pub id: ItemId,
    pub library_id: LibraryId,
}

/// One entry of the host's current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectedItem {
    Attachment(Attachment),
    Regular(RegularItem),
}

/// Request to import a file as a new stored attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub file: PathBuf,
    /// New base name (without extension) for the stored copy; `None` keeps
    /// the file's own name.
    pub base_name: Option<String>,
    pub parent: ItemId,
    pub library_id: LibraryId,
}

/// The host's item catalog.
///
/// Mutating calls made inside a [`UnitOfWork`] are rolled back by the
/// [`TransactionRunner`] when the unit fails.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Id of the user's own library.
    fn home_library(&self) -> LibraryId;

    /// Base name the host's renaming rules give `file` when attached to
    /// `parent`, or `None` if the host doesn't rename this file type.
    async fn renamed_base_name(&self, parent: ItemId, file: &Path) -> Result<Option<String>>;

    /// Attachments of a regular item.
    async fn attachments_of(&self, parent: ItemId) -> Result<Vec<Attachment>>;

    /// Inserts (`id` is `None`) or updates an attachment and returns its id.
    async fn save(&self, attachment: &Attachment) -> Result<ItemId>;

    /// Re-parents the child items (notes, annotations) of `from` onto `to`.
    async fn move_child_items(&self, from: ItemId, to: ItemId) -> Result<()>;

    /// Copies the cross-reference relations of `from` onto `to`.
    async fn copy_relations(&self, from: ItemId, to: ItemId) -> Result<()>;

    /// Moves the full-text index entry of `from` to `to`.
    async fn transfer_fulltext(&self, from: ItemId, to: ItemId) -> Result<()>;

    /// Deletes an item record (never its file).
    async fn erase(&self, id: ItemId) -> Result<()>;

    /// Turns a linked file into a stored one, moving the file into the
    /// host's storage. Commits on its own.
    async fn convert_to_stored(&self, attachment: &Attachment) -> Result<Attachment>;

    /// Imports a file as a new stored attachment. The source file is copied;
    /// deleting it is up to the caller.
    async fn import_file(&self, request: &ImportRequest) -> Result<Attachment>;
}

/// A metadata unit of work, run by a [`TransactionRunner`].
pub type UnitOfWork<'a> = BoxFuture<'a, Result<()>>;

/// Runs units of work as a single all-or-nothing metadata transaction.
#[async_trait]
pub trait TransactionRunner: Send + Sync {
    /// Awaits `work`; if it fails, every catalog change it made is rolled back
    /// and its error returned.
    async fn run(&self, work: UnitOfWork<'_>) -> Result<()>;
}

/// Directory picker dialog.
#[async_trait]
pub trait FilePicker: Send + Sync {
    /// Asks the user for a directory; `None` if the dialog was cancelled.
    async fn pick_directory(&self) -> Result<Option<PathBuf>>;
}

pub type CatalogHandle = Arc<dyn Catalog + Send + Sync>;
pub type TransactionHandle = Arc<dyn TransactionRunner + Send + Sync>;
pub type PickerHandle = Arc<dyn FilePicker + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LinkMode::ImportedFile, true, true)]
    #[case(LinkMode::ImportedUrl, true, true)]
    #[case(LinkMode::LinkedFile, true, false)]
    #[case(LinkMode::LinkedUrl, false, false)]
    #[case(LinkMode::Embedded, true, false)]
    fn test_link_modes(#[case] mode: LinkMode, #[case] file: bool, #[case] imported: bool) {
        assert_eq!(mode.is_file(), file);
        assert_eq!(mode.is_imported(), imported);
    }

    #[test]
    fn test_linked_clone() {
        let original = Attachment::new(7, LinkMode::ImportedFile, "/storage/ABC/paper.pdf")
            .with_parent(3)
            .with_tag("read");
        let clone = original.linked_clone(PathBuf::from("/library/paper.pdf"));
        assert_eq!(clone.id, None);
        assert_eq!(clone.link_mode, LinkMode::LinkedFile);
        assert_eq!(clone.path.as_deref(), Some(Path::new("/library/paper.pdf")));
        assert_eq!(clone.parent, Some(3));
        assert_eq!(clone.title, "paper.pdf");
        assert_eq!(clone.date_added, original.date_added);
        assert!(clone.tags.contains("read"));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("/a/Report.PDF")).as_deref(), Some("pdf"));
        assert_eq!(extension_of(Path::new("/a/archive.tar.gz")).as_deref(), Some("gz"));
        assert_eq!(extension_of(Path::new("/a/README")), None);
    }
}
