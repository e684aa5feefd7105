//! In-memory host catalog for testing.

use crate::error::{ErrorKind, Result};
use crate::host::{
    Attachment, Catalog, FilePicker, ImportRequest, ItemId, LinkMode, TransactionRunner, USER_LIBRARY_ID, UnitOfWork,
    extension_of,
};
use async_trait::async_trait;
use exn::ResultExt;
use reshelf_storage::FsHandle;
use reshelf_template::{ItemRecord, LibraryId};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::sync::Mutex;

/// First id handed out to items the catalog creates itself.
const FIRST_GENERATED_ID: ItemId = 1000;

#[derive(Debug, Clone, Default)]
struct State {
    next_id: ItemId,
    attachments: BTreeMap<ItemId, Attachment>,
    /// Metadata of regular items, by id.
    regular: BTreeMap<ItemId, ItemRecord>,
    /// Child items (notes, annotations) of attachments.
    children: BTreeMap<ItemId, Vec<ItemId>>,
    relations: BTreeMap<ItemId, BTreeSet<String>>,
    fulltext: BTreeSet<ItemId>,
}
impl State {
    fn allocate(&mut self) -> ItemId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// In-memory [`Catalog`] and [`TransactionRunner`] for testing.
///
/// Transactions are serialized and snapshot-based: a failing
/// [`UnitOfWork`] restores the whole catalog to its state before the unit
/// started. File-touching calls ([`convert_to_stored`](Catalog::convert_to_stored),
/// [`import_file`](Catalog::import_file)) go through the filesystem given to
/// [`with_filesystem`](Self::with_filesystem), and only record paths without
/// one.
pub struct MemoryCatalog {
    home: LibraryId,
    storage_root: PathBuf,
    fs: Option<FsHandle>,
    renames: BTreeMap<ItemId, String>,
    /// Sources whose transactions fail (at `move_child_items`).
    failing_commits: BTreeSet<ItemId>,
    failing_fulltext: bool,
    state: Mutex<State>,
    transaction: Mutex<()>,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCatalog {
    /// Empty catalog whose home library is [`USER_LIBRARY_ID`] and whose
    /// storage lives in `/storage`.
    pub fn new() -> Self {
        Self {
            home: USER_LIBRARY_ID,
            storage_root: PathBuf::from("/storage"),
            fs: None,
            renames: BTreeMap::new(),
            failing_commits: BTreeSet::new(),
            failing_fulltext: false,
            state: Mutex::new(State { next_id: FIRST_GENERATED_ID, ..State::default() }),
            transaction: Mutex::new(()),
        }
    }

    pub fn with_filesystem(mut self, fs: FsHandle) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = root.into();
        self
    }

    /// Add an attachment. Panics if it has no id: test setup is wrong.
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        let Some(id) = attachment.id else {
            panic!("MemoryCatalog::with_attachment: attachment has no id");
        };
        self.state.get_mut().attachments.insert(id, attachment);
        self
    }

    pub fn with_regular_item(mut self, id: ItemId, metadata: ItemRecord) -> Self {
        self.state.get_mut().regular.insert(id, metadata);
        self
    }

    pub fn with_children(mut self, id: ItemId, children: impl IntoIterator<Item = ItemId>) -> Self {
        self.state.get_mut().children.entry(id).or_default().extend(children);
        self
    }

    pub fn with_relation(mut self, id: ItemId, relation: impl Into<String>) -> Self {
        self.state.get_mut().relations.entry(id).or_default().insert(relation.into());
        self
    }

    pub fn with_fulltext(mut self, id: ItemId) -> Self {
        self.state.get_mut().fulltext.insert(id);
        self
    }

    /// Base name the host's renaming rules produce for files of `parent`.
    pub fn with_renamed_base_name(mut self, parent: ItemId, base_name: impl Into<String>) -> Self {
        self.renames.insert(parent, base_name.into());
        self
    }

    /// Make every transaction moving `source` fail.
    pub fn failing_commit_for(mut self, source: ItemId) -> Self {
        self.failing_commits.insert(source);
        self
    }

    /// Make every full-text index transfer fail.
    pub fn failing_fulltext(mut self) -> Self {
        self.failing_fulltext = true;
        self
    }

    pub async fn attachment(&self, id: ItemId) -> Option<Attachment> {
        self.state.lock().await.attachments.get(&id).cloned()
    }

    /// Every attachment, by id.
    pub async fn attachments(&self) -> Vec<Attachment> {
        self.state.lock().await.attachments.values().cloned().collect()
    }

    pub async fn children_of(&self, id: ItemId) -> Vec<ItemId> {
        self.state.lock().await.children.get(&id).cloned().unwrap_or_default()
    }

    pub async fn relations_of(&self, id: ItemId) -> BTreeSet<String> {
        self.state.lock().await.relations.get(&id).cloned().unwrap_or_default()
    }

    pub async fn has_fulltext(&self, id: ItemId) -> bool {
        self.state.lock().await.fulltext.contains(&id)
    }

    fn stored_path(&self, id: ItemId, file_name: &str) -> PathBuf {
        self.storage_root.join(id.to_string()).join(file_name)
    }

    async fn transfer_file(&self, from: &Path, to: &Path, keep_source: bool) -> Result<()> {
        let Some(fs) = &self.fs else {
            return Ok(());
        };
        fs.copy_new(from, to).await.or_raise(|| ErrorKind::Storage)?;
        if !keep_source {
            fs.remove_file(from).await.or_raise(|| ErrorKind::Storage)?;
        }
        Ok(())
    }
}

fn not_found(id: ItemId) -> ErrorKind {
    ErrorKind::host(format!("no item with id {id}"))
}

#[async_trait]
impl Catalog for MemoryCatalog {
    fn home_library(&self) -> LibraryId {
        self.home
    }

    async fn renamed_base_name(&self, parent: ItemId, _file: &Path) -> Result<Option<String>> {
        Ok(self.renames.get(&parent).cloned())
    }

    async fn attachments_of(&self, parent: ItemId) -> Result<Vec<Attachment>> {
        let state = self.state.lock().await;
        Ok(state.attachments.values().filter(|att| att.parent == Some(parent)).cloned().collect())
    }

    async fn save(&self, attachment: &Attachment) -> Result<ItemId> {
        let mut state = self.state.lock().await;
        let id = match attachment.id {
            Some(id) => id,
            None => state.allocate(),
        };
        state.attachments.insert(id, Attachment { id: Some(id), ..attachment.clone() });
        Ok(id)
    }

    async fn move_child_items(&self, from: ItemId, to: ItemId) -> Result<()> {
        if self.failing_commits.contains(&from) {
            exn::bail!(ErrorKind::host(format!("simulated failure moving children of {from}")));
        }
        let mut state = self.state.lock().await;
        if let Some(children) = state.children.remove(&from) {
            state.children.entry(to).or_default().extend(children);
        }
        Ok(())
    }

    async fn copy_relations(&self, from: ItemId, to: ItemId) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(relations) = state.relations.get(&from).cloned() {
            state.relations.entry(to).or_default().extend(relations);
        }
        Ok(())
    }

    async fn transfer_fulltext(&self, from: ItemId, to: ItemId) -> Result<()> {
        if self.failing_fulltext {
            exn::bail!(ErrorKind::host("simulated full-text failure"));
        }
        let mut state = self.state.lock().await;
        if state.fulltext.remove(&from) {
            state.fulltext.insert(to);
        }
        Ok(())
    }

    async fn erase(&self, id: ItemId) -> Result<()> {
        let mut state = self.state.lock().await;
        state.attachments.remove(&id).ok_or_else(|| not_found(id))?;
        state.children.remove(&id);
        state.relations.remove(&id);
        state.fulltext.remove(&id);
        Ok(())
    }

    async fn convert_to_stored(&self, attachment: &Attachment) -> Result<Attachment> {
        let id = attachment.id.ok_or_else(|| ErrorKind::host("attachment was never saved"))?;
        let source = attachment.path.clone().ok_or_else(|| ErrorKind::host("attachment has no file"))?;
        let file_name = source.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
        let stored_path = self.stored_path(id, &file_name);
        self.transfer_file(&source, &stored_path, false).await?;
        let stored = Attachment {
            link_mode: LinkMode::ImportedFile,
            path: Some(stored_path),
            ..attachment.clone()
        };
        self.state.lock().await.attachments.insert(id, stored.clone());
        Ok(stored)
    }

    async fn import_file(&self, request: &ImportRequest) -> Result<Attachment> {
        let id = self.state.lock().await.allocate();
        let file_name = match (&request.base_name, extension_of(&request.file)) {
            (Some(base), Some(ext)) => format!("{base}.{ext}"),
            (Some(base), None) => base.clone(),
            (None, _) => request.file.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default(),
        };
        let stored_path = self.stored_path(id, &file_name);
        self.transfer_file(&request.file, &stored_path, true).await?;

        let mut state = self.state.lock().await;
        let metadata = state.regular.get(&request.parent).cloned().unwrap_or_default();
        let attachment = Attachment {
            id: Some(id),
            parent: Some(request.parent),
            library_id: request.library_id,
            link_mode: LinkMode::ImportedFile,
            path: Some(stored_path),
            title: file_name,
            date_added: OffsetDateTime::now_utc(),
            tags: BTreeSet::new(),
            metadata,
        };
        state.attachments.insert(id, attachment.clone());
        Ok(attachment)
    }
}

#[async_trait]
impl TransactionRunner for MemoryCatalog {
    async fn run(&self, work: UnitOfWork<'_>) -> Result<()> {
        let _transaction = self.transaction.lock().await;
        let snapshot = self.state.lock().await.clone();
        match work.await {
            Ok(()) => Ok(()),
            Err(err) => {
                *self.state.lock().await = snapshot;
                Err(err)
            },
        }
    }
}

/// [`FilePicker`] answering with a fixed directory (or a cancelled dialog).
#[derive(Debug, Clone, Default)]
pub struct FixedPicker(pub Option<PathBuf>);

#[async_trait]
impl FilePicker for FixedPicker {
    async fn pick_directory(&self) -> Result<Option<PathBuf>> {
        Ok(self.0.clone())
    }
}
