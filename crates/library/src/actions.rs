//! Preference-driven actions, as triggered from the host's menus.
//!
//! Each action reads the current [`Preferences`] from the host store, turns
//! them into per-call options with [`Preferences::base_options`], and hands
//! the selected attachments to the [`Organizer`].

use crate::error::{ErrorKind, Result};
use crate::host::{Attachment, PickerHandle, SelectedItem};
use crate::import::error::Result as ImportResult;
use crate::organize::{OperationResult, Organizer};
use exn::ResultExt;
use reshelf_config::{FileBehavior, FileOperationOptions, PreferenceStore, Preferences};
use reshelf_template::CollectionId;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub type PreferencesHandle = Arc<dyn PreferenceStore + Send + Sync>;

pub struct Actions {
    organizer: Organizer,
    preferences: PreferencesHandle,
    picker: PickerHandle,
}

impl Actions {
    pub fn new(organizer: Organizer, preferences: PreferencesHandle, picker: PickerHandle) -> Self {
        Self { organizer, preferences, picker }
    }

    pub fn organizer(&self) -> &Organizer {
        &self.organizer
    }

    fn preferences(&self) -> Result<Preferences> {
        Preferences::read_from(&*self.preferences).or_raise(|| ErrorKind::Preferences)
    }

    /// Attachments in `selection`: selected attachments as they are, plus
    /// every attachment of each selected regular item. Each attachment
    /// appears once, in selection order.
    pub async fn selected_attachments(&self, selection: &[SelectedItem]) -> Result<Vec<Attachment>> {
        let mut seen = BTreeSet::new();
        let mut attachments = Vec::new();
        for selected in selection {
            let found = match selected {
                SelectedItem::Attachment(attachment) => vec![attachment.clone()],
                SelectedItem::Regular(item) => self.organizer.catalog().attachments_of(item.id).await?,
            };
            for attachment in found {
                if attachment.id.is_none_or(|id| seen.insert(id)) {
                    attachments.push(attachment);
                }
            }
        }
        Ok(attachments)
    }

    /// Moves or copies (per `file_behavior`) the selection into the
    /// configured destination directory.
    pub async fn move_selected(
        &self,
        selection: &[SelectedItem],
        preferred_collection: Option<CollectionId>,
    ) -> Result<Vec<OperationResult>> {
        let attachments = self.selected_attachments(selection).await?;
        if attachments.is_empty() {
            return Ok(Vec::new());
        }
        let preferences = self.preferences()?;
        let options = preferences.base_options(preferred_collection);
        let destination = preferences.dst_dir.clone().unwrap_or_default();
        self.apply(&attachments, &destination, &options, preferences.file_behavior).await
    }

    /// Like [`move_selected`](Self::move_selected), into a directory the user
    /// picks, and always flat (no subfolders). A cancelled dialog does nothing.
    pub async fn move_selected_to_picked_directory(
        &self,
        selection: &[SelectedItem],
        preferred_collection: Option<CollectionId>,
    ) -> Result<Vec<OperationResult>> {
        let attachments = self.selected_attachments(selection).await?;
        if attachments.is_empty() {
            return Ok(Vec::new());
        }
        let Some(destination) = self.picker.pick_directory().await? else {
            info!("directory picker cancelled");
            return Ok(Vec::new());
        };
        let preferences = self.preferences()?;
        let options = FileOperationOptions {
            into_subfolder: false,
            ..preferences.base_options(preferred_collection)
        };
        self.apply(&attachments, &destination, &options, preferences.file_behavior).await
    }

    /// Converts the selected linked files back to stored files.
    pub async fn convert_selected_to_stored(&self, selection: &[SelectedItem]) -> Result<Vec<ImportResult<Attachment>>> {
        let attachments = self.selected_attachments(selection).await?;
        if attachments.is_empty() {
            return Ok(Vec::new());
        }
        let options = self.preferences()?.base_options(None);
        Ok(self.organizer.convert_to_stored(&attachments, &options).await)
    }

    /// Attaches the newest file of the configured search directory to the
    /// single selected regular item, then moves or copies it like
    /// [`move_selected`](Self::move_selected).
    ///
    /// Does nothing unless exactly one regular item is selected and a search
    /// directory is configured.
    pub async fn attach_last_modified_file(
        &self,
        selection: &[SelectedItem],
        preferred_collection: Option<CollectionId>,
    ) -> Result<Vec<OperationResult>> {
        let [SelectedItem::Regular(parent)] = selection else {
            return Ok(Vec::new());
        };
        let preferences = self.preferences()?;
        let Some(search_dir) = preferences.attach_search_dir.as_deref() else {
            return Ok(Vec::new());
        };
        let options = preferences.base_options(preferred_collection);
        let Some(attachment) = self.organizer.attach_last_modified(parent, search_dir, &options).await? else {
            return Ok(Vec::new());
        };
        let destination = preferences.dst_dir.clone().unwrap_or_default();
        self.apply(&[attachment], &destination, &options, preferences.file_behavior).await
    }

    async fn apply(
        &self,
        attachments: &[Attachment],
        destination: &Path,
        options: &FileOperationOptions,
        behavior: FileBehavior,
    ) -> Result<Vec<OperationResult>> {
        match behavior {
            FileBehavior::Move => self.organizer.move_items(attachments, destination, options).await,
            FileBehavior::Copy => self.organizer.copy_items(attachments, destination, options).await,
        }
    }
}
