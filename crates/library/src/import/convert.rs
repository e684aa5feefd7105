use crate::MAX_PROCESS_CONCURRENCY;
use crate::host::Attachment;
use crate::import::error::{ErrorKind, Result};
use crate::organize::Organizer;
use exn::ResultExt;
use futures::{StreamExt, stream};
use reshelf_config::FileOperationOptions;
use tracing::{debug, warn};

impl Organizer {
    /// Turns linked-file attachments back into host-managed stored files.
    ///
    /// Attachments that aren't linked files get no result. When `add_tag` is
    /// set, the tag a move added (`tag_text`) is removed from the stored
    /// attachment again. Results are in input order.
    pub async fn convert_to_stored(&self, items: &[Attachment], options: &FileOperationOptions) -> Vec<Result<Attachment>> {
        let pending: Vec<_> = items
            .iter()
            .filter(|item| item.is_linked_file())
            .map(|item| self.convert_one(item, options))
            .collect();
        stream::iter(pending).buffered(MAX_PROCESS_CONCURRENCY).collect().await
    }

    async fn convert_one(&self, item: &Attachment, options: &FileOperationOptions) -> Result<Attachment> {
        let converted = self.catalog.convert_to_stored(item).await.or_raise(|| ErrorKind::Host);
        let mut stored = match converted {
            Ok(stored) => stored,
            Err(err) => {
                warn!(item = ?item.id, error = ?err, "linked file not converted");
                return Err(err);
            },
        };
        debug!(item = ?stored.id, path = ?stored.path, "converted to stored file");
        if options.add_tag && stored.tags.remove(&options.tag_text) {
            self.catalog.save(&stored).await.or_raise(|| ErrorKind::Host)?;
        }
        Ok(stored)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::host::LinkMode;
    use crate::mock::MemoryCatalog;
    use reshelf_storage::backend::MockFilesystem;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_convert_linked_files() {
        let fs = Arc::new(MockFilesystem::with_files([("/library/a.pdf", "a"), ("/storage/2/b.pdf", "b")]));
        let linked = Attachment::new(1, LinkMode::LinkedFile, "/library/a.pdf").with_tag("reshelf").with_tag("read");
        let stored = Attachment::new(2, LinkMode::ImportedFile, "/storage/2/b.pdf");
        let catalog = Arc::new(
            MemoryCatalog::new()
                .with_filesystem(fs.clone())
                .with_attachment(linked.clone())
                .with_attachment(stored.clone()),
        );
        let organizer = Organizer::new(fs.clone(), catalog.clone(), catalog.clone());

        let results = organizer.convert_to_stored(&[linked, stored], &FileOperationOptions::default()).await;

        assert_eq!(results.len(), 1);
        let converted = results[0].as_ref().unwrap();
        assert_eq!(converted.link_mode, LinkMode::ImportedFile);
        assert_eq!(converted.path.as_deref(), Some(Path::new("/storage/1/a.pdf")));
        assert_eq!(converted.tags.iter().collect::<Vec<_>>(), ["read"]);
        assert_eq!(catalog.attachment(1).await.as_ref(), Some(converted));
        assert_eq!(fs.files().await, [PathBuf::from("/storage/1/a.pdf"), PathBuf::from("/storage/2/b.pdf")]);
    }

    #[tokio::test]
    async fn test_convert_failure_is_per_item() {
        let fs = Arc::new(MockFilesystem::default());
        let missing = Attachment::new(1, LinkMode::LinkedFile, "/library/gone.pdf");
        let catalog = Arc::new(MemoryCatalog::new().with_filesystem(fs.clone()).with_attachment(missing.clone()));
        let organizer = Organizer::new(fs, catalog.clone(), catalog);

        let results = organizer.convert_to_stored(&[missing], &FileOperationOptions::default()).await;
        assert!(matches!(results[0].as_ref().map_err(|err| &**err), Err(ErrorKind::Host)));
    }
}
