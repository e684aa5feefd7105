//! In-memory filesystem for testing.

use crate::error::{ErrorKind, Result};
use crate::models::{FileInfo, FileKind};
use crate::path::normalize as normalize_path;
use crate::Filesystem;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    files: BTreeMap<PathBuf, (OffsetDateTime, Vec<u8>)>,
    /// Every directory that exists, including the implicit ancestors of files.
    dirs: BTreeSet<PathBuf>,
    /// Paths on which every mutation fails with `PermissionDenied`.
    denied: BTreeSet<PathBuf>,
}
impl State {
    fn insert_file(&mut self, path: PathBuf, modified: OffsetDateTime, data: Vec<u8>) {
        self.dirs.extend(path.ancestors().skip(1).map(Path::to_path_buf));
        self.files.insert(path, (modified, data));
    }

    fn check_denied(&self, path: &Path) -> Result<()> {
        match self.denied.contains(path) {
            true => exn::bail!(ErrorKind::PermissionDenied(path.to_path_buf())),
            false => Ok(()),
        }
    }

    fn children(&self, dir: &Path) -> impl Iterator<Item = &Path> {
        self.files
            .keys()
            .chain(self.dirs.iter())
            .map(PathBuf::as_path)
            .filter(move |path| path.parent() == Some(dir))
    }
}

/// In-memory filesystem for testing.
///
/// Files live in a map behind a [`RwLock`], so all trait methods can operate
/// on `&self` without external synchronisation. Directories exist implicitly
/// as ancestors of files, and explicitly once created with
/// [`create_dir`](Self::create_dir); removing a file keeps its directories,
/// like a real disk.
///
/// # Examples
///
/// ```
/// use reshelf_storage::backend::MockFilesystem;
/// use reshelf_storage::Filesystem;
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fs = MockFilesystem::with_files([("/downloads/paper.pdf", b"%PDF")]);
/// fs.copy_new(Path::new("/downloads/paper.pdf"), Path::new("/library/paper.pdf")).await?;
/// assert!(fs.exists(Path::new("/library")).await?);
/// # Ok(())
/// # }
/// ```
pub struct MockFilesystem {
    state: RwLock<State>,
}

impl MockFilesystem {
    /// Create a mock filesystem pre-populated with files.
    ///
    /// Panics if any path fails normalization (e.g. relative). If test setup
    /// is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut state = State::default();
        let now = OffsetDateTime::now_utc();
        for (path, data) in files {
            let path = path.into();
            let Ok(normalized) = normalize_path(&path) else {
                // The panic here is DELIBERATE. MockFilesystem is intended to be
                // used in tests; panics are expected. There is no error result.
                panic!("MockFilesystem::with_files: invalid path {}", path.display());
            };
            state.insert_file(normalized, now, data.into());
        }
        Self { state: RwLock::new(state) }
    }

    /// Make every mutation of `path` fail with
    /// [`PermissionDenied`](ErrorKind::PermissionDenied).
    pub fn with_denied(mut self, path: impl Into<PathBuf>) -> Self {
        self.state.get_mut().denied.insert(path.into());
        self
    }

    /// Write (or overwrite) a file, creating its directories.
    pub async fn write(&self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>) -> Result<()> {
        let path = normalize_path(path)?;
        let mut state = self.state.write().await;
        state.check_denied(&path)?;
        state.insert_file(path, OffsetDateTime::now_utc(), data.into());
        Ok(())
    }

    /// Create a directory and its ancestors.
    pub async fn create_dir(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = normalize_path(path)?;
        self.state.write().await.dirs.extend(path.ancestors().map(Path::to_path_buf));
        Ok(())
    }

    /// Contents of a file, if it exists.
    pub async fn read(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let path = normalize_path(path).ok()?;
        self.state.read().await.files.get(&path).map(|(_, data)| data.clone())
    }

    /// Every file path, sorted.
    pub async fn files(&self) -> Vec<PathBuf> {
        self.state.read().await.files.keys().cloned().collect()
    }
}
impl Default for MockFilesystem {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl Filesystem for MockFilesystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = normalize_path(path)?;
        let state = self.state.read().await;
        Ok(state.files.contains_key(&path) || state.dirs.contains(&path))
    }

    async fn copy_new(&self, from: &Path, to: &Path) -> Result<u64> {
        let from = normalize_path(from)?;
        let to = normalize_path(to)?;
        let mut state = self.state.write().await;
        let (_, data) = state.files.get(&from).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(from)))?;
        state.check_denied(&to)?;
        if state.files.contains_key(&to) || state.dirs.contains(&to) {
            exn::bail!(ErrorKind::AlreadyExists(to));
        }
        let size = data.len() as u64;
        state.insert_file(to, OffsetDateTime::now_utc(), data);
        Ok(size)
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        let path = normalize_path(path)?;
        let mut state = self.state.write().await;
        state.check_denied(&path)?;
        state.files.remove(&path).map(|_| ()).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }

    async fn remove_dir(&self, path: &Path) -> Result<()> {
        let path = normalize_path(path)?;
        let mut state = self.state.write().await;
        state.check_denied(&path)?;
        if !state.dirs.contains(&path) {
            exn::bail!(ErrorKind::NotFound(path));
        }
        if state.children(&path).next().is_some() {
            exn::bail!(ErrorKind::DirectoryNotEmpty(path));
        }
        state.dirs.remove(&path);
        Ok(())
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<FileInfo>> {
        let path = normalize_path(path)?;
        let state = self.state.read().await;
        if !state.dirs.contains(&path) {
            exn::bail!(ErrorKind::NotFound(path));
        }
        Ok(state
            .children(&path)
            .map(|child| match state.files.get(child) {
                Some((modified, data)) => FileInfo::new(child, data.len() as u64, *modified, FileKind::File),
                None => FileInfo::new(child, 0, OffsetDateTime::UNIX_EPOCH, FileKind::Directory),
            })
            .collect())
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let path = normalize_path(path)?;
        let state = self.state.read().await;
        if let Some((modified, data)) = state.files.get(&path) {
            return Ok(FileInfo::new(&path, data.len() as u64, *modified, FileKind::File));
        }
        match state.dirs.contains(&path) {
            true => Ok(FileInfo::new(&path, 0, OffsetDateTime::UNIX_EPOCH, FileKind::Directory)),
            false => exn::bail!(ErrorKind::NotFound(path)),
        }
    }

    async fn set_modified(&self, path: &Path, modified: OffsetDateTime) -> Result<()> {
        let path = normalize_path(path)?;
        let mut state = self.state.write().await;
        state.check_denied(&path)?;
        let (current, _) = state.files.get_mut(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        *current = modified;
        Ok(())
    }
}
