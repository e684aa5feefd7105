//! Lexical path utilities.
//!
//! Attachment paths come from the host and are always absolute. Nothing here
//! touches the filesystem: `..` is resolved lexically, symlinks are not
//! followed.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path, PathBuf};

/// Normalizes an absolute path.
///
/// Removes `.` components and redundant separators, and resolves `..`
/// against the preceding component.
///
/// # Returns
/// Returns the normalized path if valid, or [`InvalidPath`](crate::error::ErrorKind::InvalidPath)
/// if the path is relative, contains a null byte, or climbs above its root.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use reshelf_storage::normalize_path;
/// # #[cfg(unix)] {
/// assert_eq!(normalize_path("/library//a/./b/../c.pdf").unwrap(), Path::new("/library/a/c.pdf"));
/// assert!(normalize_path("relative/c.pdf").is_err());
/// assert!(normalize_path("/../etc").is_err());
/// assert!(normalize_path("/a\0b").is_err());
/// # }
/// ```
pub fn normalize(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if !path.is_absolute() {
        exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
    }
    let mut normalized = PathBuf::new();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(Component::RootDir),
            Component::CurDir => {},
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls, reject them explicitly.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
                }
                normalized.push(s);
                depth += 1;
            },
            Component::ParentDir => {
                if depth == 0 {
                    exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
                }
                normalized.pop();
                depth -= 1;
            },
        }
    }
    Ok(normalized)
}

/// Returns `true` if `path` is `root` itself or lies somewhere below it.
///
/// Both paths are normalized first; either one failing normalization is
/// never "within" anything.
pub fn is_within(root: impl AsRef<Path>, path: impl AsRef<Path>) -> bool {
    match (normalize(root), normalize(path)) {
        (Ok(root), Ok(path)) => path.starts_with(root),
        _ => false,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        assert_eq!(normalize("/library/a/file.pdf").unwrap(), Path::new("/library/a/file.pdf"));
        assert_eq!(normalize("/").unwrap(), Path::new("/"));
    }

    #[test]
    fn test_path_normalization() {
        // Double slashes are normalized
        assert_eq!(normalize("/a//b//c").unwrap(), Path::new("/a/b/c"));
        // Current directory references removed
        assert_eq!(normalize("/a/./b/./c").unwrap(), Path::new("/a/b/c"));
        // Trailing slashes stripped
        assert_eq!(normalize("/a/b/").unwrap(), Path::new("/a/b"));
        // Parent references resolved
        assert_eq!(normalize("/a/b/../c").unwrap(), Path::new("/a/c"));
        assert_eq!(normalize("/a/..").unwrap(), Path::new("/"));
    }

    #[test]
    fn test_invalid_paths() {
        assert!(normalize("").is_err());
        assert!(normalize("relative").is_err());
        assert!(normalize("./relative").is_err());
        assert!(normalize("/..").is_err());
        assert!(normalize("/a/../../b").is_err());
        assert!(normalize("/a\0b").is_err());
    }

    #[test]
    fn test_is_within() {
        assert!(is_within("/library", "/library/a/b.pdf"));
        assert!(is_within("/library/", "/library"));
        assert!(is_within("/library", "/library/a/../b.pdf"));
        // Component-based, not string-based
        assert!(!is_within("/library", "/library2/b.pdf"));
        assert!(!is_within("/library", "/library/../etc/passwd"));
        assert!(!is_within("library", "library/a.pdf"));
    }
}
