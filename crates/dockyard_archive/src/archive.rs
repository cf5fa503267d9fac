//! Archive identity.

use std::fmt;
use std::path::{Path, PathBuf};

/// An immutable reference to a packaged plugin on disk
///
/// Identity is the normalized absolute path, so the same physical file
/// reached through two different inputs compares equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Archive {
    path: PathBuf,
}

impl Archive {
    /// Create an archive reference, normalizing the path
    ///
    /// Existing files are canonicalized (symlinks and `..` resolved); paths
    /// that cannot be canonicalized are made absolute against the working
    /// directory.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: normalize(path.as_ref()),
        }
    }

    /// Absolute path of the archive
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw archive bytes
    pub fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }
}

impl fmt::Display for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl AsRef<Path> for Archive {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Normalize a path to an absolute, canonical form where possible
pub fn normalize(path: &Path) -> PathBuf {
    match path.canonicalize() {
        Ok(canonical) => canonical,
        Err(_) => std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()),
    }
}
