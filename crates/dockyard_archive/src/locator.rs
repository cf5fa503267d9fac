//! Archive Locator
//!
//! Resolves files and directories into the set of candidate archives.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::{Archive, DEFAULT_ARCHIVE_EXTENSION, has_extension};

/// Collects archives from a list of input paths
///
/// # Example
/// ```text
/// plugins/
/// ├── chat.par         <- Found
/// ├── README.md
/// └── vendor/
///     └── audit.PAR    <- Found (extensions compare case-insensitively)
/// ```
#[derive(Debug, Clone)]
pub struct ArchiveLocator {
    extension: String,
}

impl Default for ArchiveLocator {
    fn default() -> Self {
        Self::new(DEFAULT_ARCHIVE_EXTENSION)
    }
}

impl ArchiveLocator {
    /// Create a locator matching the given extension (without the dot)
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Resolve every input into the deduplicated set of archives
    ///
    /// Missing inputs and unreadable directory entries are logged and
    /// skipped; they never abort the call.
    pub fn locate<P: AsRef<Path>>(&self, inputs: &[P]) -> BTreeSet<Archive> {
        let mut archives = BTreeSet::new();

        for input in inputs {
            let path = crate::normalize(input.as_ref());

            let metadata = match std::fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(_) => {
                    warn!("Unable to find {}: file does not exist", path.display());
                    continue;
                }
            };

            if metadata.is_dir() {
                self.walk(&path, &mut archives);
            } else if metadata.is_file() && has_extension(&path, &self.extension) {
                archives.insert(Archive::new(&path));
            } else {
                debug!("Skipping {}: not a .{} file", path.display(), self.extension);
            }
        }

        archives
    }

    fn walk(&self, dir: &Path, archives: &mut BTreeSet<Archive>) {
        for entry in WalkDir::new(dir) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to walk {}: {}", dir.display(), e);
                    continue;
                }
            };

            if entry.file_type().is_file() && has_extension(entry.path(), &self.extension) {
                archives.insert(Archive::new(entry.path()));
            }
        }
    }
}
