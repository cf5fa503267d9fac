//! Symbol Extractor
//!
//! Unpacks an archive into scratch storage and collects the raw symbol bytes.
//! Scratch storage is removed on every exit path; a failed removal is logged
//! as a warning since the symbols are already in memory by then.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::warn;
use walkdir::WalkDir;

use crate::{Archive, DEFAULT_SYMBOL_EXTENSION, ExtractionError, has_extension};

/// Raw symbol bytes keyed by qualified name
pub type SymbolMap = BTreeMap<String, Vec<u8>>;

// ─────────────────────────────────────────────────────────────────────────────
// Scratch Storage
// ─────────────────────────────────────────────────────────────────────────────

/// A process-exclusive temporary directory, removed when released or dropped
#[derive(Debug)]
pub struct Scratch {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Scratch {
    /// Create a scratch directory under `root` (or the system temp dir)
    pub fn create(root: Option<&Path>) -> Result<Self, ExtractionError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("dockyard-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(ExtractionError::Scratch)?;

        let path = dir.path().to_path_buf();
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory, reporting failure
    pub fn release(mut self) -> Result<(), ExtractionError> {
        match self.dir.take() {
            Some(dir) => dir.close().map_err(|source| ExtractionError::Cleanup {
                path: self.path.clone(),
                source,
            }),
            None => Ok(()),
        }
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                warn!("Unable to delete scratch directory {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Result of unpacking an archive
#[derive(Debug)]
pub struct Extraction {
    /// Scratch storage still holding the unpacked files
    pub scratch: Scratch,
    /// Symbol bytes keyed by qualified name
    pub symbols: SymbolMap,
}

impl Extraction {
    /// Release scratch storage and keep only the symbols
    ///
    /// Cleanup failures are logged, not returned.
    pub fn into_symbols(self) -> SymbolMap {
        if let Err(e) = self.scratch.release() {
            warn!("{}", e);
        }
        self.symbols
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Extractor
// ─────────────────────────────────────────────────────────────────────────────

/// Turns an archive into named symbol blobs
pub trait SymbolExtractor: Send + Sync {
    fn extract(&self, archive: &Archive) -> Result<Extraction, ExtractionError>;
}

/// Extractor for ZIP-based plugin archives
#[derive(Debug, Clone)]
pub struct ZipExtractor {
    symbol_extension: String,
    scratch_root: Option<PathBuf>,
}

impl Default for ZipExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_SYMBOL_EXTENSION)
    }
}

impl ZipExtractor {
    pub fn new(symbol_extension: impl Into<String>) -> Self {
        Self {
            symbol_extension: symbol_extension.into(),
            scratch_root: None,
        }
    }

    /// Create scratch directories under `root` instead of the system temp dir
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    fn unpack(&self, archive: &Archive, dir: &Path) -> Result<SymbolMap, ExtractionError> {
        let file = std::fs::File::open(archive.path()).map_err(|source| ExtractionError::Open {
            path: archive.path().to_path_buf(),
            source,
        })?;

        let mut zip = zip::ZipArchive::new(file).map_err(|source| ExtractionError::Container {
            path: archive.path().to_path_buf(),
            source,
        })?;
        zip.extract(dir).map_err(|source| ExtractionError::Container {
            path: archive.path().to_path_buf(),
            source,
        })?;

        let mut symbols = SymbolMap::new();
        for entry in WalkDir::new(dir) {
            let entry = entry.map_err(|e| ExtractionError::Read {
                path: dir.to_path_buf(),
                source: e.into(),
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() || !has_extension(path, &self.symbol_extension) {
                continue;
            }

            let Some(name) = symbol_name(dir, path) else {
                warn!("Skipping symbol with non UTF-8 path: {}", path.display());
                continue;
            };
            let bytes = std::fs::read(path).map_err(|source| ExtractionError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            symbols.insert(name, bytes);
        }

        Ok(symbols)
    }
}

impl SymbolExtractor for ZipExtractor {
    fn extract(&self, archive: &Archive) -> Result<Extraction, ExtractionError> {
        let scratch = Scratch::create(self.scratch_root.as_deref())?;

        match self.unpack(archive, scratch.path()) {
            Ok(symbols) => Ok(Extraction { scratch, symbols }),
            Err(e) => {
                if let Err(cleanup) = scratch.release() {
                    warn!("{}", cleanup);
                }
                Err(e)
            }
        }
    }
}

/// Qualified symbol name of a file below `root`
///
/// `com/example/Listener.sym` becomes `com.example.Listener`.
pub fn symbol_name(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?.with_extension("");
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("."))
}
