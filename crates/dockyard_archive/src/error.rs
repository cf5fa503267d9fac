//! Error types for archive validation and extraction.

use std::path::PathBuf;

use crate::Signature;

/// Reasons an archive is rejected before loading
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Unable to find {0}: file does not exist")]
    NotFound(PathBuf),

    #[error("Unable to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to load {0}: not a regular file")]
    NotRegularFile(PathBuf),

    #[error("Unable to load {path}: expected a .{expected} file")]
    WrongExtension { path: PathBuf, expected: String },

    #[error("Unable to load {path}: not an archive (signature {found})")]
    BadSignature { path: PathBuf, found: Signature },
}

/// Errors raised while unpacking an archive into scratch storage
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Failed to create scratch directory: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed archive {path}: {source}")]
    Container {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to read symbol {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to delete scratch directory {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
