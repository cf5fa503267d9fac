//! Archive Validator
//!
//! Confirms a candidate file can be loaded as a plugin archive.

use std::io::ErrorKind;
use std::path::Path;

use crate::{DEFAULT_ARCHIVE_EXTENSION, Signature, ValidationError, has_extension};

/// Checks a candidate path before it is handed to the load pipeline
pub trait ArchiveValidator: Send + Sync {
    /// Validate existence, readability, regular-file-ness, extension and
    /// byte signature, in that order
    fn validate(&self, path: &Path) -> Result<(), ValidationError>;
}

/// Validator for ZIP-based plugin archives
#[derive(Debug, Clone)]
pub struct ZipValidator {
    extension: String,
}

impl Default for ZipValidator {
    fn default() -> Self {
        Self::new(DEFAULT_ARCHIVE_EXTENSION)
    }
}

impl ZipValidator {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }
}

impl ArchiveValidator for ZipValidator {
    fn validate(&self, path: &Path) -> Result<(), ValidationError> {
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ValidationError::NotFound(path.to_path_buf()),
            _ => ValidationError::Unreadable {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let file = std::fs::File::open(path).map_err(|e| ValidationError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })?;

        if !metadata.is_file() {
            return Err(ValidationError::NotRegularFile(path.to_path_buf()));
        }

        if !has_extension(path, &self.extension) {
            return Err(ValidationError::WrongExtension {
                path: path.to_path_buf(),
                expected: self.extension.clone(),
            });
        }

        let found = Signature::read_from(file).map_err(|e| ValidationError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })?;

        if found != Signature::ARCHIVE {
            return Err(ValidationError::BadSignature {
                path: path.to_path_buf(),
                found,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_valid_archive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chat.par");
        std::fs::write(&path, b"PK\x03\x04\x14\x00").unwrap();

        assert!(ZipValidator::default().validate(&path).is_ok());
    }

    #[test]
    fn test_missing_archive() {
        let temp = TempDir::new().unwrap();
        let result = ZipValidator::default().validate(&temp.path().join("gone.par"));
        assert!(matches!(result, Err(ValidationError::NotFound(_))));
    }

    #[test]
    fn test_directory_is_not_regular_file() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("folder.par");
        std::fs::create_dir(&dir).unwrap();

        let result = ZipValidator::default().validate(&dir);
        assert!(matches!(result, Err(ValidationError::NotRegularFile(_))));
    }

    #[test]
    fn test_wrong_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chat.zip");
        std::fs::write(&path, b"PK\x03\x04").unwrap();

        let result = ZipValidator::default().validate(&path);
        assert!(matches!(result, Err(ValidationError::WrongExtension { .. })));
    }

    #[test]
    fn test_bad_signature() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("garbage.par");
        std::fs::write(&path, b"definitely not a zip file").unwrap();

        match ZipValidator::default().validate(&path) {
            Err(ValidationError::BadSignature { found, .. }) => {
                assert_ne!(found, Signature::ARCHIVE);
            }
            other => panic!("expected bad signature, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_reported_before_extension() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chat.zip");
        std::fs::write(&path, b"PK\x03\x04").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users read the file regardless of its mode
        if std::fs::File::open(&path).is_ok() {
            return;
        }

        let result = ZipValidator::default().validate(&path);
        assert!(matches!(result, Err(ValidationError::Unreadable { .. })));
    }
}
