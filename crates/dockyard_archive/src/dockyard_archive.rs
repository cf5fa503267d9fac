//! Dockyard Archive - Locating, validating and unpacking plugin archives
//!
//! This crate holds the collaborators the plugin host leans on before any
//! symbol is defined:
//!
//! - [`ArchiveLocator`] turns a list of files and directories into a
//!   deduplicated set of candidate archives
//! - [`ArchiveValidator`] confirms a candidate is a readable archive with the
//!   expected extension and byte signature
//! - [`SymbolExtractor`] unpacks an archive into scratch storage and yields
//!   the raw symbol bytes keyed by qualified name

mod archive;
mod error;
mod extractor;
mod locator;
mod signature;
mod validator;

pub use archive::*;
pub use error::*;
pub use extractor::*;
pub use locator::*;
pub use signature::*;
pub use validator::*;

/// Default extension of plugin archives
pub const DEFAULT_ARCHIVE_EXTENSION: &str = "par";

/// Default extension of symbol entries inside an archive
pub const DEFAULT_SYMBOL_EXTENSION: &str = "sym";

/// Case-insensitive extension check (`extension` is given without the dot)
pub fn has_extension(path: &std::path::Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension.trim_start_matches('.')))
}
