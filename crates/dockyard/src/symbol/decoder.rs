//! Symbol decoding.

use crate::error::DecodeError;

use super::SymbolManifest;

/// Turns raw symbol bytes into a manifest
pub trait SymbolDecoder: Send + Sync {
    fn decode(&self, name: &str, bytes: &[u8]) -> Result<SymbolManifest, DecodeError>;
}

/// Decoder for JSON symbol manifests
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestDecoder;

impl SymbolDecoder for ManifestDecoder {
    fn decode(&self, _name: &str, bytes: &[u8]) -> Result<SymbolManifest, DecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
