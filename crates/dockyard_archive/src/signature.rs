//! File signatures (magic numbers).

use std::fmt;
use std::io::Read;

/// The first four bytes of a file, big-endian
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(u32);

impl Signature {
    /// ZIP local file header, used by plugin archives
    pub const ARCHIVE: Signature = Signature(0x504B_0304);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    /// Signature of a byte slice
    ///
    /// Inputs shorter than four bytes are left-padded with zeros.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let len = bytes.len().min(4);
        let mut buf = [0u8; 4];
        buf[4 - len..].copy_from_slice(&bytes[..len]);
        Self(u32::from_be_bytes(buf))
    }

    /// Read the signature from the start of a stream
    pub fn read_from(mut reader: impl Read) -> std::io::Result<Self> {
        let mut buf = Vec::with_capacity(4);
        reader.by_ref().take(4).read_to_end(&mut buf)?;
        Ok(Self::of_bytes(&buf))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Whether the bytes start with the archive signature
pub fn looks_like_archive(bytes: &[u8]) -> bool {
    Signature::of_bytes(bytes) == Signature::ARCHIVE
}
