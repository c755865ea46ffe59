//! Checksum utilities for upload fingerprinting
//!
//! A job's `fileHash` is the sha256 of the raw uploaded bytes. The same
//! file uploaded twice produces the same fingerprint, which is what makes
//! re-ingestion of an identical file idempotent at the record level.

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Compute the sha256 fingerprint of an in-memory buffer, hex-encoded.
pub fn fingerprint(buffer: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(buffer);
    hex::encode(hasher.finalize())
}

/// Compute the sha256 fingerprint of any readable source, hex-encoded.
pub fn fingerprint_reader<R: Read>(reader: &mut R) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the sha256 fingerprint of a file on disk, hex-encoded.
pub fn fingerprint_file(path: impl AsRef<Path>) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    fingerprint_reader(&mut file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_fingerprint_known_value() {
        let checksum = fingerprint(b"hello world");
        assert_eq!(checksum, "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9");
    }

    #[test]
    fn test_fingerprint_reader_matches_buffer() {
        let data = b"name,email\nAda,ada@example.com\n";
        let mut cursor = Cursor::new(data);
        let from_reader = fingerprint_reader(&mut cursor).unwrap();
        assert_eq!(from_reader, fingerprint(data));
    }

    #[test]
    fn test_fingerprint_differs_for_different_content() {
        assert_ne!(fingerprint(b"file one"), fingerprint(b"file two"));
    }
}
