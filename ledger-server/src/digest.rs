//! Digest engine
//!
//! SHA-256 over canonicalized payloads ([`digest_payload`]) and over raw
//! byte streams ([`digest_bytes`] / [`digest_reader`]). Attachment
//! content is opaque binary and is hashed directly, never canonicalized.

use crate::canonical::{self, CanonicalError};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::Read;

/// Read buffer for streaming hashes (constant memory for any input size)
const HASH_BUF_SIZE: usize = 64 * 1024;

/// Hash a structured value: canonicalize, then SHA-256, lowercase hex.
pub fn digest_payload<T: Serialize>(value: &T) -> Result<String, CanonicalError> {
    let canonical = canonical::to_canonical_json(value)?;
    Ok(digest_bytes(canonical.as_bytes()))
}

/// Hash raw bytes to lowercase hex SHA-256.
pub fn digest_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hash an arbitrary byte stream in fixed-size chunks.
pub fn digest_reader<R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_BUF_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
