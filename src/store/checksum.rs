//! CRC32 integrity checksums for stored ping documents
//!
//! Every ping file written by the store carries a checksum over the
//! destination path and the canonical payload bytes. Reads verify it when
//! present; a mismatch marks the file corrupt.
//!
//! Uses CRC32 (IEEE polynomial).

use crc32fast::Hasher;

/// Computes the checksum for a ping's destination and canonical payload
/// bytes.
///
/// Deterministic: the same inputs always produce the same output.
pub fn compute_checksum(destination: &str, payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(destination.as_bytes());
    hasher.update(payload);
    hasher.finalize()
}

/// Verifies a stored checksum against recomputed inputs.
pub fn verify_checksum(destination: &str, payload: &[u8], expected: u32) -> bool {
    compute_checksum(destination, payload) == expected
}
