//! Ping record types and the on-disk document format
//!
//! A stored ping file is a JSON document:
//!
//! ```json
//! {
//!   "destination": "/submit/telemetry/core",
//!   "payload": { ... },
//!   "stored_at": "2026-08-08T11:30:00Z",
//!   "checksum": 3735928559
//! }
//! ```
//!
//! `destination` and `payload` are required. `stored_at` and `checksum` are
//! written by the store but tolerated absent on read, so hand-placed files
//! with just the two required fields decode cleanly. When `checksum` is
//! present it is verified against the destination and the canonical payload
//! bytes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::checksum::{compute_checksum, verify_checksum};

/// A single telemetry ping: a payload bound for a destination path,
/// identified by a caller-assigned integer ID.
///
/// IDs are assigned monotonically by the producer and never reused; the
/// store treats them as the ordering authority for eviction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PingRecord {
    /// Caller-assigned unique ID.
    pub id: u64,
    /// Destination path the upload client will deliver the payload to.
    pub destination: String,
    /// Opaque payload document.
    pub payload: Value,
}

impl PingRecord {
    /// Create a new ping record.
    pub fn new(id: u64, destination: impl Into<String>, payload: Value) -> Self {
        Self {
            id,
            destination: destination.into(),
            payload,
        }
    }
}

/// Why a stored ping file was rejected during enumeration.
#[derive(Debug)]
pub enum CorruptReason {
    /// The file could not be read.
    Unreadable(std::io::Error),
    /// The contents are not a valid ping document.
    Malformed(serde_json::Error),
    /// The stored checksum does not match the contents.
    ChecksumMismatch { stored: u32, computed: u32 },
}

impl std::fmt::Display for CorruptReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorruptReason::Unreadable(e) => write!(f, "unreadable: {}", e),
            CorruptReason::Malformed(e) => write!(f, "malformed: {}", e),
            CorruptReason::ChecksumMismatch { stored, computed } => write!(
                f,
                "checksum mismatch: stored {:08x}, computed {:08x}",
                stored, computed
            ),
        }
    }
}

/// On-disk JSON document for one ping.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PingDocument {
    pub destination: String,
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<u32>,
}

impl PingDocument {
    /// Build the document for a record, stamping `stored_at` and computing
    /// the checksum over the canonical payload bytes.
    pub fn from_record(record: &PingRecord) -> Result<Self, serde_json::Error> {
        let payload_bytes = serde_json::to_vec(&record.payload)?;
        Ok(Self {
            destination: record.destination.clone(),
            payload: record.payload.clone(),
            stored_at: Some(Utc::now()),
            checksum: Some(compute_checksum(&record.destination, &payload_bytes)),
        })
    }

    /// Serialize the document to the bytes written to disk.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

/// Decode the contents of a stored ping file, verifying the checksum when
/// present.
pub(crate) fn decode_ping(id: u64, bytes: &[u8]) -> Result<PingRecord, CorruptReason> {
    let document: PingDocument =
        serde_json::from_slice(bytes).map_err(CorruptReason::Malformed)?;

    if let Some(stored) = document.checksum {
        // Recompute over the same canonical bytes the writer hashed.
        let payload_bytes =
            serde_json::to_vec(&document.payload).map_err(CorruptReason::Malformed)?;
        if !verify_checksum(&document.destination, &payload_bytes, stored) {
            let computed = compute_checksum(&document.destination, &payload_bytes);
            return Err(CorruptReason::ChecksumMismatch { stored, computed });
        }
    }

    Ok(PingRecord {
        id,
        destination: document.destination,
        payload: document.payload,
    })
}
