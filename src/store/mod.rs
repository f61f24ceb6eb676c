//! Ping persistence subsystem
//!
//! A durable, capacity-bounded, append-mostly store: one JSON file per ping
//! in a single directory, keyed by a caller-assigned integer ID embedded in
//! the filename.
//!
//! # Design Principles
//!
//! - Directory-as-table: the ID <-> filename bijection is the only index
//! - Atomic publish: temp file + rename, never a partially visible ping
//! - Oldest-first eviction: smallest ID evicted first, timestamps ignored
//! - Idempotent deletion: removing an absent file is success
//! - Lazy validation: bad files surface on read, per a configurable policy

mod checksum;
mod config;
mod errors;
mod filename;
mod ping_store;
mod record;

pub use checksum::{compute_checksum, verify_checksum};
pub use config::{CorruptPingPolicy, StoreConfig, DEFAULT_MAX_PING_COUNT};
pub use errors::{StoreError, StoreResult};
pub use filename::{id_from_name, name_for, FILE_PREFIX, FILE_SUFFIX};
pub use ping_store::{AckOutcome, PingStore, PruneOutcome, StoreScan, QUARANTINE_DIR};
pub use record::{CorruptReason, PingRecord};
