//! Ping store error types
//!
//! Nothing here is fatal to the process: `Unavailable` kills only the store
//! handle being constructed, `WriteFailed` loses only the single ping being
//! inserted, and `EnumerationFailed` fails only the read pass that hit it.
//! Per-file trouble during enumeration or batch deletion is deliberately not
//! an error; it is counted and reported through scan/prune/ack outcomes.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Ping store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// The root path cannot be used as the store directory.
    #[error("ping store unavailable at {}: {detail}", path.display())]
    Unavailable { path: PathBuf, detail: String },

    /// A single insert failed; no partial file is left behind.
    #[error("failed to persist ping {id}: {detail}")]
    WriteFailed { id: u64, detail: String },

    /// The record was rejected before any I/O.
    #[error("invalid ping record: {reason}")]
    InvalidRecord { reason: String },

    /// The store configuration failed validation.
    #[error("invalid store configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The store directory itself could not be read.
    #[error("failed to enumerate ping directory {}: {source}", path.display())]
    EnumerationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Root path unusable at construction
    pub(crate) fn unavailable(path: &std::path::Path, detail: impl Into<String>) -> Self {
        Self::Unavailable {
            path: path.to_path_buf(),
            detail: detail.into(),
        }
    }

    /// Single insert failed
    pub(crate) fn write_failed(id: u64, detail: impl Into<String>) -> Self {
        Self::WriteFailed {
            id,
            detail: detail.into(),
        }
    }

    /// Directory enumeration failed
    pub(crate) fn enumeration_failed(path: &std::path::Path, source: io::Error) -> Self {
        Self::EnumerationFailed {
            path: path.to_path_buf(),
            source,
        }
    }
}
