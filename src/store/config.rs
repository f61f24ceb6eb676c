//! Store configuration
//!
//! The capacity bound and the corrupt-file policy are the only tunables.
//! Both have serde defaults so a partial JSON config deserializes to the
//! same values as [`StoreConfig::default`].

use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};

/// Capacity bound used when no explicit limit is configured.
pub const DEFAULT_MAX_PING_COUNT: usize = 40;

/// What to do with a file that matches the ping filename encoding but cannot
/// be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptPingPolicy {
    /// Skip the file silently.
    Skip,
    /// Log a warning and skip the file.
    Warn,
    /// Log a warning and move the file into the `quarantine/` subdirectory.
    Quarantine,
}

impl Default for CorruptPingPolicy {
    fn default() -> Self {
        Self::Warn
    }
}

/// Configuration for a [`super::PingStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of pings kept by a capacity-driven prune pass.
    #[serde(default = "default_max_ping_count")]
    pub max_ping_count: usize,

    /// Policy for undecodable ping files found during enumeration.
    #[serde(default)]
    pub on_corrupt: CorruptPingPolicy,
}

fn default_max_ping_count() -> usize {
    DEFAULT_MAX_PING_COUNT
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_ping_count: DEFAULT_MAX_PING_COUNT,
            on_corrupt: CorruptPingPolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> StoreResult<()> {
        if self.max_ping_count == 0 {
            return Err(StoreError::InvalidConfig {
                reason: "max_ping_count must be > 0".to_string(),
            });
        }
        Ok(())
    }
}
