//! CLI command implementations
//!
//! Every command opens the store through its public API and prints JSON to
//! stdout; diagnostics go to stderr via tracing.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::store::{CorruptPingPolicy, PingStore, StoreConfig, DEFAULT_MAX_PING_COUNT};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Default store directory when neither --dir nor a config file names one.
const DEFAULT_STORE_DIR: &str = "./pings";

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Store directory (required)
    pub store_dir: String,

    /// Capacity bound for prune passes (optional, default 40)
    #[serde(default = "default_max_ping_count")]
    pub max_ping_count: usize,

    /// Corrupt-file policy: "skip", "warn", or "quarantine" (optional,
    /// default "warn")
    #[serde(default)]
    pub on_corrupt: CorruptPingPolicy,
}

fn default_max_ping_count() -> usize {
    DEFAULT_MAX_PING_COUNT
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> CliResult<()> {
        if self.store_dir.is_empty() {
            return Err(CliError::config_error("store_dir must not be empty"));
        }
        if self.max_ping_count == 0 {
            return Err(CliError::config_error("max_ping_count must be > 0"));
        }
        Ok(())
    }

    fn store_config(&self) -> StoreConfig {
        StoreConfig {
            max_ping_count: self.max_ping_count,
            on_corrupt: self.on_corrupt,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: DEFAULT_STORE_DIR.to_string(),
            max_ping_count: DEFAULT_MAX_PING_COUNT,
            on_corrupt: CorruptPingPolicy::default(),
        }
    }
}

/// Parse arguments, resolve configuration, and dispatch the command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    init_tracing();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let store_dir: PathBuf = cli
        .dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.store_dir));

    let store = PingStore::open_with_config(store_dir, config.store_config())?;

    match cli.command {
        Command::List => list(&store),
        Command::Stats => stats(&store),
        Command::Prune { max } => prune(&store, max),
        Command::Ack { ids } => ack(&store, &ids),
    }
}

/// Print every stored ping as JSON lines, sorted by ID.
pub fn list(store: &PingStore) -> CliResult<()> {
    let mut pings = store.get_all_pings()?;
    pings.sort_unstable_by_key(|p| p.id);

    for ping in &pings {
        println!("{}", serde_json::to_string(ping)?);
    }
    Ok(())
}

/// Print record counts and ID bounds.
pub fn stats(store: &PingStore) -> CliResult<()> {
    let scan = store.scan()?;
    let ids: Vec<u64> = scan.pings.iter().map(|p| p.id).collect();

    let summary = json!({
        "count": scan.pings.len(),
        "skipped": scan.skipped,
        "quarantined": scan.quarantined,
        "min_id": ids.iter().min(),
        "max_id": ids.iter().max(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Run one eviction pass and print the outcome.
pub fn prune(store: &PingStore, max: Option<usize>) -> CliResult<()> {
    let outcome = match max {
        Some(max) => store.prune(max)?,
        None => store.prune_to_capacity()?,
    };

    let summary = json!({
        "removed": outcome.removed,
        "failed": outcome.failed,
    });
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

/// Remove the given IDs and print the outcome.
pub fn ack(store: &PingStore, ids: &[u64]) -> CliResult<()> {
    let succeeded: HashSet<u64> = ids.iter().copied().collect();
    let outcome = store.acknowledge(&succeeded);

    let summary = json!({
        "removed": outcome.removed,
        "already_absent": outcome.already_absent,
        "failed": outcome.failed,
    });
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
