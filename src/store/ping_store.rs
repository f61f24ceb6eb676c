//! The ping store: one JSON file per ping in a single root directory
//!
//! The directory is the table. Every stored ping is a `ping-<id>.json` file;
//! the ID embedded in the filename is the only index. Writes publish
//! atomically (temp file + rename in the same directory), so a concurrent
//! enumeration never observes a half-written ping. Eviction is oldest-first
//! by ID, and acknowledgment removes exactly the confirmed IDs.
//!
//! Mutating operations serialize on an internal lock; enumeration does not
//! take it. Deleting an already-absent file is success, which makes a
//! prune/acknowledge race over the same ID benign.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::config::{CorruptPingPolicy, StoreConfig};
use super::errors::{StoreError, StoreResult};
use super::filename;
use super::record::{decode_ping, CorruptReason, PingDocument, PingRecord};

/// Subdirectory corrupt files are moved into under
/// [`CorruptPingPolicy::Quarantine`].
pub const QUARANTINE_DIR: &str = "quarantine";

/// Result of one enumeration pass over the store directory.
#[derive(Debug, Default)]
pub struct StoreScan {
    /// Every ping that decoded cleanly, in no guaranteed order.
    pub pings: Vec<PingRecord>,
    /// Matching-named files that failed to decode and were left in place.
    pub skipped: usize,
    /// Matching-named files that failed to decode and were quarantined.
    pub quarantined: usize,
}

/// Result of one eviction pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PruneOutcome {
    /// Pings removed (or found already absent) by this pass.
    pub removed: usize,
    /// Pings that could not be removed.
    pub failed: usize,
}

/// Result of one acknowledgment pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AckOutcome {
    /// Pings removed by this pass.
    pub removed: usize,
    /// Acknowledged IDs that had no file (already pruned, or a duplicate
    /// ack).
    pub already_absent: usize,
    /// Pings that could not be removed.
    pub failed: usize,
}

/// Durable file-per-ping store bound to one root directory.
pub struct PingStore {
    root: PathBuf,
    config: StoreConfig,
    write_lock: Mutex<()>,
}

impl PingStore {
    /// Opens a store at `root` with the default configuration, creating the
    /// directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if `root` exists and is not a
    /// writable directory, or cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::open_with_config(root, StoreConfig::default())
    }

    /// Opens a store at `root` with an explicit configuration.
    ///
    /// Pre-existing files are not touched or validated here; bad files
    /// surface lazily during enumeration.
    pub fn open_with_config(root: impl Into<PathBuf>, config: StoreConfig) -> StoreResult<Self> {
        let root = root.into();
        config.validate()?;

        match fs::metadata(&root) {
            Ok(meta) if !meta.is_dir() => {
                return Err(StoreError::unavailable(&root, "path exists and is not a directory"));
            }
            Ok(meta) if meta.permissions().readonly() => {
                return Err(StoreError::unavailable(&root, "directory is not writable"));
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&root).map_err(|e| {
                    StoreError::unavailable(&root, format!("failed to create directory: {}", e))
                })?;
            }
            Err(e) => {
                return Err(StoreError::unavailable(&root, e.to_string()));
            }
        }

        Ok(Self {
            root,
            config,
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the store's configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the path a ping with this ID is (or would be) stored at.
    pub fn ping_file(&self, id: u64) -> PathBuf {
        self.root.join(filename::name_for(id))
    }

    /// Persists one ping atomically.
    ///
    /// The document is written to a dot-prefixed temp file in the store
    /// directory, fsynced, and renamed into place, so the ping is either
    /// fully visible or absent. All handles are closed before this returns;
    /// the published file is immediately openable by other processes.
    ///
    /// Storing an ID that already has a file replaces the whole document
    /// (atomic rename over the old file) and logs a warning. The store never
    /// merges.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidRecord`] for an empty destination;
    /// [`StoreError::WriteFailed`] if the write, fsync, or rename fails.
    /// On failure the temp file is removed, so no partial artifact survives.
    pub fn store_ping(&self, ping: &PingRecord) -> StoreResult<()> {
        if ping.destination.is_empty() {
            return Err(StoreError::InvalidRecord {
                reason: "destination must not be empty".to_string(),
            });
        }

        let bytes = PingDocument::from_record(ping)
            .and_then(|doc| doc.to_bytes())
            .map_err(|e| StoreError::write_failed(ping.id, format!("serialization failed: {}", e)))?;

        let _guard = self.write_lock.lock();

        let final_path = self.ping_file(ping.id);
        if final_path.exists() {
            warn!(id = ping.id, "replacing existing ping file");
        }

        let temp_path = self.root.join(filename::temp_name_for(ping.id));
        if let Err(e) = write_and_publish(&temp_path, &final_path, &bytes) {
            // Never leave a temp artifact behind on failure.
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::write_failed(ping.id, e.to_string()));
        }

        debug!(id = ping.id, path = %final_path.display(), "stored ping");
        Ok(())
    }

    /// Reads every stored ping back, in no guaranteed order.
    ///
    /// Callers that need order must sort by `id`. Undecodable files are
    /// handled per the configured [`CorruptPingPolicy`] and never abort the
    /// enumeration; use [`PingStore::scan`] to observe how many were
    /// affected.
    pub fn get_all_pings(&self) -> StoreResult<Vec<PingRecord>> {
        Ok(self.scan()?.pings)
    }

    /// Reads every stored ping back along with corrupt-file counts.
    ///
    /// # Errors
    ///
    /// [`StoreError::EnumerationFailed`] only if the directory itself cannot
    /// be read; per-file trouble is counted, not raised.
    pub fn scan(&self) -> StoreResult<StoreScan> {
        let mut scan = StoreScan::default();

        for (id, name) in self.stored_entries()? {
            let path = self.root.join(&name);
            let decoded = match fs::read(&path) {
                Ok(bytes) => decode_ping(id, &bytes),
                // Deleted between listing and read: a prune or ack won the
                // race, nothing to report.
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => Err(CorruptReason::Unreadable(e)),
            };

            match decoded {
                Ok(ping) => scan.pings.push(ping),
                Err(reason) => self.handle_corrupt(&path, &name, id, &reason, &mut scan),
            }
        }

        Ok(scan)
    }

    /// Counts the stored pings (valid filenames only; contents not parsed).
    pub fn count(&self) -> StoreResult<usize> {
        Ok(self.stored_entries()?.len())
    }

    /// Evicts the oldest pings until at most `max_count` remain.
    ///
    /// Oldest means smallest ID; filesystem timestamps are never consulted.
    /// Only filenames are read, so corrupt contents do not block eviction.
    /// A failure deleting one file does not stop the pass; the outcome
    /// reports how many were removed and how many failed.
    pub fn prune(&self, max_count: usize) -> StoreResult<PruneOutcome> {
        let _guard = self.write_lock.lock();

        let mut entries = self.stored_entries()?;
        if entries.len() <= max_count {
            return Ok(PruneOutcome::default());
        }

        entries.sort_unstable_by_key(|(id, _)| *id);
        let excess = entries.len() - max_count;

        let mut outcome = PruneOutcome::default();
        for (id, name) in entries.into_iter().take(excess) {
            match remove_if_present(&self.root.join(&name)) {
                Ok(_) => outcome.removed += 1,
                Err(e) => {
                    warn!(id, error = %e, "failed to evict ping");
                    outcome.failed += 1;
                }
            }
        }

        info!(
            removed = outcome.removed,
            failed = outcome.failed,
            max_count,
            "pruned ping store"
        );
        Ok(outcome)
    }

    /// Evicts down to the configured `max_ping_count`.
    pub fn prune_to_capacity(&self) -> StoreResult<PruneOutcome> {
        self.prune(self.config.max_ping_count)
    }

    /// Removes the pings whose IDs were confirmed delivered.
    ///
    /// IDs with no file are counted as already absent, not errors: the
    /// caller may race with a prior prune or send a duplicate ack. Pings
    /// outside `succeeded` are left untouched regardless of age. Each
    /// deletion is independent; one failure does not stop the rest.
    pub fn acknowledge(&self, succeeded: &HashSet<u64>) -> AckOutcome {
        let _guard = self.write_lock.lock();

        let mut outcome = AckOutcome::default();
        for &id in succeeded {
            match remove_if_present(&self.ping_file(id)) {
                Ok(true) => outcome.removed += 1,
                Ok(false) => outcome.already_absent += 1,
                Err(e) => {
                    warn!(id, error = %e, "failed to remove acknowledged ping");
                    outcome.failed += 1;
                }
            }
        }

        debug!(
            removed = outcome.removed,
            already_absent = outcome.already_absent,
            failed = outcome.failed,
            "acknowledged pings"
        );
        outcome
    }

    /// Lists `(id, filename)` for every entry whose name matches the ping
    /// encoding. Non-matching names, temp files, and subdirectories are
    /// ignored.
    fn stored_entries(&self) -> StoreResult<Vec<(u64, String)>> {
        let entries = fs::read_dir(&self.root)
            .map_err(|e| StoreError::enumeration_failed(&self.root, e))?;

        let mut stored = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "unreadable directory entry");
                    continue;
                }
            };
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(id) = filename::id_from_name(name) else { continue };
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            stored.push((id, name.to_string()));
        }

        Ok(stored)
    }

    /// Applies the configured policy to one undecodable ping file.
    fn handle_corrupt(
        &self,
        path: &Path,
        name: &str,
        id: u64,
        reason: &CorruptReason,
        scan: &mut StoreScan,
    ) {
        match self.config.on_corrupt {
            CorruptPingPolicy::Skip => scan.skipped += 1,
            CorruptPingPolicy::Warn => {
                warn!(id, %reason, path = %path.display(), "skipping corrupt ping file");
                scan.skipped += 1;
            }
            CorruptPingPolicy::Quarantine => {
                warn!(id, %reason, path = %path.display(), "quarantining corrupt ping file");
                match self.quarantine(path, name) {
                    Ok(()) => scan.quarantined += 1,
                    Err(e) => {
                        warn!(id, error = %e, "failed to quarantine ping file");
                        scan.skipped += 1;
                    }
                }
            }
        }
    }

    /// Moves a corrupt file into the quarantine subdirectory.
    fn quarantine(&self, path: &Path, name: &str) -> io::Result<()> {
        let quarantine_dir = self.root.join(QUARANTINE_DIR);
        fs::create_dir_all(&quarantine_dir)?;
        fs::rename(path, quarantine_dir.join(name))
    }
}

/// Write `bytes` to `temp_path`, fsync, and rename into `final_path`.
///
/// The handle is closed before the rename, so the published file carries no
/// lock or open descriptor from the store.
fn write_and_publish(temp_path: &Path, final_path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(temp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(temp_path, final_path)?;

    // Make the rename itself durable.
    if let Some(parent) = final_path.parent() {
        sync_dir(parent)?;
    }
    Ok(())
}

/// fsync a directory so a completed rename survives a crash.
fn sync_dir(path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(path)?;
    dir.sync_all()
}

/// Removes a file, treating "already absent" as success.
///
/// Returns `Ok(true)` if the file was removed, `Ok(false)` if it did not
/// exist, and `Err` only for genuine I/O failures.
fn remove_if_present(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_ping(id: u64) -> PingRecord {
        PingRecord::new(id, format!("/submit/{}", id), json!({"seq": id}))
    }

    fn file_count(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_open_creates_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("pings");
        assert!(!root.exists());

        let _store = PingStore::open(&root).unwrap();
        assert!(root.is_dir());
        // Only the store dir was created.
        assert_eq!(file_count(temp.path()), 1);
    }

    #[test]
    fn test_open_rejects_file_at_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("pings");
        fs::write(&root, b"not a directory").unwrap();

        let result = PingStore::open(&root);
        assert!(matches!(result, Err(StoreError::Unavailable { .. })));
    }

    #[test]
    fn test_store_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let store = PingStore::open(temp.path()).unwrap();

        store.store_ping(&test_ping(1)).unwrap();
        assert_eq!(file_count(temp.path()), 1);

        let name = fs::read_dir(temp.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .file_name();
        assert_eq!(name.to_str().unwrap(), "ping-1.json");
    }

    #[test]
    fn test_store_rejects_empty_destination() {
        let temp = TempDir::new().unwrap();
        let store = PingStore::open(temp.path()).unwrap();

        let ping = PingRecord::new(1, "", json!({}));
        let result = store.store_ping(&ping);
        assert!(matches!(result, Err(StoreError::InvalidRecord { .. })));
        assert_eq!(file_count(temp.path()), 0);
    }

    #[test]
    fn test_store_replaces_whole_document() {
        let temp = TempDir::new().unwrap();
        let store = PingStore::open(temp.path()).unwrap();

        store
            .store_ping(&PingRecord::new(5, "/submit/a", json!({"first": true})))
            .unwrap();
        store
            .store_ping(&PingRecord::new(5, "/submit/b", json!({"second": true})))
            .unwrap();

        let pings = store.get_all_pings().unwrap();
        assert_eq!(pings.len(), 1);
        assert_eq!(pings[0].destination, "/submit/b");
        // Replaced, never merged.
        assert_eq!(pings[0].payload, json!({"second": true}));
    }

    #[test]
    fn test_scan_ignores_foreign_files() {
        let temp = TempDir::new().unwrap();
        let store = PingStore::open(temp.path()).unwrap();

        store.store_ping(&test_ping(1)).unwrap();
        fs::write(temp.path().join("notes.txt"), b"not a ping").unwrap();
        fs::create_dir(temp.path().join("subdir")).unwrap();

        let scan = store.scan().unwrap();
        assert_eq!(scan.pings.len(), 1);
        assert_eq!(scan.skipped, 0);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_warn_policy_skips_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let store = PingStore::open(temp.path()).unwrap();

        store.store_ping(&test_ping(1)).unwrap();
        fs::write(store.ping_file(2), b"{ truncated").unwrap();

        let scan = store.scan().unwrap();
        assert_eq!(scan.pings.len(), 1);
        assert_eq!(scan.skipped, 1);
        assert_eq!(scan.quarantined, 0);
        // Skipped file left in place.
        assert!(store.ping_file(2).exists());
    }

    #[test]
    fn test_quarantine_policy_moves_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let config = StoreConfig {
            on_corrupt: CorruptPingPolicy::Quarantine,
            ..StoreConfig::default()
        };
        let store = PingStore::open_with_config(temp.path(), config).unwrap();

        store.store_ping(&test_ping(1)).unwrap();
        fs::write(store.ping_file(2), b"{ truncated").unwrap();

        let scan = store.scan().unwrap();
        assert_eq!(scan.pings.len(), 1);
        assert_eq!(scan.quarantined, 1);
        assert!(!store.ping_file(2).exists());
        assert!(temp.path().join(QUARANTINE_DIR).join("ping-2.json").exists());

        // The quarantined file no longer counts as stored.
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_prune_is_noop_at_capacity() {
        let temp = TempDir::new().unwrap();
        let store = PingStore::open(temp.path()).unwrap();

        for id in 1..=5 {
            store.store_ping(&test_ping(id)).unwrap();
        }

        let outcome = store.prune(5).unwrap();
        assert_eq!(outcome, PruneOutcome::default());
        assert_eq!(store.count().unwrap(), 5);
    }

    #[test]
    fn test_prune_removes_smallest_ids() {
        let temp = TempDir::new().unwrap();
        let store = PingStore::open(temp.path()).unwrap();

        // Insertion order deliberately scrambled; ID is the authority.
        for id in [9, 2, 7, 1, 8, 3, 10, 5, 4, 6] {
            store.store_ping(&test_ping(id)).unwrap();
        }

        let outcome = store.prune(4).unwrap();
        assert_eq!(outcome.removed, 6);
        assert_eq!(outcome.failed, 0);

        let mut remaining: Vec<u64> =
            store.get_all_pings().unwrap().iter().map(|p| p.id).collect();
        remaining.sort_unstable();
        assert_eq!(remaining, vec![7, 8, 9, 10]);
    }

    #[test]
    fn test_prune_ignores_foreign_files() {
        let temp = TempDir::new().unwrap();
        let store = PingStore::open(temp.path()).unwrap();

        store.store_ping(&test_ping(1)).unwrap();
        store.store_ping(&test_ping(2)).unwrap();
        fs::write(temp.path().join("notes.txt"), b"keep me").unwrap();

        store.prune(1).unwrap();

        assert!(!store.ping_file(1).exists());
        assert!(store.ping_file(2).exists());
        assert!(temp.path().join("notes.txt").exists());
    }

    #[test]
    fn test_prune_to_capacity_uses_config() {
        let temp = TempDir::new().unwrap();
        let config = StoreConfig {
            max_ping_count: 3,
            ..StoreConfig::default()
        };
        let store = PingStore::open_with_config(temp.path(), config).unwrap();

        for id in 1..=5 {
            store.store_ping(&test_ping(id)).unwrap();
        }

        let outcome = store.prune_to_capacity().unwrap();
        assert_eq!(outcome.removed, 2);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_acknowledge_removes_exactly_the_given_ids() {
        let temp = TempDir::new().unwrap();
        let store = PingStore::open(temp.path()).unwrap();

        for id in 1..=10 {
            store.store_ping(&test_ping(id)).unwrap();
        }

        let succeeded: HashSet<u64> = [2, 4, 6, 8, 10].into_iter().collect();
        let outcome = store.acknowledge(&succeeded);
        assert_eq!(outcome.removed, 5);
        assert_eq!(outcome.failed, 0);

        let mut remaining: Vec<u64> =
            store.get_all_pings().unwrap().iter().map(|p| p.id).collect();
        remaining.sort_unstable();
        assert_eq!(remaining, vec![1, 3, 5, 7, 9]);
    }

    #[test]
    fn test_acknowledge_unknown_id_is_benign() {
        let temp = TempDir::new().unwrap();
        let store = PingStore::open(temp.path()).unwrap();

        store.store_ping(&test_ping(1)).unwrap();

        let succeeded: HashSet<u64> = [999].into_iter().collect();
        let outcome = store.acknowledge(&succeeded);
        assert_eq!(outcome.removed, 0);
        assert_eq!(outcome.already_absent, 1);
        assert_eq!(outcome.failed, 0);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_remove_if_present_absent_is_success() {
        let temp = TempDir::new().unwrap();
        let result = remove_if_present(&temp.path().join("missing")).unwrap();
        assert!(!result);
    }
}
