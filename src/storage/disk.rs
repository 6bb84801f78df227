//! Durable partition store
//!
//! One directory per keyspace holding a single WAL. The sorted tables live in
//! memory and are rebuilt from the WAL on open.
//!
//! ## Write Path
//! 1. Validate against the in-memory tables (missing container, schema clash)
//! 2. Append the operation to the WAL
//! 3. Apply it to the tables
//!
//! Steps 2 and 3 run under the WAL mutex, so tables see operations in LSN
//! order and a batch is visible all at once.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::SyncPolicy;
use crate::error::{GeoError, Result};
use crate::wal::{Operation, WalRecovery, WalWriter};

use super::{ContainerDef, KeyspaceTables, PartitionStore, SliceRange, StoredEntry, WriteBatch};

/// A `PartitionStore` persisted through a write-ahead log
pub struct DiskStore {
    /// Keyspace directory
    dir: PathBuf,

    /// Path of the WAL inside `dir`
    wal_path: PathBuf,

    sync_policy: SyncPolicy,

    /// Write-ahead log (exclusive access for appends)
    wal: Mutex<WalWriter>,

    /// Sorted tables rebuilt from the WAL
    tables: KeyspaceTables,
}

impl DiskStore {
    const WAL_FILENAME: &'static str = "wal.log";
    const COMPACT_FILENAME: &'static str = "wal.log.compact";

    /// Open or create the store for `keyspace` under `root`
    ///
    /// On startup:
    /// 1. Create the keyspace directory
    /// 2. Recover the WAL (cutting any torn tail)
    /// 3. Replay every entry into the tables
    pub fn open(root: &Path, keyspace: &str, sync_policy: SyncPolicy) -> Result<Self> {
        let dir = root.join(keyspace);
        fs::create_dir_all(&dir)?;
        let wal_path = dir.join(Self::WAL_FILENAME);

        let tables = KeyspaceTables::new();
        let mut next_lsn = 1;

        if wal_path.exists() {
            let (entries, result) = WalRecovery::recover(&wal_path)?;

            if result.entries_recovered > 0 || result.entries_corrupted > 0 {
                tracing::debug!(
                    "WAL recovery for keyspace {}: {} entries recovered, {} corrupted, last_lsn={}",
                    keyspace,
                    result.entries_recovered,
                    result.entries_corrupted,
                    result.last_lsn
                );
            }

            for entry in &entries {
                Self::apply_logged(&tables, &entry.operation)?;
            }
            next_lsn = result.last_lsn + 1;
        }

        // Recovery above already cut any torn tail
        let wal = WalWriter::resume(&wal_path, sync_policy, next_lsn)?;

        Ok(Self {
            dir,
            wal_path,
            sync_policy,
            wal: Mutex::new(wal),
            tables,
        })
    }

    /// Apply an operation that is already in the WAL
    fn apply_logged(tables: &KeyspaceTables, operation: &Operation) -> Result<usize> {
        match operation {
            Operation::DefineContainer(def) => tables.define(def).map(usize::from),
            Operation::ApplyBatch(batch) => tables.apply(batch),
            Operation::Truncate { container } => tables.truncate(container).map(|_| 0),
        }
    }

    /// Keyspace directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the write-ahead log
    pub fn wal_path(&self) -> &Path {
        &self.wal_path
    }

    /// LSN the next logged operation will receive
    pub fn next_lsn(&self) -> u64 {
        self.wal.lock().current_lsn()
    }
}

impl PartitionStore for DiskStore {
    fn ensure_container(&self, def: &ContainerDef) -> Result<bool> {
        let mut wal = self.wal.lock();
        if !self.tables.check_definition(def)? {
            return Ok(false);
        }
        wal.append_ref(&Operation::DefineContainer(def.clone()))?;
        self.tables.define(def)
    }

    fn describe_container(&self, name: &str) -> Option<ContainerDef> {
        self.tables.definition(name)
    }

    fn execute_batch(&self, batch: WriteBatch) -> Result<usize> {
        if !self.tables.contains(&batch.container) {
            return Err(GeoError::ContainerNotFound(batch.container));
        }

        let mut wal = self.wal.lock();
        let operation = Operation::ApplyBatch(batch);
        wal.append_ref(&operation)?;
        Self::apply_logged(&self.tables, &operation)
    }

    fn scan(&self, container: &str, partition: &str, range: &SliceRange) -> Result<Vec<StoredEntry>> {
        Ok(self.tables.scan(container, partition, range))
    }

    fn truncate(&self, container: &str) -> Result<()> {
        if !self.tables.contains(container) {
            return Err(GeoError::ContainerNotFound(container.to_string()));
        }

        let mut wal = self.wal.lock();
        let lsn = wal.append(Operation::Truncate {
            container: container.to_string(),
        })?;
        tracing::debug!("Truncated container {} at lsn {}", container, lsn);
        self.tables.truncate(container)
    }

    fn partition_len(&self, container: &str, partition: &str) -> usize {
        self.tables.partition_len(container, partition)
    }

    fn sync(&self) -> Result<()> {
        self.wal.lock().sync()
    }

    /// Rewrite the WAL so it holds only the current state
    ///
    /// The replacement is built next to the live log and renamed over it;
    /// LSNs restart at 1.
    fn compact(&self) -> Result<()> {
        let mut wal = self.wal.lock();
        wal.sync()?;

        let compact_path = self.dir.join(Self::COMPACT_FILENAME);
        let mut entries = 0usize;
        {
            let mut writer =
                WalWriter::create(&compact_path, SyncPolicy::EveryN { count: usize::MAX }, 1)?;
            for (def, batches) in self.tables.snapshot() {
                writer.append(Operation::DefineContainer(def))?;
                entries += 1;
                for batch in batches {
                    writer.append(Operation::ApplyBatch(batch))?;
                    entries += 1;
                }
            }
            writer.sync()?;
        }

        fs::rename(&compact_path, &self.wal_path)?;
        *wal = WalWriter::resume(&self.wal_path, self.sync_policy, entries as u64 + 1)?;

        tracing::info!(
            "Compacted WAL {} to {} entries",
            self.wal_path.display(),
            entries
        );
        Ok(())
    }
}

impl Drop for DiskStore {
    fn drop(&mut self) {
        if let Err(e) = self.wal.get_mut().sync() {
            tracing::warn!("Failed to sync WAL {} on drop: {}", self.wal_path.display(), e);
        }
    }
}
