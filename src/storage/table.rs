//! Sorted partition tables
//!
//! BTreeMap-based tables behind one RwLock per keyspace: scans take the read
//! lock, a whole batch is applied under one write lock.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crate::error::{GeoError, Result};

use super::{ContainerDef, SliceRange, StoredEntry, WriteBatch};

/// Sorted entries of one partition
type Partition = BTreeMap<Vec<u8>, Vec<u8>>;

/// A container: its definition and its partitions
struct ContainerTable {
    def: ContainerDef,
    partitions: HashMap<String, Partition>,
}

/// In-memory state of every container in a keyspace
#[derive(Default)]
pub struct KeyspaceTables {
    containers: RwLock<HashMap<String, ContainerTable>>,
}

impl KeyspaceTables {
    /// Create an empty keyspace
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a definition against what exists without changing anything
    ///
    /// Returns `true` when the container is missing and would be created.
    pub fn check_definition(&self, def: &ContainerDef) -> Result<bool> {
        match self.containers.read().get(&def.name) {
            None => Ok(true),
            Some(existing) if existing.def == *def => Ok(false),
            Some(existing) => Err(GeoError::SchemaMismatch {
                name: def.name.clone(),
                expected: def.signature(),
                found: existing.def.signature(),
            }),
        }
    }

    /// Create a container if absent (write lock)
    pub fn define(&self, def: &ContainerDef) -> Result<bool> {
        let mut containers = self.containers.write();
        match containers.get(&def.name) {
            Some(existing) if existing.def == *def => Ok(false),
            Some(existing) => Err(GeoError::SchemaMismatch {
                name: def.name.clone(),
                expected: def.signature(),
                found: existing.def.signature(),
            }),
            None => {
                containers.insert(
                    def.name.clone(),
                    ContainerTable {
                        def: def.clone(),
                        partitions: HashMap::new(),
                    },
                );
                Ok(true)
            }
        }
    }

    /// Definition of a container, if it exists
    pub fn definition(&self, name: &str) -> Option<ContainerDef> {
        self.containers.read().get(name).map(|c| c.def.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.containers.read().contains_key(name)
    }

    /// Apply a batch under one write lock
    pub fn apply(&self, batch: &WriteBatch) -> Result<usize> {
        let mut containers = self.containers.write();
        let table = containers
            .get_mut(&batch.container)
            .ok_or_else(|| GeoError::ContainerNotFound(batch.container.clone()))?;

        for mutation in &batch.mutations {
            table
                .partitions
                .entry(mutation.partition.clone())
                .or_default()
                .insert(mutation.key.clone(), mutation.value.clone());
        }

        Ok(batch.len())
    }

    /// Read up to `range.limit` entries of a partition (read lock)
    pub fn scan(&self, container: &str, partition: &str, range: &SliceRange) -> Vec<StoredEntry> {
        if range.limit == 0 || range.is_empty() {
            return Vec::new();
        }

        let containers = self.containers.read();
        let Some(entries) = containers
            .get(container)
            .and_then(|c| c.partitions.get(partition))
        else {
            return Vec::new();
        };

        entries
            .range((range.start.clone(), range.end.clone()))
            .take(range.limit)
            .map(|(key, value)| StoredEntry {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }

    /// Drop all partitions of a container
    pub fn truncate(&self, container: &str) -> Result<()> {
        let mut containers = self.containers.write();
        let table = containers
            .get_mut(container)
            .ok_or_else(|| GeoError::ContainerNotFound(container.to_string()))?;
        table.partitions.clear();
        Ok(())
    }

    /// Entry count of one partition (0 if missing)
    pub fn partition_len(&self, container: &str, partition: &str) -> usize {
        self.containers
            .read()
            .get(container)
            .and_then(|c| c.partitions.get(partition))
            .map_or(0, |p| p.len())
    }

    /// Rebuild every container's contents as one batch per partition
    ///
    /// Used to rewrite a WAL down to its current state.
    pub fn snapshot(&self) -> Vec<(ContainerDef, Vec<WriteBatch>)> {
        let containers = self.containers.read();
        let mut names: Vec<&String> = containers.keys().collect();
        names.sort();

        names
            .into_iter()
            .filter_map(|name| containers.get(name))
            .map(|table| {
                let mut partition_keys: Vec<&String> = table.partitions.keys().collect();
                partition_keys.sort();

                let batches = partition_keys
                    .into_iter()
                    .filter_map(|pk| table.partitions.get(pk).map(|p| (pk, p)))
                    .map(|(pk, entries)| {
                        let mut batch = WriteBatch::with_capacity(&table.def.name, entries.len());
                        for (key, value) in entries {
                            batch.insert(pk, key.clone(), value.clone());
                        }
                        batch
                    })
                    .collect();

                (table.def.clone(), batches)
            })
            .collect()
    }
}
