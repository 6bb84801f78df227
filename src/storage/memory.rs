//! In-process partition store

use crate::error::Result;

use super::{ContainerDef, KeyspaceTables, PartitionStore, SliceRange, StoredEntry, WriteBatch};

/// A `PartitionStore` that lives only as long as the process
#[derive(Default)]
pub struct MemoryStore {
    tables: KeyspaceTables,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PartitionStore for MemoryStore {
    fn ensure_container(&self, def: &ContainerDef) -> Result<bool> {
        self.tables.define(def)
    }

    fn describe_container(&self, name: &str) -> Option<ContainerDef> {
        self.tables.definition(name)
    }

    fn execute_batch(&self, batch: WriteBatch) -> Result<usize> {
        self.tables.apply(&batch)
    }

    fn scan(&self, container: &str, partition: &str, range: &SliceRange) -> Result<Vec<StoredEntry>> {
        Ok(self.tables.scan(container, partition, range))
    }

    fn truncate(&self, container: &str) -> Result<()> {
        self.tables.truncate(container)
    }

    fn partition_len(&self, container: &str, partition: &str) -> usize {
        self.tables.partition_len(container, partition)
    }
}
