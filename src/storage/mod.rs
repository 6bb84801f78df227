//! Storage Module
//!
//! The sorted partition index the loader writes into and the query iterator
//! scans.
//!
//! ## Responsibilities
//! - Keep every entry of a partition in byte order of its encoded key
//! - Apply a write batch as one unit
//! - Answer bounded, limited slice scans within one partition
//! - Idempotent container bootstrap
//!
//! ## Layout
//! ```text
//! keyspace
//!  └── container  (comparator / validators fixed at creation)
//!       └── partition key ("ALL")
//!            └── key bytes → value bytes   (sorted)
//! ```
//!
//! Two implementations share `KeyspaceTables` for the sorted data:
//! `MemoryStore` keeps nothing beyond the process, `DiskStore` logs every
//! schema change and batch to a WAL and replays it on open.

mod disk;
mod memory;
mod table;

use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use disk::DiskStore;
pub use memory::MemoryStore;
pub use table::KeyspaceTables;

// =============================================================================
// Container Definitions
// =============================================================================

/// Schema of one container: how keys are validated and compared, and how
/// values are validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDef {
    pub name: String,
    pub key_validation: String,
    pub comparator: String,
    pub value_validation: String,
}

impl ContainerDef {
    /// Short description used in mismatch errors
    pub fn signature(&self) -> String {
        format!(
            "key={} comparator={} value={}",
            self.key_validation, self.comparator, self.value_validation
        )
    }
}

// =============================================================================
// Writes
// =============================================================================

/// One insertion inside a write batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    pub partition: String,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// A group of insertions applied to one container as a single unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteBatch {
    pub container: String,
    pub mutations: Vec<Mutation>,
}

impl WriteBatch {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            mutations: Vec::new(),
        }
    }

    pub fn with_capacity(container: impl Into<String>, capacity: usize) -> Self {
        Self {
            container: container.into(),
            mutations: Vec::with_capacity(capacity),
        }
    }

    /// Queue an insertion; later insertions of the same key win
    pub fn insert(&mut self, partition: &str, key: Vec<u8>, value: Vec<u8>) {
        self.mutations.push(Mutation {
            partition: partition.to_string(),
            key,
            value,
        });
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

// =============================================================================
// Reads
// =============================================================================

/// Bounds and page size for one slice scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceRange {
    pub start: Bound<Vec<u8>>,
    pub end: Bound<Vec<u8>>,
    pub limit: usize,
}

impl SliceRange {
    pub fn new(start: Bound<Vec<u8>>, end: Bound<Vec<u8>>, limit: usize) -> Self {
        Self { start, end, limit }
    }

    /// The whole partition, at most `limit` entries
    pub fn all(limit: usize) -> Self {
        Self::new(Bound::Unbounded, Bound::Unbounded, limit)
    }

    /// True when no key can satisfy both bounds
    pub fn is_empty(&self) -> bool {
        match (&self.start, &self.end) {
            (Bound::Included(s), Bound::Included(e)) => s > e,
            (Bound::Included(s), Bound::Excluded(e))
            | (Bound::Excluded(s), Bound::Included(e))
            | (Bound::Excluded(s), Bound::Excluded(e)) => s >= e,
            _ => false,
        }
    }
}

/// A raw entry as stored: encoded key and encoded value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

// =============================================================================
// Store Trait
// =============================================================================

/// A store that keeps partitions sorted by key
///
/// All methods take `&self`; implementations do their own locking so that a
/// pool of load workers can share one store.
pub trait PartitionStore: Send + Sync {
    /// Create the container if it does not exist
    ///
    /// Returns `true` when the container was created, `false` when an
    /// identical definition was already present. A container with the same
    /// name but a different definition is `GeoError::SchemaMismatch`.
    fn ensure_container(&self, def: &ContainerDef) -> Result<bool>;

    /// Definition of an existing container
    fn describe_container(&self, name: &str) -> Option<ContainerDef>;

    /// Apply every mutation of the batch, or none of them
    ///
    /// Returns the number of mutations applied.
    fn execute_batch(&self, batch: WriteBatch) -> Result<usize>;

    /// Up to `range.limit` entries of one partition, ascending by key
    ///
    /// A missing container or partition yields an empty page.
    fn scan(&self, container: &str, partition: &str, range: &SliceRange) -> Result<Vec<StoredEntry>>;

    /// Drop all data in a container, keeping its definition
    fn truncate(&self, container: &str) -> Result<()>;

    /// Number of entries in one partition
    fn partition_len(&self, container: &str, partition: &str) -> usize;

    /// Make everything written so far durable
    fn sync(&self) -> Result<()> {
        Ok(())
    }

    /// Drop whatever history the store keeps beyond its current contents
    fn compact(&self) -> Result<()> {
        Ok(())
    }
}
