//! GeoIndex handle
//!
//! Owns the configuration and the store and ties bootstrap, loading and
//! lookups together. Construct one per process (or per test) and `close` it
//! at shutdown.

use std::path::Path;
use std::sync::Arc;

use crate::config::{Config, Endpoint};
use crate::error::Result;
use crate::loader::{BulkLoader, LoadReport};
use crate::query::{IndexEntry, QueryMode, RangeQuery};
use crate::schema;
use crate::storage::{DiskStore, MemoryStore, PartitionStore};

/// Client handle for one range index
pub struct GeoIndex {
    config: Config,
    store: Arc<dyn PartitionStore>,
}

impl GeoIndex {
    /// Open the store named by `config.endpoint`
    ///
    /// The index container is not created here; call `bootstrap`.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let store: Arc<dyn PartitionStore> = match &config.endpoint {
            Endpoint::Memory => Arc::new(MemoryStore::new()),
            Endpoint::Directory(root) => {
                Arc::new(DiskStore::open(root, &config.keyspace, config.sync_policy)?)
            }
        };

        tracing::info!(
            "Opened keyspace {} at {}",
            config.keyspace,
            config.endpoint
        );
        Ok(Self { config, store })
    }

    /// Wrap an already open store
    pub fn with_store(config: Config, store: Arc<dyn PartitionStore>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn PartitionStore> {
        &self.store
    }

    /// Create the index container if it is missing
    pub fn bootstrap(&self) -> Result<bool> {
        schema::ensure_index(self.store.as_ref(), &self.config.container)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    fn loader(&self) -> BulkLoader<'_> {
        BulkLoader::from_config(self.store.as_ref(), &self.config)
    }

    /// Load the configured source file
    pub fn load_source(&self) -> Result<LoadReport> {
        self.load_file(&self.config.source_file)
    }

    /// Load a source file with the configured batch size and worker count
    pub fn load_file(&self, path: &Path) -> Result<LoadReport> {
        self.loader()
            .load_file(path, self.config.batch_size, self.config.worker_count)
    }

    /// Load rows already in memory
    pub fn load_lines<I, S>(&self, lines: I) -> Result<LoadReport>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.loader()
            .load(lines, self.config.batch_size, self.config.worker_count)
    }

    /// Drop every entry in the index container
    pub fn truncate(&self) -> Result<()> {
        tracing::info!("Truncating container {}", self.config.container);
        self.store.truncate(&self.config.container)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Lazily paged query for `lookup`
    pub fn query(&self, lookup: i64, mode: QueryMode) -> RangeQuery<'_> {
        RangeQuery::new(
            self.store.as_ref(),
            &self.config.container,
            &self.config.partition_key,
            lookup,
            mode,
            self.config.page_size,
        )
    }

    /// The range containing `value`, if any
    ///
    /// Walks the ranges starting between the configured anchor and `value`
    /// and stops at the first one whose end reaches `value`.
    pub fn lookup(&self, value: i64) -> Result<Option<IndexEntry>> {
        let mode = QueryMode::StartInclusive {
            anchor: self.config.scan_anchor,
        };
        let mut query = self.query(value, mode);
        let found = query.find_covering(value)?;

        tracing::debug!(
            "Lookup {}: {} after {} pages",
            value,
            if found.is_some() { "found" } else { "not found" },
            query.pages_fetched()
        );
        Ok(found)
    }

    /// Entries starting at or after `value`, ascending
    pub fn scan_from(&self, value: i64) -> RangeQuery<'_> {
        self.query(value, QueryMode::StartAtLeast)
    }

    /// Entries in the index partition
    pub fn len(&self) -> usize {
        self.store
            .partition_len(&self.config.container, &self.config.partition_key)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Shrink the store's log down to the current contents
    pub fn compact(&self) -> Result<()> {
        self.store.compact()
    }

    /// Make all writes durable and release the handle
    pub fn close(self) -> Result<()> {
        self.store.sync()?;
        tracing::info!("Closed keyspace {}", self.config.keyspace);
        Ok(())
    }
}
