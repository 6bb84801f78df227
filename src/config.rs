//! Configuration for GeoIndex
//!
//! Centralized configuration with sensible defaults. Values can come from the
//! builder, from a TOML file (`Config::from_toml_file`), or both: the file is
//! applied over the defaults and the caller overrides what it needs afterwards.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GeoError, Result};

/// Where the sorted partition store lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// In-process store; nothing survives the process
    Memory,

    /// Durable store rooted at a directory
    ///   {dir}/
    ///     └── {keyspace}/
    ///           └── wal.log
    Directory(PathBuf),
}

impl FromStr for Endpoint {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(GeoError::Config("endpoint must not be empty".to_string()));
        }
        match s {
            "memory" | "mem" | "mem:" => Ok(Endpoint::Memory),
            path => Ok(Endpoint::Directory(PathBuf::from(
                path.strip_prefix("file://").unwrap_or(path),
            ))),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Memory => write!(f, "memory"),
            Endpoint::Directory(path) => write!(f, "{}", path.display()),
        }
    }
}

/// What to do with a row whose start/end number does not parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericPolicy {
    /// Skip the row and report it; the rest of its batch is still written
    #[default]
    Reject,

    /// Substitute 0 for the unparsable number and keep going
    ZeroFill,
}

/// WAL sync policy: how often the write-ahead log is fsynced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
    /// fsync after every appended operation
    Always,

    /// fsync after N appended operations
    EveryN { count: usize },
}

/// Main configuration for a GeoIndex instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Store Configuration
    // -------------------------------------------------------------------------
    /// Where the storage engine lives
    pub endpoint: Endpoint,

    /// Logical namespace holding the index container
    pub keyspace: String,

    /// Name of the index container
    pub container: String,

    /// The single partition key every entry is written under
    pub partition_key: String,

    /// WAL sync policy (directory endpoints only)
    pub sync_policy: SyncPolicy,

    // -------------------------------------------------------------------------
    // Load Configuration
    // -------------------------------------------------------------------------
    /// Location of the input table
    pub source_file: PathBuf,

    /// Rows per worker submission
    pub batch_size: usize,

    /// Load concurrency
    pub worker_count: usize,

    /// Handling of unparsable numeric fields
    pub numeric_policy: NumericPolicy,

    // -------------------------------------------------------------------------
    // Query Configuration
    // -------------------------------------------------------------------------
    /// Entries requested per scan call
    pub page_size: usize,

    /// First start number a containment lookup scans from
    pub scan_anchor: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::Directory(PathBuf::from("./geoindex_data")),
            keyspace: "CookbookKeyspace".to_string(),
            container: "CompositeSingleRowIndex".to_string(),
            partition_key: "ALL".to_string(),
            sync_policy: SyncPolicy::EveryN { count: 16 },
            source_file: PathBuf::from("data/GeoIPCountryWhois.csv"),
            batch_size: 250,
            worker_count: 5,
            numeric_policy: NumericPolicy::Reject,
            page_size: 100,
            scan_anchor: 0,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load a TOML config file and apply it over the defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GeoError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            GeoError::Config(msg) => GeoError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Parse TOML config text and apply it over the defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: FileConfig =
            toml::from_str(content).map_err(|e| GeoError::Config(e.to_string()))?;
        let config = file.apply(Config::default())?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the loader and query iterator cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(GeoError::Config("batch_size must be at least 1".to_string()));
        }
        if self.worker_count == 0 {
            return Err(GeoError::Config("worker_count must be at least 1".to_string()));
        }
        if self.page_size == 0 {
            return Err(GeoError::Config("page_size must be at least 1".to_string()));
        }
        if self.keyspace.is_empty() || self.container.is_empty() {
            return Err(GeoError::Config(
                "keyspace and container names must not be empty".to_string(),
            ));
        }
        if let SyncPolicy::EveryN { count: 0 } = self.sync_policy {
            return Err(GeoError::Config("wal sync count must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// On-disk shape of the config file; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    endpoint: Option<String>,
    keyspace: Option<String>,
    container: Option<String>,
    partition_key: Option<String>,
    wal_sync: Option<SyncPolicy>,
    source_file: Option<PathBuf>,
    batch_size: Option<usize>,
    worker_count: Option<usize>,
    numeric_policy: Option<NumericPolicy>,
    page_size: Option<usize>,
    scan_anchor: Option<i64>,
}

impl FileConfig {
    fn apply(self, mut config: Config) -> Result<Config> {
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint.parse()?;
        }
        if let Some(keyspace) = self.keyspace {
            config.keyspace = keyspace;
        }
        if let Some(container) = self.container {
            config.container = container;
        }
        if let Some(partition_key) = self.partition_key {
            config.partition_key = partition_key;
        }
        if let Some(sync) = self.wal_sync {
            config.sync_policy = sync;
        }
        if let Some(source_file) = self.source_file {
            config.source_file = source_file;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(worker_count) = self.worker_count {
            config.worker_count = worker_count;
        }
        if let Some(policy) = self.numeric_policy {
            config.numeric_policy = policy;
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(anchor) = self.scan_anchor {
            config.scan_anchor = anchor;
        }
        Ok(config)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from an existing config (e.g. one loaded from a file)
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Set the store endpoint
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.config.endpoint = endpoint;
        self
    }

    /// Use a durable store rooted at `path`
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.endpoint = Endpoint::Directory(path.into());
        self
    }

    /// Set the keyspace name
    pub fn keyspace(mut self, name: impl Into<String>) -> Self {
        self.config.keyspace = name.into();
        self
    }

    /// Set the index container name
    pub fn container(mut self, name: impl Into<String>) -> Self {
        self.config.container = name.into();
        self
    }

    /// Set the partition key all entries share
    pub fn partition_key(mut self, key: impl Into<String>) -> Self {
        self.config.partition_key = key.into();
        self
    }

    /// Set the WAL sync policy
    pub fn sync_policy(mut self, policy: SyncPolicy) -> Self {
        self.config.sync_policy = policy;
        self
    }

    /// Set the source file path
    pub fn source_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source_file = path.into();
        self
    }

    /// Set rows per batch
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the number of load workers
    pub fn worker_count(mut self, count: usize) -> Self {
        self.config.worker_count = count;
        self
    }

    /// Set the numeric parse policy
    pub fn numeric_policy(mut self, policy: NumericPolicy) -> Self {
        self.config.numeric_policy = policy;
        self
    }

    /// Set entries per scan page
    pub fn page_size(mut self, size: usize) -> Self {
        self.config.page_size = size;
        self
    }

    /// Set the containment lookup anchor
    pub fn scan_anchor(mut self, anchor: i64) -> Self {
        self.config.scan_anchor = anchor;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

