//! # GeoIndex
//!
//! An IP-range → country index built on a single sorted partition:
//! - Composite `(start, end)` keys whose byte order equals numeric order
//! - Parallel bulk loading in fixed-size batches
//! - Containment lookups and range scans through a lazily paged iterator
//! - In-memory or WAL-backed durable storage
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐        ┌──────────────────────────────┐
//! │  CSV source  │──────► │ BulkLoader (worker pool)     │
//! └──────────────┘        │  RangeRecord → CompositeKey  │
//!                         │              → CompositeValue│
//!                         └──────────────┬───────────────┘
//!                                        │ WriteBatch
//!                                        ▼
//!                         ┌──────────────────────────────┐
//!                         │ PartitionStore               │
//!                         │  container / "ALL" / sorted  │
//!                         │  MemoryStore | DiskStore+WAL │
//!                         └──────────────┬───────────────┘
//!                                        │ scan(page)
//!                                        ▼
//!                         ┌──────────────────────────────┐
//!  lookup value ────────► │ RangeQuery (paged iterator)  │
//!                         └──────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod wal;
pub mod storage;
pub mod schema;
pub mod loader;
pub mod query;
pub mod index;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{GeoError, Result};
pub use config::{Config, Endpoint, NumericPolicy, SyncPolicy};
pub use codec::{CompositeKey, CompositeValue, Equality, QueryBound, RangeRecord};
pub use index::GeoIndex;
pub use loader::{BatchOutcome, BulkLoader, LoadReport};
pub use query::{IndexEntry, QueryMode, RangeQuery};
pub use schema::IndexSchema;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of GeoIndex
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
