//! Error types for GeoIndex
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using GeoError
pub type Result<T> = std::result::Result<T, GeoError>;

/// Unified error type for GeoIndex operations
#[derive(Debug, Error)]
pub enum GeoError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source file {path} unavailable: {source}")]
    SourceUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Input / Codec Errors
    // -------------------------------------------------------------------------
    #[error("Malformed row {line:?}: {reason}")]
    MalformedRow { line: String, reason: String },

    #[error("Codec error: {0}")]
    Codec(String),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("WAL write failed: {0}")]
    WalWrite(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("Container {name} exists with a different schema (expected {expected}, found {found})")]
    SchemaMismatch {
        name: String,
        expected: String,
        found: String,
    },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

impl GeoError {
    /// Shorthand for a row that could not be turned into a record
    pub fn malformed(line: &str, reason: impl Into<String>) -> Self {
        GeoError::MalformedRow {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}
