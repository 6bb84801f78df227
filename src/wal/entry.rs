//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their framing.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{GeoError, Result};
use crate::storage::{ContainerDef, WriteBatch};

/// Frame header: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Upper bound on one entry's data; larger lengths mean a garbage header
pub(crate) const MAX_ENTRY_SIZE: u32 = 256 * 1024 * 1024;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The store operation
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Store operations that are logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Create a container
    DefineContainer(ContainerDef),

    /// Apply a write batch
    ApplyBatch(WriteBatch),

    /// Drop all data in a container
    Truncate { container: String },
}

/// Borrowed twin of `WalEntry`; serializes to the same bytes
#[derive(Serialize)]
struct WalEntryRef<'a> {
    lsn: u64,
    operation: &'a Operation,
    timestamp: u64,
}

impl WalEntry {
    /// Create an entry stamped with the current time
    pub fn new(lsn: u64, operation: Operation) -> Self {
        Self {
            lsn,
            operation,
            timestamp: now_millis(),
        }
    }

    /// Encode as a framed entry: header + data
    pub fn serialize(&self) -> Result<Vec<u8>> {
        encode_frame(self.lsn, &self.operation, self.timestamp)
    }

    /// Decode a framed entry, verifying length and CRC
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(GeoError::WalCorruption(format!(
                "entry header needs {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let (lsn, crc, len) = parse_header(&bytes[..HEADER_SIZE]);
        let len = len as usize;

        if bytes.len() < HEADER_SIZE + len {
            return Err(GeoError::WalCorruption(format!(
                "entry {} truncated: {} of {} data bytes",
                lsn,
                bytes.len() - HEADER_SIZE,
                len
            )));
        }

        Self::from_parts(lsn, crc, &bytes[HEADER_SIZE..HEADER_SIZE + len])
    }

    /// Decode the data section once the header has been read
    pub(crate) fn from_parts(lsn: u64, crc: u32, data: &[u8]) -> Result<Self> {
        let actual = checksum(lsn, data);
        if actual != crc {
            return Err(GeoError::WalCorruption(format!(
                "CRC mismatch at lsn {}: stored {:08x}, computed {:08x}",
                lsn, crc, actual
            )));
        }

        let entry: WalEntry = bincode::deserialize(data)
            .map_err(|e| GeoError::WalCorruption(format!("undecodable entry {}: {}", lsn, e)))?;

        if entry.lsn != lsn {
            return Err(GeoError::WalCorruption(format!(
                "header lsn {} does not match entry lsn {}",
                lsn, entry.lsn
            )));
        }

        Ok(entry)
    }

    /// Size of the framed entry in bytes
    pub fn serialized_size(&self) -> Result<usize> {
        let data_len = bincode::serialized_size(self)
            .map_err(|e| GeoError::Serialization(e.to_string()))?;
        Ok(HEADER_SIZE + data_len as usize)
    }

    /// CRC the frame header would carry
    pub fn compute_crc(&self) -> Result<u32> {
        let data = bincode::serialize(self).map_err(|e| GeoError::Serialization(e.to_string()))?;
        Ok(checksum(self.lsn, &data))
    }
}

/// Frame an operation without taking ownership of it
pub(crate) fn encode_frame(lsn: u64, operation: &Operation, timestamp: u64) -> Result<Vec<u8>> {
    let view = WalEntryRef {
        lsn,
        operation,
        timestamp,
    };
    let data = bincode::serialize(&view).map_err(|e| GeoError::Serialization(e.to_string()))?;

    let len = u32::try_from(data.len())
        .ok()
        .filter(|len| *len <= MAX_ENTRY_SIZE)
        .ok_or_else(|| {
            GeoError::WalWrite(format!(
                "entry of {} bytes exceeds the {} byte limit",
                data.len(),
                MAX_ENTRY_SIZE
            ))
        })?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + data.len());
    frame.extend_from_slice(&lsn.to_le_bytes());
    frame.extend_from_slice(&checksum(lsn, &data).to_le_bytes());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&data);
    Ok(frame)
}

/// Split a header into (lsn, crc, len)
pub(crate) fn parse_header(header: &[u8]) -> (u64, u32, u32) {
    let mut lsn = [0u8; 8];
    let mut crc = [0u8; 4];
    let mut len = [0u8; 4];
    lsn.copy_from_slice(&header[0..8]);
    crc.copy_from_slice(&header[8..12]);
    len.copy_from_slice(&header[12..16]);
    (
        u64::from_le_bytes(lsn),
        u32::from_le_bytes(crc),
        u32::from_le_bytes(len),
    )
}

fn checksum(lsn: u64, data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&lsn.to_le_bytes());
    hasher.update(&(data.len() as u32).to_le_bytes());
    hasher.update(data);
    hasher.finalize()
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
