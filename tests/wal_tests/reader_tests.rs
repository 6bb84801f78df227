//! Tests for WAL Reader
//!
//! These tests verify:
//! - Reading entries from a WAL file
//! - Iterator functionality
//! - Partial write handling
//! - Empty file handling

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use geoindex::wal::{Operation, WalEntry, WalReader};
use geoindex::GeoError;
use tempfile::TempDir;

use super::{batch_op, define_op, truncate_op};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn write_entries_to_wal(path: &Path, entries: &[WalEntry]) {
    let mut file = File::create(path).unwrap();
    for entry in entries {
        let bytes = entry.serialize().unwrap();
        file.write_all(&bytes).unwrap();
    }
    file.sync_all().unwrap();
}

// =============================================================================
// Basic Reading Tests
// =============================================================================

#[test]
fn test_read_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();

    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), 0);
}

#[test]
fn test_read_multiple_entries() {
    let (_temp, wal_path) = setup_temp_wal();

    let entries = vec![
        WalEntry::new(1, define_op("ranges")),
        WalEntry::new(2, batch_op("a", 3)),
        WalEntry::new(3, truncate_op("ranges")),
        WalEntry::new(4, batch_op("b", 1)),
    ];

    write_entries_to_wal(&wal_path, &entries);

    let mut reader = WalReader::open(&wal_path).unwrap();

    for (i, original) in entries.iter().enumerate() {
        let entry = reader.next_entry().unwrap().unwrap();
        assert_eq!(entry.lsn, original.lsn, "Entry {} LSN mismatch", i);
        assert_eq!(entry.operation, original.operation, "Entry {} operation mismatch", i);
    }

    // Should reach EOF
    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), reader.file_len());
}

// =============================================================================
// Iterator Tests
// =============================================================================

#[test]
fn test_iterator_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let reader = WalReader::open(&wal_path).unwrap();

    assert_eq!(reader.entries().count(), 0);
}

#[test]
fn test_iterator_multiple_entries() {
    let (_temp, wal_path) = setup_temp_wal();

    let original_entries = vec![
        WalEntry::new(1, define_op("ranges")),
        WalEntry::new(2, batch_op("a", 2)),
        WalEntry::new(3, batch_op("b", 2)),
    ];

    write_entries_to_wal(&wal_path, &original_entries);

    let reader = WalReader::open(&wal_path).unwrap();
    let read_entries: Vec<_> = reader.entries().map(|r| r.unwrap()).collect();

    assert_eq!(read_entries.len(), 3);
    for (read, original) in read_entries.iter().zip(&original_entries) {
        assert_eq!(read.lsn, original.lsn);
    }
}

#[test]
fn test_iterator_stops_after_corruption() {
    let (_temp, wal_path) = setup_temp_wal();

    let good = WalEntry::new(1, batch_op("good", 1)).serialize().unwrap();
    let mut bad = WalEntry::new(2, batch_op("bad", 1)).serialize().unwrap();
    let third = WalEntry::new(3, batch_op("third", 1)).serialize().unwrap();
    bad[20] ^= 0xFF;

    let mut file = File::create(&wal_path).unwrap();
    file.write_all(&good).unwrap();
    file.write_all(&bad).unwrap();
    file.write_all(&third).unwrap();
    file.sync_all().unwrap();

    let results: Vec<_> = WalReader::open(&wal_path).unwrap().entries().collect();

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(GeoError::WalCorruption(_))));
}

// =============================================================================
// Partial Write Tests
// =============================================================================

#[test]
fn test_partial_header() {
    let (_temp, wal_path) = setup_temp_wal();

    let bytes = WalEntry::new(1, batch_op("k", 1)).serialize().unwrap();

    let mut file = File::create(&wal_path).unwrap();
    file.write_all(&bytes).unwrap();

    // Write partial header (only 8 bytes)
    file.write_all(&[0u8; 8]).unwrap();
    file.sync_all().unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();

    assert!(reader.next_entry().unwrap().is_some());
    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), bytes.len() as u64);
}

#[test]
fn test_partial_data() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut bytes = WalEntry::new(1, batch_op("k", 1)).serialize().unwrap();

    let mut file = File::create(&wal_path).unwrap();
    file.write_all(&bytes).unwrap();

    // Complete header, truncated data
    let first_len = bytes.len() as u64;
    bytes.truncate(20);
    file.write_all(&bytes).unwrap();
    file.sync_all().unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();

    assert!(reader.next_entry().unwrap().is_some());
    assert!(reader.next_entry().unwrap().is_none());
    // A second call must not read into the torn entry
    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), first_len);
}

// =============================================================================
// Edge Cases
// =============================================================================

#[test]
fn test_truncate_operation() {
    let (_temp, wal_path) = setup_temp_wal();

    write_entries_to_wal(&wal_path, &[WalEntry::new(5, truncate_op("ranges"))]);

    let mut reader = WalReader::open(&wal_path).unwrap();
    let read_entry = reader.next_entry().unwrap().unwrap();

    assert_eq!(read_entry.lsn, 5);
    match read_entry.operation {
        Operation::Truncate { container } => assert_eq!(container, "ranges"),
        other => panic!("Expected Truncate operation, got {:?}", other),
    }
}
