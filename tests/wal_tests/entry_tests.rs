//! Tests for WAL Entry serialization and deserialization
//!
//! These tests verify:
//! - Round-trip serialization for every operation type
//! - CRC32 corruption detection
//! - Edge cases (truncation, malformed data, large batches)

use geoindex::wal::{Operation, WalEntry, HEADER_SIZE};
use geoindex::GeoError;

use super::{batch_op, custom_def, define_op, truncate_op};

// =============================================================================
// Serialization Round-Trip Tests
// =============================================================================

#[test]
fn test_serialize_deserialize_define() {
    let entry = WalEntry::new(1, define_op("ranges"));

    let bytes = entry.serialize().unwrap();
    let recovered = WalEntry::deserialize(&bytes).unwrap();

    assert_eq!(entry.lsn, recovered.lsn);
    assert_eq!(entry.operation, recovered.operation);
    assert_eq!(entry.timestamp, recovered.timestamp);
}

#[test]
fn test_serialize_deserialize_batch() {
    let entry = WalEntry::new(42, batch_op("a", 25));

    let bytes = entry.serialize().unwrap();
    let recovered = WalEntry::deserialize(&bytes).unwrap();

    assert_eq!(entry, recovered);
}

#[test]
fn test_serialize_deserialize_truncate() {
    let entry = WalEntry::new(7, truncate_op("ranges"));

    let bytes = entry.serialize().unwrap();
    let recovered = WalEntry::deserialize(&bytes).unwrap();

    assert_eq!(entry, recovered);
}

#[test]
fn test_serialize_deserialize_empty_batch() {
    let entry = WalEntry::new(100, batch_op("empty", 0));

    let bytes = entry.serialize().unwrap();
    let recovered = WalEntry::deserialize(&bytes).unwrap();

    assert_eq!(entry, recovered);
}

#[test]
fn test_custom_definition_preserved() {
    let entry = WalEntry::new(3, Operation::DefineContainer(custom_def("other")));

    let bytes = entry.serialize().unwrap();
    let recovered = WalEntry::deserialize(&bytes).unwrap();

    match recovered.operation {
        Operation::DefineContainer(def) => {
            assert_eq!(def.name, "other");
            assert_eq!(def.comparator, "LongType");
        }
        other => panic!("Expected DefineContainer, got {:?}", other),
    }
}

// =============================================================================
// CRC Corruption Detection Tests
// =============================================================================

#[test]
fn test_crc_corruption_detected() {
    let entry = WalEntry::new(1, batch_op("k", 1));

    let mut bytes = entry.serialize().unwrap();

    // Corrupt a byte in the data section
    if let Some(byte) = bytes.last_mut() {
        *byte ^= 0xFF;
    }

    let result = WalEntry::deserialize(&bytes);
    assert!(matches!(result, Err(GeoError::WalCorruption(_))));
}

#[test]
fn test_crc_corruption_in_header_detected() {
    let entry = WalEntry::new(1, batch_op("k", 1));

    let mut bytes = entry.serialize().unwrap();

    // Corrupt the CRC bytes (bytes 8-11)
    bytes[8] ^= 0xFF;

    let result = WalEntry::deserialize(&bytes);
    assert!(matches!(result, Err(GeoError::WalCorruption(_))));
}

#[test]
fn test_lsn_in_header_covered_by_crc() {
    let entry = WalEntry::new(5, truncate_op("ranges"));
    let mut bytes = entry.serialize().unwrap();

    // Header LSN is little-endian in bytes 0-7
    bytes[0] = 6;

    assert!(WalEntry::deserialize(&bytes).is_err());
}

// =============================================================================
// Edge Case Tests
// =============================================================================

#[test]
fn test_truncated_entry() {
    let entry = WalEntry::new(1, truncate_op("ranges"));
    let bytes = entry.serialize().unwrap();

    let truncated = &bytes[..HEADER_SIZE + 2];
    let result = WalEntry::deserialize(truncated);

    assert!(matches!(result, Err(GeoError::WalCorruption(_))));
}

#[test]
fn test_header_too_small() {
    let bytes = [0u8; 10]; // Less than HEADER_SIZE
    let result = WalEntry::deserialize(&bytes);

    assert!(result.is_err());
}

#[test]
fn test_empty_buffer() {
    let bytes: [u8; 0] = [];
    let result = WalEntry::deserialize(&bytes);

    assert!(result.is_err());
}

#[test]
fn test_large_batch() {
    let entry = WalEntry::new(999, batch_op("big", 10_000));

    let bytes = entry.serialize().unwrap();
    let recovered = WalEntry::deserialize(&bytes).unwrap();

    match recovered.operation {
        Operation::ApplyBatch(batch) => assert_eq!(batch.len(), 10_000),
        other => panic!("Expected ApplyBatch, got {:?}", other),
    }
}

// =============================================================================
// LSN Tests
// =============================================================================

#[test]
fn test_lsn_preserved() {
    for lsn in [0, 1, u64::MAX, 12345678901234] {
        let entry = WalEntry::new(lsn, truncate_op("ranges"));
        let bytes = entry.serialize().unwrap();
        let recovered = WalEntry::deserialize(&bytes).unwrap();

        assert_eq!(recovered.lsn, lsn);
    }
}

// =============================================================================
// Serialized Size Tests
// =============================================================================

#[test]
fn test_serialized_size_matches() {
    let entry = WalEntry::new(1, batch_op("size", 3));

    let expected_size = entry.serialized_size().unwrap();
    let actual_bytes = entry.serialize().unwrap();

    assert_eq!(actual_bytes.len(), expected_size);
}

#[test]
fn test_compute_crc_matches_header() {
    let entry = WalEntry::new(42, define_op("ranges"));

    let bytes = entry.serialize().unwrap();
    let header_crc = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);

    assert_eq!(entry.compute_crc().unwrap(), header_crc);
}
