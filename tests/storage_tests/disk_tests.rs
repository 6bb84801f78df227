//! Tests for DiskStore
//!
//! These tests verify:
//! - Keyspace directory layout
//! - Replay of definitions, batches and truncates after reopen
//! - Recovery from a torn WAL tail
//! - Compaction

use std::fs::OpenOptions;
use std::io::Write;

use geoindex::storage::{DiskStore, PartitionStore, SliceRange};
use geoindex::wal::WalRecovery;
use geoindex::SyncPolicy;
use tempfile::TempDir;

use super::{bootstrap, decoded_keys, key_batch, CONTAINER, PARTITION};

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_keyspace_directory() {
    let temp_dir = TempDir::new().unwrap();

    let store = DiskStore::open(temp_dir.path(), "CookbookKeyspace", SyncPolicy::Always).unwrap();

    assert!(temp_dir.path().join("CookbookKeyspace").is_dir());
    assert_eq!(store.dir(), temp_dir.path().join("CookbookKeyspace"));
    assert_eq!(store.next_lsn(), 1);
}

#[test]
fn test_keyspaces_are_separate() {
    let temp_dir = TempDir::new().unwrap();

    let a = DiskStore::open(temp_dir.path(), "a", SyncPolicy::Always).unwrap();
    let b = DiskStore::open(temp_dir.path(), "b", SyncPolicy::Always).unwrap();
    bootstrap(&a);

    assert!(a.describe_container(CONTAINER).is_some());
    assert!(b.describe_container(CONTAINER).is_none());
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn test_reopen_replays_everything() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = DiskStore::open(temp_dir.path(), "ks", SyncPolicy::EveryN { count: 100 }).unwrap();
        bootstrap(&store);
        store.execute_batch(key_batch(&[(30, 39), (10, 19)])).unwrap();
        store.execute_batch(key_batch(&[(20, 29)])).unwrap();
    } // dropped: WAL synced

    let store = DiskStore::open(temp_dir.path(), "ks", SyncPolicy::Always).unwrap();

    assert!(store.describe_container(CONTAINER).is_some());
    let entries = store.scan(CONTAINER, PARTITION, &SliceRange::all(10)).unwrap();
    assert_eq!(decoded_keys(&entries), vec![(10, 19), (20, 29), (30, 39)]);
    assert_eq!(store.next_lsn(), 4);
}

#[test]
fn test_writes_after_reopen_continue_the_log() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = DiskStore::open(temp_dir.path(), "ks", SyncPolicy::Always).unwrap();
        bootstrap(&store);
        store.execute_batch(key_batch(&[(10, 19)])).unwrap();
    }
    {
        let store = DiskStore::open(temp_dir.path(), "ks", SyncPolicy::Always).unwrap();
        assert_eq!(store.next_lsn(), 3);
        store.execute_batch(key_batch(&[(20, 29)])).unwrap();
    }

    let wal_path = temp_dir.path().join("ks").join("wal.log");
    let result = WalRecovery::verify(&wal_path).unwrap();
    assert_eq!(result.entries_recovered, 3);
    assert_eq!(result.last_lsn, 3);
    assert!(!result.was_truncated);

    let store = DiskStore::open(temp_dir.path(), "ks", SyncPolicy::Always).unwrap();
    let entries = store.scan(CONTAINER, PARTITION, &SliceRange::all(10)).unwrap();
    assert_eq!(decoded_keys(&entries), vec![(10, 19), (20, 29)]);
    assert_eq!(store.next_lsn(), 4);
}

#[test]
fn test_reopen_replays_truncate() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = DiskStore::open(temp_dir.path(), "ks", SyncPolicy::Always).unwrap();
        bootstrap(&store);
        store.execute_batch(key_batch(&[(1, 2), (3, 4)])).unwrap();
        store.truncate(CONTAINER).unwrap();
        store.execute_batch(key_batch(&[(5, 6)])).unwrap();
    }

    let store = DiskStore::open(temp_dir.path(), "ks", SyncPolicy::Always).unwrap();

    let entries = store.scan(CONTAINER, PARTITION, &SliceRange::all(10)).unwrap();
    assert_eq!(decoded_keys(&entries), vec![(5, 6)]);
}

#[test]
fn test_bootstrap_after_reopen_is_noop() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = DiskStore::open(temp_dir.path(), "ks", SyncPolicy::Always).unwrap();
        bootstrap(&store);
    }

    let store = DiskStore::open(temp_dir.path(), "ks", SyncPolicy::Always).unwrap();
    let lsn = store.next_lsn();

    assert!(!store
        .ensure_container(&geoindex::IndexSchema::geo_index(CONTAINER))
        .unwrap());
    // Nothing was logged for the no-op
    assert_eq!(store.next_lsn(), lsn);
}

#[test]
fn test_reopen_after_torn_batch() {
    let temp_dir = TempDir::new().unwrap();
    let wal_path;

    {
        let store = DiskStore::open(temp_dir.path(), "ks", SyncPolicy::Always).unwrap();
        bootstrap(&store);
        store.execute_batch(key_batch(&[(1, 2)])).unwrap();
        wal_path = store.wal_path().to_path_buf();
    }

    // Half a header: a crash in the middle of the next append
    {
        let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
        file.write_all(&[7u8; 9]).unwrap();
    }

    let store = DiskStore::open(temp_dir.path(), "ks", SyncPolicy::Always).unwrap();
    assert_eq!(store.partition_len(CONTAINER, PARTITION), 1);

    // The tail was cut and new appends follow the last good entry
    store.execute_batch(key_batch(&[(3, 4)])).unwrap();
    let result = WalRecovery::verify(&wal_path).unwrap();
    assert_eq!(result.entries_recovered, 3);
    assert!(!result.was_truncated);
}

// =============================================================================
// Compaction Tests
// =============================================================================

#[test]
fn test_compact_shrinks_log_and_keeps_contents() {
    let temp_dir = TempDir::new().unwrap();
    let store = DiskStore::open(temp_dir.path(), "ks", SyncPolicy::Always).unwrap();
    bootstrap(&store);

    for i in 0..20 {
        store.execute_batch(key_batch(&[(i, i + 1)])).unwrap();
    }
    store.truncate(CONTAINER).unwrap();
    store.execute_batch(key_batch(&[(100, 200), (300, 400)])).unwrap();

    let before = WalRecovery::verify(store.wal_path()).unwrap();
    assert_eq!(before.entries_recovered, 23);

    store.compact().unwrap();

    // One definition + one batch for the single partition
    let after = WalRecovery::verify(store.wal_path()).unwrap();
    assert_eq!(after.entries_recovered, 2);
    assert_eq!(store.next_lsn(), 3);

    // Writes after compaction land in the new log
    store.execute_batch(key_batch(&[(500, 600)])).unwrap();
    drop(store);

    let store = DiskStore::open(temp_dir.path(), "ks", SyncPolicy::Always).unwrap();
    let entries = store.scan(CONTAINER, PARTITION, &SliceRange::all(10)).unwrap();
    assert_eq!(decoded_keys(&entries), vec![(100, 200), (300, 400), (500, 600)]);
}
