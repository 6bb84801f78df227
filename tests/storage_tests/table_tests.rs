//! Tests for KeyspaceTables
//!
//! These tests verify:
//! - Definition checks without side effects
//! - Snapshots used to rewrite a log

use geoindex::storage::{ContainerDef, KeyspaceTables, SliceRange, WriteBatch};
use geoindex::{GeoError, IndexSchema};

use super::{key_batch, CONTAINER, PARTITION};

#[test]
fn test_check_definition_has_no_side_effects() {
    let tables = KeyspaceTables::new();
    let def = IndexSchema::geo_index(CONTAINER);

    assert!(tables.check_definition(&def).unwrap());
    assert!(!tables.contains(CONTAINER));

    assert!(tables.define(&def).unwrap());
    assert!(!tables.check_definition(&def).unwrap());

    let other = ContainerDef {
        value_validation: "BytesType".to_string(),
        ..def
    };
    assert!(matches!(
        tables.check_definition(&other),
        Err(GeoError::SchemaMismatch { .. })
    ));
}

#[test]
fn test_snapshot_rebuilds_contents() {
    let tables = KeyspaceTables::new();
    tables.define(&IndexSchema::geo_index(CONTAINER)).unwrap();
    tables.define(&IndexSchema::geo_index("empty")).unwrap();
    tables.apply(&key_batch(&[(3, 4), (1, 2)])).unwrap();

    let mut other = WriteBatch::new(CONTAINER);
    other.insert("second", b"k".to_vec(), b"v".to_vec());
    tables.apply(&other).unwrap();

    let snapshot = tables.snapshot();
    assert_eq!(snapshot.len(), 2);

    // Containers and partitions come out in name order
    let (def, batches) = &snapshot[1];
    assert_eq!(def.name, CONTAINER);
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].mutations[0].partition, PARTITION);
    assert_eq!(batches[0].len(), 2);
    assert_eq!(batches[1].mutations[0].partition, "second");

    let (empty_def, empty_batches) = &snapshot[0];
    assert_eq!(empty_def.name, "empty");
    assert!(empty_batches.is_empty());

    // Replaying the snapshot reproduces the partition
    let copy = KeyspaceTables::new();
    for (def, batches) in &snapshot {
        copy.define(def).unwrap();
        for batch in batches {
            copy.apply(batch).unwrap();
        }
    }
    assert_eq!(
        copy.scan(CONTAINER, PARTITION, &SliceRange::all(10)),
        tables.scan(CONTAINER, PARTITION, &SliceRange::all(10))
    );
}
