//! WAL test suite

mod entry_tests;
mod reader_tests;

use geoindex::storage::{ContainerDef, WriteBatch};
use geoindex::wal::Operation;
use geoindex::IndexSchema;

/// Container definition used throughout the WAL tests
pub fn define_op(name: &str) -> Operation {
    Operation::DefineContainer(IndexSchema::geo_index(name))
}

/// A batch of `count` small mutations, keys tagged with `tag`
pub fn batch_op(tag: &str, count: usize) -> Operation {
    let mut batch = WriteBatch::new("ranges");
    for i in 0..count {
        batch.insert(
            "ALL",
            format!("{}-key{}", tag, i).into_bytes(),
            format!("{}-value{}", tag, i).into_bytes(),
        );
    }
    Operation::ApplyBatch(batch)
}

pub fn truncate_op(name: &str) -> Operation {
    Operation::Truncate {
        container: name.to_string(),
    }
}

/// Definition with a non-standard comparator
pub fn custom_def(name: &str) -> ContainerDef {
    ContainerDef {
        name: name.to_string(),
        key_validation: "BytesType".to_string(),
        comparator: "LongType".to_string(),
        value_validation: "BytesType".to_string(),
    }
}
