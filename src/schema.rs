//! Container Bootstrap
//!
//! The index container's schema and the idempotent call that makes sure it
//! exists before loading or querying.

use crate::error::Result;
use crate::storage::{ContainerDef, PartitionStore};

/// Validator and comparator names of the range index
pub struct IndexSchema;

impl IndexSchema {
    pub const KEY_VALIDATION: &'static str = "UTF8Type";
    pub const COMPARATOR: &'static str = "CompositeType(LongType,LongType)";
    pub const VALUE_VALIDATION: &'static str =
        "CompositeType(UTF8Type,UTF8Type,UTF8Type,UTF8Type)";

    /// Definition of a range index container called `name`
    pub fn geo_index(name: &str) -> ContainerDef {
        ContainerDef {
            name: name.to_string(),
            key_validation: Self::KEY_VALIDATION.to_string(),
            comparator: Self::COMPARATOR.to_string(),
            value_validation: Self::VALUE_VALIDATION.to_string(),
        }
    }
}

/// Make sure the range index container exists in `store`
///
/// Safe to call any number of times. Returns `true` only on the call that
/// created the container.
pub fn ensure_index(store: &dyn PartitionStore, container: &str) -> Result<bool> {
    let created = store.ensure_container(&IndexSchema::geo_index(container))?;
    if created {
        tracing::info!("Created container {}", container);
    } else {
        tracing::debug!("Container {} already exists", container);
    }
    Ok(created)
}
