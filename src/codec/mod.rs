//! Codec Module
//!
//! Turns source rows into index entries and back.
//!
//! ## Responsibilities
//! - Parse a delimited row into a typed `RangeRecord`
//! - Encode the range as an ordered composite key
//! - Encode the payload as an ordered composite value
//! - Build partial keys (`QueryBound`) for range scans
//!
//! Everything here is pure: no I/O, no shared state, safe to call from any
//! number of load workers at once.
//!
//! ## Composite Layout
//! ```text
//! ┌──────────────┬──────────────────────┬──────────┐
//! │ Len: u16 BE  │ Component bytes      │ EOC (1)  │   ... repeated per component
//! └──────────────┴──────────────────────┴──────────┘
//! ```
//! Integers are 8 bytes big-endian with the sign bit flipped, so plain byte
//! comparison of two encodings orders them the same way as the tuples.

mod composite;
mod record;

pub use composite::{CompositeKey, CompositeValue, Equality, QueryBound};
pub use record::RangeRecord;
