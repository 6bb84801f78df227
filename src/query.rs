//! Range Query Iterator
//!
//! Turns a lookup value into composite scan bounds and walks the matching
//! entries one page at a time.
//!
//! ## Paging
//! ```text
//!            scan(page_size)          page drained, page was full
//!   Fetching ───────────────► Yielding ──────────────────────────► Fetching
//!      │ error / empty page      │ page drained, page was short     (after last key)
//!      ▼                         ▼
//!   Exhausted ◄──────────────────┘
//! ```
//!
//! A page is only fetched when the caller asks for an entry past the end of
//! the previous one, so dropping the iterator stops all further scans.

use std::ops::Bound;

use crate::codec::{CompositeKey, CompositeValue, Equality, QueryBound};
use crate::error::{GeoError, Result};
use crate::storage::{PartitionStore, SliceRange, StoredEntry};

/// How a lookup value becomes scan bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Every entry whose start number lies in `[anchor, lookup]`
    ///
    /// Start bound `(anchor, Equal)`, end bound `(lookup, GreaterThanEqual)`.
    /// The range containing `lookup` is the first of these whose end number
    /// reaches `lookup`.
    StartInclusive { anchor: i64 },

    /// Every entry whose start number is at least `lookup`
    ///
    /// Start bound `(lookup, Equal)`, no end bound.
    StartAtLeast,
}

impl QueryMode {
    fn bounds(self, lookup: i64) -> (Bound<Vec<u8>>, Bound<Vec<u8>>) {
        match self {
            QueryMode::StartInclusive { anchor } => (
                Bound::Included(QueryBound::prefix(anchor, Equality::Equal).encode()),
                Bound::Included(QueryBound::prefix(lookup, Equality::GreaterThanEqual).encode()),
            ),
            QueryMode::StartAtLeast => (
                Bound::Included(QueryBound::prefix(lookup, Equality::Equal).encode()),
                Bound::Unbounded,
            ),
        }
    }
}

/// A decoded index entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: CompositeKey,
    pub value: CompositeValue,
}

impl IndexEntry {
    pub fn decode(entry: &StoredEntry) -> Result<Self> {
        Ok(Self {
            key: CompositeKey::decode(&entry.key)?,
            value: CompositeValue::decode(&entry.value)?,
        })
    }

    /// True when the entry's range contains `value`
    pub fn covers(&self, value: i64) -> bool {
        self.key.covers(value)
    }
}

enum State {
    /// Next call scans; `after` is the last key already handed out
    Fetching { after: Option<Vec<u8>> },

    /// Handing out a fetched page
    Yielding {
        page: std::vec::IntoIter<StoredEntry>,
        last_key: Vec<u8>,
        full: bool,
    },

    Exhausted,
}

/// Lazily paged scan over one partition
///
/// Yields entries in ascending key order. A scan error is yielded once and
/// ends the iteration; an entry that fails to decode is yielded as an error
/// and iteration continues.
pub struct RangeQuery<'a> {
    store: &'a dyn PartitionStore,
    container: String,
    partition: String,
    start: Bound<Vec<u8>>,
    end: Bound<Vec<u8>>,
    page_size: usize,
    state: State,
    pages_fetched: usize,
}

impl<'a> RangeQuery<'a> {
    pub fn new(
        store: &'a dyn PartitionStore,
        container: impl Into<String>,
        partition: impl Into<String>,
        lookup: i64,
        mode: QueryMode,
        page_size: usize,
    ) -> Self {
        let (start, end) = mode.bounds(lookup);
        Self {
            store,
            container: container.into(),
            partition: partition.into(),
            start,
            end,
            page_size: page_size.max(1),
            state: State::Fetching { after: None },
            pages_fetched: 0,
        }
    }

    /// Scan calls made so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Consume entries until one covers `lookup`
    ///
    /// Meaningful for `StartInclusive`, where every yielded entry starts at or
    /// before `lookup`. Stops scanning as soon as the match is found. Entries
    /// that fail to decode are logged and passed over; a scan error ends the
    /// search with that error.
    pub fn find_covering(&mut self, lookup: i64) -> Result<Option<IndexEntry>> {
        for entry in self {
            match entry {
                Ok(entry) if entry.covers(lookup) => return Ok(Some(entry)),
                Ok(_) => {}
                Err(GeoError::Codec(reason)) => {
                    tracing::warn!("Skipping undecodable entry during lookup {}: {}", lookup, reason);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    fn fetch(&mut self, after: Option<Vec<u8>>) -> Result<Vec<StoredEntry>> {
        let start = match after {
            Some(key) => Bound::Excluded(key),
            None => self.start.clone(),
        };
        let range = SliceRange::new(start, self.end.clone(), self.page_size);
        let page = self.store.scan(&self.container, &self.partition, &range)?;

        self.pages_fetched += 1;
        tracing::trace!(
            "Fetched page {} of {}/{}: {} entries",
            self.pages_fetched,
            self.container,
            self.partition,
            page.len()
        );
        Ok(page)
    }
}

impl<'a> Iterator for RangeQuery<'a> {
    type Item = Result<IndexEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match std::mem::replace(&mut self.state, State::Exhausted) {
                State::Exhausted => return None,

                State::Fetching { after } => {
                    let page = match self.fetch(after) {
                        Ok(page) => page,
                        Err(e) => return Some(Err(e)),
                    };
                    let last_key = page.last().map(|entry| entry.key.clone())?;
                    self.state = State::Yielding {
                        full: page.len() >= self.page_size,
                        page: page.into_iter(),
                        last_key,
                    };
                }

                State::Yielding {
                    mut page,
                    last_key,
                    full,
                } => match page.next() {
                    Some(entry) => {
                        self.state = State::Yielding {
                            page,
                            last_key,
                            full,
                        };
                        return Some(IndexEntry::decode(&entry));
                    }
                    None if full => {
                        self.state = State::Fetching {
                            after: Some(last_key),
                        };
                    }
                    None => return None,
                },
            }
        }
    }
}
