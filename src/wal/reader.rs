//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{GeoError, Result};

use super::entry::{parse_header, MAX_ENTRY_SIZE};
use super::{WalEntry, HEADER_SIZE};

/// Reads entries from the WAL file
pub struct WalReader {
    reader: BufReader<File>,
    /// Offset just past the last entry returned
    position: u64,
    /// File length when opened
    file_len: u64,
    /// Set once a torn entry has been seen; nothing after it is readable
    torn: bool,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
            file_len,
            torn: false,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns:
    /// - `Ok(Some(entry))` — a complete, checksummed entry
    /// - `Ok(None)` — end of log, or an incomplete entry left by a crash
    /// - `Err(WalCorruption)` — a complete entry whose CRC or payload is bad
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        let remaining = self.remaining();
        if self.torn || remaining < HEADER_SIZE as u64 {
            return Ok(None);
        }

        let mut header = [0u8; HEADER_SIZE];
        self.reader.read_exact(&mut header)?;
        let (lsn, crc, len) = parse_header(&header);

        if len > MAX_ENTRY_SIZE {
            return Err(GeoError::WalCorruption(format!(
                "entry {} claims {} bytes",
                lsn, len
            )));
        }
        if remaining - (HEADER_SIZE as u64) < len as u64 {
            // partial write at the tail; position stays at the entry start
            self.torn = true;
            return Ok(None);
        }

        let mut data = vec![0u8; len as usize];
        self.reader.read_exact(&mut data)?;
        let entry = WalEntry::from_parts(lsn, crc, &data)?;

        self.position += HEADER_SIZE as u64 + len as u64;
        Ok(Some(entry))
    }

    /// Iterate over all valid entries; stops after the first error
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }

    /// Offset just past the last entry returned
    pub fn position(&self) -> u64 {
        self.position
    }

    /// File length when the reader was opened
    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    fn remaining(&self) -> u64 {
        self.file_len.saturating_sub(self.position)
    }
}

/// Iterator over WAL entries
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
