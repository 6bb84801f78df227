//! WAL Writer
//!
//! Handles appending entries to the WAL file.
//!
//! A failed append is rolled back: the file is cut back to its length before
//! the append and the unwritten buffer is discarded, so a frame the caller was
//! told failed never reaches the log. If the rollback fails too the writer
//! refuses every further append.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::config::SyncPolicy;
use crate::error::{GeoError, Result};

use super::entry::{encode_frame, now_millis};
use super::{Operation, WalRecovery};

/// Writes entries to the WAL file
pub struct WalWriter {
    writer: BufWriter<File>,
    /// LSN the next append will receive
    next_lsn: u64,
    sync_policy: SyncPolicy,
    /// Entries written since the last fsync
    uncommitted: usize,
    /// File length covered by successful appends
    len: u64,
    /// Set when a failed append could not be rolled back
    poisoned: bool,
}

impl WalWriter {
    /// Open or create a WAL file, continuing after its last valid entry
    ///
    /// A torn tail left by a crash is cut off before appending.
    pub fn open(path: &Path, sync_policy: SyncPolicy) -> Result<Self> {
        let next_lsn = if path.exists() {
            let (_, result) = WalRecovery::recover(path)?;
            result.last_lsn + 1
        } else {
            1
        };
        Self::open_at(path, sync_policy, next_lsn, false)
    }

    /// Append to a WAL that the caller has already recovered
    ///
    /// `next_lsn` is the recovered last LSN plus one.
    pub fn resume(path: &Path, sync_policy: SyncPolicy, next_lsn: u64) -> Result<Self> {
        Self::open_at(path, sync_policy, next_lsn, false)
    }

    /// Create a fresh, empty WAL whose first entry gets `first_lsn`
    pub fn create(path: &Path, sync_policy: SyncPolicy, first_lsn: u64) -> Result<Self> {
        Self::open_at(path, sync_policy, first_lsn, true)
    }

    fn open_at(path: &Path, sync_policy: SyncPolicy, next_lsn: u64, truncate: bool) -> Result<Self> {
        let file = if truncate {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)?
        } else {
            OpenOptions::new().create(true).append(true).open(path)?
        };
        let len = file.metadata()?.len();

        Ok(Self {
            writer: BufWriter::new(file),
            next_lsn,
            sync_policy,
            uncommitted: 0,
            len,
            poisoned: false,
        })
    }

    /// Append an operation; returns the LSN it was logged under
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        self.append_ref(&operation)
    }

    /// Append an operation the caller still needs afterwards
    pub fn append_ref(&mut self, operation: &Operation) -> Result<u64> {
        if self.poisoned {
            return Err(GeoError::WalWrite(
                "log is unusable after a failed rollback".to_string(),
            ));
        }

        let lsn = self.next_lsn;
        let frame = encode_frame(lsn, operation, now_millis())?;

        let written = self
            .writer
            .write_all(&frame)
            .and_then(|_| self.writer.flush());
        if let Err(e) = written {
            if let Err(rollback) = self.rollback() {
                tracing::error!(
                    "WAL rollback to {} bytes failed, refusing further appends: {}",
                    self.len,
                    rollback
                );
                self.poisoned = true;
            }
            return Err(GeoError::WalWrite(format!(
                "append of lsn {} failed: {}",
                lsn, e
            )));
        }

        self.len += frame.len() as u64;
        self.next_lsn += 1;
        self.uncommitted += 1;

        let due = match self.sync_policy {
            SyncPolicy::Always => true,
            SyncPolicy::EveryN { count } => self.uncommitted >= count,
        };
        if due {
            self.sync()?;
        }

        Ok(lsn)
    }

    /// Drop the buffered remains of a failed append and cut the file back
    fn rollback(&mut self) -> Result<()> {
        let fresh = BufWriter::new(self.writer.get_ref().try_clone()?);
        let failed = std::mem::replace(&mut self.writer, fresh);
        // into_parts hands back the file without flushing the buffer
        let (_, _unwritten) = failed.into_parts();

        let file = self.writer.get_mut();
        file.set_len(self.len)?;
        file.seek(SeekFrom::Start(self.len))?;
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        if self.poisoned {
            return Err(GeoError::WalWrite(
                "log is unusable after a failed rollback".to_string(),
            ));
        }
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.uncommitted = 0;
        Ok(())
    }

    /// LSN the next append will receive
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Entries written since the last fsync
    pub fn uncommitted_count(&self) -> usize {
        self.uncommitted
    }

    /// True once a failed append could not be rolled back
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}
