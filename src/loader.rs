//! Bulk Loader
//!
//! Streams source rows into the index through a fixed pool of workers.
//!
//! ```text
//!   lines ──► [batch of N rows] ──► bounded channel ──► worker 1..W
//!                                                          │ parse + encode
//!                                                          │ execute_batch
//!   LoadReport ◄── sum ◄── result channel ◄── BatchOutcome ┘
//! ```
//!
//! Workers share nothing but the store. A failed batch loses its rows and is
//! reported; it does not stop the other workers and is not retried.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::{Duration, Instant};

use crossbeam::channel;

use crate::codec::RangeRecord;
use crate::config::{Config, NumericPolicy};
use crate::error::{GeoError, Result};
use crate::storage::{PartitionStore, WriteBatch};

/// Batches that may wait for a worker, per worker
const QUEUE_DEPTH_PER_WORKER: usize = 2;

/// One source row; an undecodable row travels as its rejection
type SourceLine = std::result::Result<String, GeoError>;

/// A numbered batch of source rows
type Job = (usize, Vec<SourceLine>);

/// What happened to one batch
#[derive(Debug)]
pub struct BatchOutcome {
    /// Position of the batch in the source, from 0
    pub batch_id: usize,

    /// Rows handed to the worker
    pub rows: usize,

    /// Entries the store accepted
    pub inserted: usize,

    /// Rows the codec refused; the rest of the batch was still submitted
    pub rejected: Vec<GeoError>,

    /// Submission failure; when set nothing from this batch was written
    pub error: Option<GeoError>,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of a whole load
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Batches submitted to the pool
    pub batches: usize,

    /// Non-blank rows read from the source
    pub total_rows: usize,

    /// Entries written
    pub total_inserted: usize,

    /// Batches whose submission failed
    pub failures: Vec<BatchOutcome>,

    /// Encoded rows lost with failed batches
    pub lost_rows: usize,

    /// Rows the codec refused, across all batches
    pub rejected: Vec<GeoError>,

    pub elapsed: Duration,
}

impl LoadReport {
    /// True when every row made it into the index
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.rejected.is_empty()
    }

    fn record(&mut self, mut outcome: BatchOutcome) {
        self.batches += 1;
        self.total_inserted += outcome.inserted;
        let failed = !outcome.is_success();
        if failed {
            self.lost_rows += outcome.rows - outcome.rejected.len();
        }
        self.rejected.append(&mut outcome.rejected);
        if failed {
            self.failures.push(outcome);
        }
    }
}

/// Loads range rows into one container partition
pub struct BulkLoader<'a> {
    store: &'a dyn PartitionStore,
    container: String,
    partition_key: String,
    numeric_policy: NumericPolicy,
}

impl<'a> BulkLoader<'a> {
    pub fn new(
        store: &'a dyn PartitionStore,
        container: impl Into<String>,
        partition_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            container: container.into(),
            partition_key: partition_key.into(),
            numeric_policy: NumericPolicy::default(),
        }
    }

    /// Loader targeting the container and partition named in `config`
    pub fn from_config(store: &'a dyn PartitionStore, config: &Config) -> Self {
        Self::new(store, &config.container, &config.partition_key)
            .numeric_policy(config.numeric_policy)
    }

    pub fn numeric_policy(mut self, policy: NumericPolicy) -> Self {
        self.numeric_policy = policy;
        self
    }

    /// Load rows from an in-memory source
    pub fn load<I, S>(&self, lines: I, batch_size: usize, worker_count: usize) -> Result<LoadReport>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run(
            lines.into_iter().map(|line| Ok(Ok(line.into()))),
            batch_size,
            worker_count,
        )
    }

    /// Stream rows from a file
    ///
    /// A file that cannot be opened is `GeoError::SourceUnavailable`; a read
    /// error part-way through ends the load with that error. A row that is not
    /// valid UTF-8 is rejected under `Reject` and decoded lossily under
    /// `ZeroFill`; either way the load goes on.
    pub fn load_file(&self, path: &Path, batch_size: usize, worker_count: usize) -> Result<LoadReport> {
        let file = File::open(path).map_err(|source| GeoError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!("Loading {}", path.display());
        let policy = self.numeric_policy;
        let lines = BufReader::new(file)
            .split(b'\n')
            .map(move |line| {
                line.map(|bytes| decode_line(bytes, policy))
                    .map_err(GeoError::from)
            });
        self.run(lines, batch_size, worker_count)
    }

    fn run<I>(&self, lines: I, batch_size: usize, worker_count: usize) -> Result<LoadReport>
    where
        I: Iterator<Item = Result<SourceLine>>,
    {
        if batch_size == 0 {
            return Err(GeoError::Config("batch_size must be at least 1".to_string()));
        }
        if worker_count == 0 {
            return Err(GeoError::Config("worker_count must be at least 1".to_string()));
        }

        let started = Instant::now();
        let (job_tx, job_rx) =
            channel::bounded::<Job>(worker_count * QUEUE_DEPTH_PER_WORKER);
        let (result_tx, result_rx) = channel::unbounded::<BatchOutcome>();

        let fed = crossbeam::thread::scope(|s| {
            for _ in 0..worker_count {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                s.spawn(move |_| {
                    for (batch_id, rows) in job_rx.iter() {
                        if result_tx.send(self.process(batch_id, rows)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(job_rx);
            drop(result_tx);

            // workers exit once job_tx is dropped at the end of feed
            self.feed(lines, batch_size, job_tx)
        })
        .map_err(|_| GeoError::WorkerPool("a load worker panicked".to_string()))?;

        let mut report = LoadReport::default();
        for outcome in result_rx.iter() {
            report.record(outcome);
        }
        report.failures.sort_by_key(|f| f.batch_id);

        report.total_rows = fed?;
        report.elapsed = started.elapsed();

        tracing::info!(
            "Inserted a total of {} over duration ms: {}",
            report.total_inserted,
            report.elapsed.as_millis()
        );
        if !report.is_complete() {
            tracing::warn!(
                "{} of {} batches failed ({} rows), {} rows rejected",
                report.failures.len(),
                report.batches,
                report.lost_rows,
                report.rejected.len()
            );
        }

        Ok(report)
    }

    /// Cut the source into batches and queue them; returns the rows read
    fn feed<I>(
        &self,
        lines: I,
        batch_size: usize,
        job_tx: channel::Sender<Job>,
    ) -> Result<usize>
    where
        I: Iterator<Item = Result<SourceLine>>,
    {
        let mut rows = 0usize;
        let mut batch_id = 0usize;
        let mut buffer = Vec::with_capacity(batch_size);

        for line in lines {
            let line = line?;
            if matches!(&line, Ok(text) if text.trim().is_empty()) {
                continue;
            }
            rows += 1;
            buffer.push(line);

            if buffer.len() == batch_size {
                let full = std::mem::replace(&mut buffer, Vec::with_capacity(batch_size));
                Self::submit(&job_tx, batch_id, full)?;
                batch_id += 1;
            }
        }

        if !buffer.is_empty() {
            Self::submit(&job_tx, batch_id, buffer)?;
        }

        Ok(rows)
    }

    fn submit(
        job_tx: &channel::Sender<Job>,
        batch_id: usize,
        rows: Vec<SourceLine>,
    ) -> Result<()> {
        job_tx
            .send((batch_id, rows))
            .map_err(|_| GeoError::WorkerPool(format!("no worker left to take batch {}", batch_id)))
    }

    /// Encode one batch and submit it as a single write
    fn process(&self, batch_id: usize, lines: Vec<SourceLine>) -> BatchOutcome {
        let rows = lines.len();
        let mut rejected = Vec::new();
        let mut batch = WriteBatch::with_capacity(&self.container, rows);

        for line in lines {
            let encoded = line
                .and_then(|line| RangeRecord::parse(&line, self.numeric_policy))
                .and_then(|record| record.encode());
            match encoded {
                Ok((key, value)) => batch.insert(&self.partition_key, key, value),
                Err(e) => {
                    tracing::debug!("Batch {}: skipping row: {}", batch_id, e);
                    rejected.push(e);
                }
            }
        }

        let (inserted, error) = if batch.is_empty() {
            (0, None)
        } else {
            match self.store.execute_batch(batch) {
                Ok(inserted) => (inserted, None),
                Err(e) => {
                    tracing::warn!("Batch {} of {} rows failed: {}", batch_id, rows, e);
                    (0, Some(e))
                }
            }
        };

        tracing::debug!("Batch {}: {} rows, {} inserted", batch_id, rows, inserted);

        BatchOutcome {
            batch_id,
            rows,
            inserted,
            rejected,
            error,
        }
    }
}

/// Turn one raw source row into text
fn decode_line(bytes: Vec<u8>, policy: NumericPolicy) -> SourceLine {
    match String::from_utf8(bytes) {
        Ok(line) => Ok(line),
        Err(e) => {
            let lossy = String::from_utf8_lossy(e.as_bytes()).into_owned();
            match policy {
                NumericPolicy::Reject => Err(GeoError::malformed(&lossy, "row is not valid UTF-8")),
                NumericPolicy::ZeroFill => {
                    tracing::debug!("Row is not valid UTF-8, decoding lossily: {}", lossy);
                    Ok(lossy)
                }
            }
        }
    }
}
