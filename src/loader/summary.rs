//! Run accounting.
//!
//! `RunContext` is mutated by the pipeline while chunks are processed and is
//! frozen into an immutable `RunSummary` at the end of the run.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::loader::writer::WriteReport;
use crate::schema::ClinicalSchemas;

/// Document counts for one collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionCounts {
    /// Operations submitted
    pub attempted: usize,
    /// Operations that ended up written
    pub written: usize,
    /// Written operations that created a new document
    pub created: usize,
    /// Rejected by the server inside the grouped write
    pub rejected: usize,
    /// Failed again when replayed individually
    pub replay_failed: usize,
}

impl CollectionCounts {
    fn record(&mut self, report: &WriteReport) {
        self.attempted += report.outcomes.len();
        self.written += report.written();
        self.created += report.created();
        self.rejected += report.rejected();
        self.replay_failed += report.replay_failed();
    }
}

/// Mutable state threaded through a load run
#[derive(Debug)]
pub struct RunContext {
    started: Instant,
    chunks: usize,
    rows_read: usize,
    rows_valid: usize,
    rows_rejected: usize,
    orphaned_rows: usize,
    collections: BTreeMap<String, CollectionCounts>,
}

impl RunContext {
    /// Start accounting with a zero entry for every collection
    #[must_use]
    pub fn new(schemas: &ClinicalSchemas) -> Self {
        Self {
            started: Instant::now(),
            chunks: 0,
            rows_read: 0,
            rows_valid: 0,
            rows_rejected: 0,
            orphaned_rows: 0,
            collections: schemas
                .all()
                .iter()
                .map(|s| (s.name.to_string(), CollectionCounts::default()))
                .collect(),
        }
    }

    pub fn record_chunk(&mut self, rows_read: usize, rows_valid: usize, rows_rejected: usize) {
        self.chunks += 1;
        self.rows_read += rows_read;
        self.rows_valid += rows_valid;
        self.rows_rejected += rows_rejected;
    }

    pub fn record_orphans(&mut self, rows: usize) {
        self.orphaned_rows += rows;
    }

    pub fn record_write(&mut self, collection: &str, report: &WriteReport) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .record(report);
    }

    #[must_use]
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Freeze the accumulated counts
    #[must_use]
    pub fn finish(self) -> RunSummary {
        RunSummary {
            chunks: self.chunks,
            rows_read: self.rows_read,
            rows_valid: self.rows_valid,
            rows_rejected: self.rows_rejected,
            orphaned_rows: self.orphaned_rows,
            collections: self.collections,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Immutable outcome of a load run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub chunks: usize,
    pub rows_read: usize,
    /// Rows that passed local validation
    pub rows_valid: usize,
    /// Rows excluded by local validation
    pub rows_rejected: usize,
    /// Valid rows whose patient could not be written, so no children were built
    pub orphaned_rows: usize,
    pub collections: BTreeMap<String, CollectionCounts>,
    #[serde(serialize_with = "serialize_seconds")]
    pub elapsed: Duration,
}

impl RunSummary {
    /// Counts for one collection (zero if it was never written)
    #[must_use]
    pub fn counts(&self, collection: &str) -> CollectionCounts {
        self.collections.get(collection).copied().unwrap_or_default()
    }

    /// Documents rejected remotely across all collections
    #[must_use]
    pub fn remote_rejections(&self) -> usize {
        self.collections
            .values()
            .map(|c| c.rejected + c.replay_failed)
            .sum()
    }
}

fn serialize_seconds<S: serde::Serializer>(
    value: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}
