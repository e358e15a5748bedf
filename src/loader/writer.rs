//! Ordered grouped writes with individual replay of the remainder.
//!
//! An ordered group stops at its first failing operation. That operation is
//! a remote rejection; every operation after it was never attempted and is
//! replayed on its own so one bad document cannot sink the rest of the chunk.

use log::{debug, error, warn};
use mongodb::bson::Bson;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::store::{DocumentStore, WriteOp};

/// Final state of one operation
#[derive(Debug, Clone, PartialEq)]
pub enum OpOutcome {
    /// Written; carries the new `_id` when a document was created
    Applied { upserted_id: Option<Bson> },
    /// Failed inside the grouped write
    Rejected { code: i32, message: String },
    /// Failed again when replayed individually
    ReplayFailed { code: i32, message: String },
}

/// Per-operation outcomes of one collection write, in submission order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteReport {
    pub outcomes: Vec<OpOutcome>,
}

impl WriteReport {
    /// Operations that ended up written
    #[must_use]
    pub fn written(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, OpOutcome::Applied { .. }))
            .count()
    }

    /// Written operations that created a new document
    #[must_use]
    pub fn created(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, OpOutcome::Applied { upserted_id: Some(_) }))
            .count()
    }

    #[must_use]
    pub fn rejected(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, OpOutcome::Rejected { .. }))
            .count()
    }

    #[must_use]
    pub fn replay_failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, OpOutcome::ReplayFailed { .. }))
            .count()
    }

    /// Whether operation `index` was written
    #[must_use]
    pub fn is_written(&self, index: usize) -> bool {
        matches!(self.outcomes.get(index), Some(OpOutcome::Applied { .. }))
    }

    /// The `_id` assigned to operation `index`, if it created a document
    #[must_use]
    pub fn created_id(&self, index: usize) -> Option<&Bson> {
        match self.outcomes.get(index) {
            Some(OpOutcome::Applied {
                upserted_id: Some(id),
            }) => Some(id),
            _ => None,
        }
    }
}

/// Submit `ops` as one ordered group and replay whatever follows a failure
///
/// # Arguments
/// * `store` - Target store
/// * `collection` - Collection receiving the operations
/// * `ops` - Operations, all of the same kind
/// * `describe` - Human-readable identity of operation `i`, used in logs
///
/// # Errors
/// Only store-level failures (connectivity, malformed request) are returned;
/// per-document failures are reported in the `WriteReport`.
pub async fn ordered_write_with_replay<F>(
    store: &dyn DocumentStore,
    collection: &str,
    ops: &[WriteOp],
    describe: F,
) -> Result<WriteReport>
where
    F: Fn(usize) -> String,
{
    if ops.is_empty() {
        return Ok(WriteReport::default());
    }

    let result = store.grouped_write(collection, ops).await?;
    let stop = result.first_error().map_or(ops.len(), |e| e.index);
    debug!(
        "Grouped write to {collection}: {} of {} applied",
        result.applied,
        ops.len()
    );

    let created: FxHashMap<usize, &Bson> =
        result.upserted.iter().map(|(i, id)| (*i, id)).collect();
    let mut outcomes: Vec<OpOutcome> = (0..stop)
        .map(|index| OpOutcome::Applied {
            upserted_id: created.get(&index).map(|id| (*id).clone()),
        })
        .collect();

    if let Some(failure) = result.first_error() {
        warn!(
            "Remote validation rejected {collection} document {} (code {}): {}",
            describe(failure.index),
            failure.code,
            failure.message
        );
        outcomes.push(OpOutcome::Rejected {
            code: failure.code,
            message: failure.message.clone(),
        });
    }

    for (index, op) in ops.iter().enumerate().skip(outcomes.len()) {
        let replay = store
            .grouped_write(collection, std::slice::from_ref(op))
            .await?;
        match replay.first_error() {
            None => outcomes.push(OpOutcome::Applied {
                upserted_id: replay.upserted.first().map(|(_, id)| id.clone()),
            }),
            Some(failure) => {
                error!(
                    "Replay of {collection} document {} failed (code {}): {}",
                    describe(index),
                    failure.code,
                    failure.message
                );
                outcomes.push(OpOutcome::ReplayFailed {
                    code: failure.code,
                    message: failure.message.clone(),
                });
            }
        }
    }

    Ok(WriteReport { outcomes })
}
