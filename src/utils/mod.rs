//! Shared helpers for Arrow batches and logging.

pub mod arrow;
pub mod logging;

/// Default number of rows per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 5000;
