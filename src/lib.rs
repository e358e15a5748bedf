//! A Rust library for loading clinical CSV records into a document database
//! with vectorized cleaning and validation, strict server-side schemas and
//! least-privilege access provisioning.

pub mod clean;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod provision;
pub mod schema;
pub mod store;
pub mod utils;
pub mod validate;

// Re-export the most common types for easier use
// Core types
pub use config::{AccessConfig, LoaderConfig};
pub use error::{LoaderError, Result};
pub use schema::{ClinicalSchemas, CollectionSchema};

// Arrow types
pub use arrow::record_batch::RecordBatch;

// Pipeline
pub use loader::{ChunkLoader, CsvChunkSource, RunSummary, run_load};
pub use provision::{provision_access, provision_schemas};

// Stores
pub use store::{DocumentStore, MemoryStore, MongoStore};
