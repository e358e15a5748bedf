//! Chunk loader and run orchestration.

pub mod pipeline;
pub mod rows;
pub mod source;
pub mod summary;
pub mod writer;

use log::info;

use crate::config::LoaderConfig;
use crate::error::Result;
use crate::provision::provision_schemas;
use crate::schema::ClinicalSchemas;
use crate::store::DocumentStore;

pub use pipeline::ChunkLoader;
pub use rows::{SourceRow, extract_rows};
pub use source::CsvChunkSource;
pub use summary::{CollectionCounts, RunContext, RunSummary};
pub use writer::{OpOutcome, WriteReport, ordered_write_with_replay};

/// Check connectivity, provision the collections and load the configured file
///
/// The caller owns the store and is responsible for closing it.
///
/// # Errors
/// Returns an error if the store is unreachable, provisioning fails or the
/// input cannot be read.
pub async fn run_load(
    store: &dyn DocumentStore,
    schemas: &ClinicalSchemas,
    config: &LoaderConfig,
) -> Result<RunSummary> {
    store.ping().await?;
    info!("Connection to '{}' OK", store.database_name());

    provision_schemas(store, schemas).await?;

    ChunkLoader::new(store, schemas, config)
        .load_file(&config.csv_path)
        .await
}
