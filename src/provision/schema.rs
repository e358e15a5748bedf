//! Collection validators and indexes.
//!
//! Every operation here is idempotent: collections are created when missing
//! and modified in place otherwise, and re-creating an identical index is a
//! no-op on the server.

use log::{debug, info};

use crate::error::Result;
use crate::schema::{ClinicalSchemas, CollectionSchema, validator_document};
use crate::store::{CollectionOptions, DocumentStore};
use crate::utils::logging::{log_operation_start, log_warning};

/// Whether a collection had to be created or was updated in place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaAction {
    Created,
    Modified,
}

/// Attach the strict `$jsonSchema` validator to one collection
///
/// # Arguments
/// * `store` - Target store
/// * `schema` - Definition the validator is rendered from
///
/// # Errors
/// Returns an error if the server rejects the create or modify command.
pub async fn apply_collection_schema(
    store: &dyn DocumentStore,
    schema: &CollectionSchema,
) -> Result<SchemaAction> {
    let options = CollectionOptions::strict(validator_document(schema));
    let existing = store.list_collection_names().await?;

    let action = if existing.iter().any(|name| name == schema.name) {
        store.modify_collection(schema.name, &options).await?;
        SchemaAction::Modified
    } else {
        match store.create_collection(schema.name, &options).await {
            Ok(()) => SchemaAction::Created,
            // Lost a race with another loader; fall back to modifying it.
            Err(err) if err.is_already_exists() => {
                store.modify_collection(schema.name, &options).await?;
                SchemaAction::Modified
            }
            Err(err) => return Err(err),
        }
    };

    match store.collection_validator(schema.name).await? {
        Some(_) => debug!("Validator attached to '{}'", schema.name),
        None => log_warning("No validator after provisioning", Some(schema.name)),
    }
    info!("Schema applied to '{}' ({action:?})", schema.name);
    Ok(action)
}

/// Create every index declared on a collection
///
/// # Errors
/// Returns an error if an index conflicts with an existing one.
pub async fn ensure_indexes(store: &dyn DocumentStore, schema: &CollectionSchema) -> Result<()> {
    for index in &schema.indexes {
        store.create_index(schema.name, index).await?;
        debug!("Index '{}' ensured on '{}'", index.name(), schema.name);
    }
    Ok(())
}

/// Apply validators and indexes to all four collections
///
/// # Errors
/// Returns the first provisioning failure.
pub async fn provision_schemas(store: &dyn DocumentStore, schemas: &ClinicalSchemas) -> Result<()> {
    log_operation_start("Provisioning collections in", store.database_name());
    for schema in schemas.all() {
        apply_collection_schema(store, schema).await?;
    }
    for schema in schemas.all() {
        ensure_indexes(store, schema).await?;
    }
    info!("Collections and indexes provisioned in '{}'", store.database_name());
    Ok(())
}
