//! Idempotent database provisioning: validators, indexes, roles and users.

pub mod access;
pub mod schema;

pub use access::{ProvisionOutcome, provision_access};
pub use schema::{SchemaAction, apply_collection_schema, ensure_indexes, provision_schemas};
