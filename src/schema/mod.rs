//! Schema definitions for the four clinical collections.
//!
//! `columns` describes the source file, `types` the rule vocabulary,
//! `collections` the concrete definitions and `json_schema` their rendering
//! into server-side validators.

pub mod collections;
pub mod columns;
pub mod json_schema;
pub mod types;

pub use collections::{
    ADMISSIONS, BILLING, ClinicalSchemas, MEDICAL_RECORDS, PATIENT_ID, PATIENT_KEY_FIELDS,
    PATIENTS,
};
pub use json_schema::{json_schema, validator_document};
pub use types::{
    BsonKind, CollectionRole, CollectionSchema, Constraint, FieldOrder, FieldRule, IndexSpec,
};
