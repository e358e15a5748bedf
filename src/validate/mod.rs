//! Vectorized row validation.
//!
//! Rules come from the same `CollectionSchema` definitions that are rendered
//! into server-side validators; date ordering is only checked here.

pub mod mask;
pub mod rules;

pub use rules::{ValidationReport, validate_rows};
