//! Row validation against the collection schemas.

use arrow::array::{Array, BooleanArray, StringArray};
use arrow::compute::and;
use arrow::record_batch::RecordBatch;
use log::debug;

use crate::error::{LoaderError, Result};
use crate::schema::{BsonKind, ClinicalSchemas, CollectionRole, CollectionSchema, Constraint};
use crate::validate::mask;

/// Outcome of validating one cleaned batch
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// `true` for rows that passed every rule
    pub mask: BooleanArray,
    pub valid_rows: usize,
    pub invalid_rows: usize,
    /// Rule label and the number of rows it rejected; rows may fail several rules
    pub failures: Vec<(String, usize)>,
}

impl ValidationReport {
    /// Single-line summary of the failing rules
    #[must_use]
    pub fn describe(&self) -> String {
        if self.failures.is_empty() {
            return "no failures".to_string();
        }
        self.failures
            .iter()
            .map(|(rule, count)| format!("{rule}: {count}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

struct MaskBuilder {
    combined: BooleanArray,
    failures: Vec<(String, usize)>,
}

impl MaskBuilder {
    fn new(len: usize) -> Self {
        Self {
            combined: mask::constant(len, true),
            failures: Vec::new(),
        }
    }

    fn apply(&mut self, label: String, rule: &BooleanArray) -> Result<()> {
        let failed = rule.len() - rule.true_count();
        if failed > 0 {
            self.failures.push((label, failed));
        }
        self.combined = and(&self.combined, rule)?;
        Ok(())
    }
}

/// Validate every row of a cleaned batch
///
/// A row is valid when the parent's required fields are present, every
/// present value satisfies its enum or range constraint, field orderings hold
/// where both sides are present, and no value failed to coerce.
///
/// # Arguments
/// * `batch` - Cleaned batch with the canonical typed schema
/// * `schemas` - Collection definitions supplying the rules
/// * `coercion_ok` - Per-row coercion outcome from the cleaners
pub fn validate_rows(
    batch: &RecordBatch,
    schemas: &ClinicalSchemas,
    coercion_ok: &BooleanArray,
) -> Result<ValidationReport> {
    let mut builder = MaskBuilder::new(batch.num_rows());
    builder.apply("malformed value".to_string(), coercion_ok)?;

    for schema in schemas.all() {
        apply_schema(batch, schema, &mut builder)?;
    }

    let valid_rows = builder.combined.true_count();
    let invalid_rows = batch.num_rows() - valid_rows;
    if invalid_rows > 0 {
        debug!("{invalid_rows} of {} rows failed validation", batch.num_rows());
    }

    Ok(ValidationReport {
        mask: builder.combined,
        valid_rows,
        invalid_rows,
        failures: builder.failures,
    })
}

fn apply_schema(
    batch: &RecordBatch,
    schema: &CollectionSchema,
    builder: &mut MaskBuilder,
) -> Result<()> {
    for rule in &schema.fields {
        if rule.kind == BsonKind::ObjectId {
            continue;
        }
        let Some(column) = batch.column_by_name(rule.name) else {
            if rule.required && schema.role == CollectionRole::Parent {
                return Err(LoaderError::Schema(format!(
                    "Required column '{}' is missing from the batch",
                    rule.name
                )));
            }
            continue;
        };

        if rule.required && schema.role == CollectionRole::Parent {
            builder.apply(format!("{} missing", rule.name), &mask::present(column.as_ref())?)?;
        }

        match &rule.constraint {
            Constraint::None => {}
            Constraint::OneOf(labels) => {
                let strings = column
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| {
                        LoaderError::Schema(format!(
                            "Column '{}' is not a string column",
                            rule.name
                        ))
                    })?;
                builder.apply(
                    format!("{} not allowed", rule.name),
                    &mask::one_of(strings, labels, true)?,
                )?;
            }
            Constraint::Range { minimum, maximum } => {
                builder.apply(
                    format!("{} out of range", rule.name),
                    &mask::in_range(column.as_ref(), *minimum, *maximum)?,
                )?;
            }
        }
    }

    for order in &schema.orderings {
        let (Some(earlier), Some(later)) = (
            batch.column_by_name(order.earlier),
            batch.column_by_name(order.later),
        ) else {
            continue;
        };
        builder.apply(
            format!("{} before {}", order.later, order.earlier),
            &mask::not_before(earlier.as_ref(), later.as_ref())?,
        )?;
    }
    Ok(())
}
