//! Field cleaners: raw all-string batches to typed, normalized batches.
//!
//! Every transform works a column at a time. A value that cannot be coerced
//! becomes null and clears its row in the coercion mask; the batch itself is
//! never aborted.

pub mod dates;
pub mod nulls;
pub mod numeric;
pub mod text;

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, StringArray};
use arrow::compute::{and, cast};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use log::debug;

use crate::error::{LoaderError, Result};
use crate::schema::columns::{SOURCE_COLUMNS, SourceColumn, Treatment, typed_schema};

pub use dates::{DateFormatConfig, coerce_datetime, parse_datetime};
pub use nulls::{is_null_token, normalize_nulls};
pub use numeric::{coerce_float, coerce_int};
pub use text::{capitalize, title_case, upper_case};

/// A typed batch together with its per-row coercion outcome
#[derive(Debug, Clone)]
pub struct CleanedBatch {
    /// Batch with the canonical typed schema
    pub batch: RecordBatch,
    /// `false` where at least one value in the row failed to coerce
    pub coercion_ok: BooleanArray,
}

impl CleanedBatch {
    /// Rows with at least one malformed value
    #[must_use]
    pub fn coercion_failures(&self) -> usize {
        self.coercion_ok.len() - self.coercion_ok.true_count()
    }
}

/// Clean one raw batch
///
/// Columns absent from the raw batch are materialized as all-null columns.
pub fn clean_batch(raw: &RecordBatch, date_config: &DateFormatConfig) -> Result<CleanedBatch> {
    let num_rows = raw.num_rows();
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(SOURCE_COLUMNS.len());
    let mut coercion_ok = BooleanArray::from(vec![true; num_rows]);

    for column in &SOURCE_COLUMNS {
        let strings = normalize_nulls(&raw_strings(raw, column)?);
        let (typed, ok) = apply_treatment(&strings, column.treatment, date_config);

        if let Some(ok) = ok {
            let failures = ok.len() - ok.true_count();
            if failures > 0 {
                debug!("{failures} malformed values in column '{}'", column.name);
            }
            coercion_ok = and(&coercion_ok, &ok)?;
        }
        columns.push(typed);
    }

    let batch = RecordBatch::try_new(typed_schema(), columns)?;
    Ok(CleanedBatch { batch, coercion_ok })
}

/// Fetch a raw column as strings, or an all-null column when it is absent
fn raw_strings(raw: &RecordBatch, column: &SourceColumn) -> Result<StringArray> {
    let Some(array) = raw.column_by_name(column.name) else {
        return Ok(StringArray::new_null(raw.num_rows()));
    };

    if let Some(strings) = array.as_any().downcast_ref::<StringArray>() {
        return Ok(strings.clone());
    }

    let converted = cast(array, &DataType::Utf8)?;
    converted
        .as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .ok_or_else(|| {
            LoaderError::Schema(format!(
                "Column '{}' could not be read as text",
                column.name
            ))
        })
}

fn apply_treatment(
    strings: &StringArray,
    treatment: Treatment,
    date_config: &DateFormatConfig,
) -> (ArrayRef, Option<BooleanArray>) {
    match treatment {
        Treatment::TitleCase => (Arc::new(text::map_strings(strings, title_case)), None),
        Treatment::Capitalize => (Arc::new(text::map_strings(strings, capitalize)), None),
        Treatment::UpperCase => (Arc::new(text::map_strings(strings, upper_case)), None),
        Treatment::Integer => {
            let (values, ok) = coerce_int(strings);
            (Arc::new(values), Some(ok))
        }
        Treatment::Float => {
            let (values, ok) = coerce_float(strings);
            (Arc::new(values), Some(ok))
        }
        Treatment::DateTime => {
            let (values, ok) = coerce_datetime(strings, date_config);
            (Arc::new(values), Some(ok))
        }
    }
}
