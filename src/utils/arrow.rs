//! Utilities for working with Arrow record batches.

use arrow::array::{Array, ArrayRef, BooleanArray};
use arrow::compute::filter as arrow_filter;
use arrow::record_batch::RecordBatch;

use crate::error::{LoaderError, Result};

/// Keep the rows of a batch where `mask` is true
///
/// # Arguments
/// * `batch` - The record batch to filter
/// * `mask` - Boolean mask with one entry per row
///
/// # Errors
/// Returns an error if the mask length does not match the batch
pub fn filter_record_batch(batch: &RecordBatch, mask: &BooleanArray) -> Result<RecordBatch> {
    if batch.num_rows() != mask.len() {
        return Err(LoaderError::Schema(format!(
            "Mask length ({}) doesn't match batch row count ({})",
            mask.len(),
            batch.num_rows()
        )));
    }

    let filtered_columns: Vec<ArrayRef> = batch
        .columns()
        .iter()
        .map(|col| arrow_filter(col, mask))
        .collect::<std::result::Result<_, _>>()?;

    Ok(RecordBatch::try_new(batch.schema(), filtered_columns)?)
}

/// Get a column from a record batch by name
///
/// # Errors
/// Returns an error if the column does not exist
pub fn get_column<'a>(batch: &'a RecordBatch, column_name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(column_name)
        .ok_or_else(|| LoaderError::Schema(format!("Column '{column_name}' not found in batch")))
}

/// Downcast a column to a specific array type with clear error messages
///
/// # Type Parameters
/// * `A` - The target array type to downcast to
///
/// # Arguments
/// * `array` - The array reference to downcast
/// * `column_name` - The name of the column (for error messages)
pub fn downcast_array<'a, A: Array + 'static>(
    array: &'a ArrayRef,
    column_name: &str,
) -> Result<&'a A> {
    array.as_any().downcast_ref::<A>().ok_or_else(|| {
        LoaderError::Schema(format!(
            "Column '{column_name}' has type {} which cannot be read as {}",
            array.data_type(),
            std::any::type_name::<A>()
        ))
    })
}

/// Fetch and downcast a column in one step
pub fn typed_column<'a, A: Array + 'static>(
    batch: &'a RecordBatch,
    column_name: &str,
) -> Result<&'a A> {
    downcast_array(get_column(batch, column_name)?, column_name)
}
