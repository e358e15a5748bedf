//! Boolean mask kernels.
//!
//! Every function evaluates a whole column with Arrow compute kernels and
//! returns a null-free `BooleanArray` aligned to the batch.

use arrow::array::{Array, BooleanArray, Float64Array, StringArray};
use arrow::compute::kernels::boolean::{and_kleene, is_not_null, is_null, or_kleene};
use arrow::compute::kernels::cmp::{eq, gt_eq, lt_eq};
use arrow::compute::{and, cast, or};
use arrow::datatypes::DataType;

use crate::error::Result;

/// Mask with every row set to `value`
#[must_use]
pub fn constant(len: usize, value: bool) -> BooleanArray {
    BooleanArray::from(vec![value; len])
}

/// Replace nulls in a mask with `value`
pub fn null_as(mask: &BooleanArray, value: bool) -> Result<BooleanArray> {
    if mask.null_count() == 0 {
        return Ok(mask.clone());
    }
    let filled = if value {
        or_kleene(mask, &is_null(mask)?)?
    } else {
        and_kleene(mask, &is_not_null(mask)?)?
    };
    Ok(filled)
}

/// `true` where the value is present
pub fn present(array: &dyn Array) -> Result<BooleanArray> {
    Ok(is_not_null(array)?)
}

/// `true` where the value is one of `allowed`; nulls map to `null_ok`
pub fn one_of(array: &StringArray, allowed: &[&str], null_ok: bool) -> Result<BooleanArray> {
    let mut mask = constant(array.len(), false);
    for label in allowed {
        let hit = eq(array, &StringArray::new_scalar(*label))?;
        mask = or(&mask, &null_as(&hit, false)?)?;
    }
    if null_ok {
        mask = or(&mask, &is_null(array)?)?;
    }
    Ok(mask)
}

/// `true` where the numeric value lies within the inclusive bounds; nulls pass
pub fn in_range(
    array: &dyn Array,
    minimum: Option<f64>,
    maximum: Option<f64>,
) -> Result<BooleanArray> {
    let numbers = cast(array, &DataType::Float64)?;
    let numbers = numbers
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| arrow::error::ArrowError::CastError("expected Float64".to_string()))?;

    let mut mask = constant(numbers.len(), true);
    if let Some(min) = minimum {
        mask = and(&mask, &gt_eq(numbers, &Float64Array::new_scalar(min))?)?;
    }
    if let Some(max) = maximum {
        mask = and(&mask, &lt_eq(numbers, &Float64Array::new_scalar(max))?)?;
    }
    null_as(&mask, true)
}

/// `true` where `later >= earlier`, or where either side is missing
pub fn not_before(earlier: &dyn Array, later: &dyn Array) -> Result<BooleanArray> {
    let ordered = gt_eq(&later, &earlier)?;
    null_as(&ordered, true)
}
