//! Numeric coercion of string columns.

use arrow::array::{BooleanArray, Float64Array, Int32Array, StringArray};

/// Parse an integer, accepting integral floats ("401.0") that fit in 32 bits
#[must_use]
pub fn parse_int(value: &str) -> Option<i32> {
    let value = value.trim();
    if let Ok(parsed) = value.parse::<i64>() {
        return i32::try_from(parsed).ok();
    }

    let parsed = value.parse::<f64>().ok()?;
    if parsed.is_finite()
        && parsed.fract() == 0.0
        && parsed >= f64::from(i32::MIN)
        && parsed <= f64::from(i32::MAX)
    {
        #[allow(clippy::cast_possible_truncation)]
        return Some(parsed as i32);
    }
    None
}

/// Parse a finite float
#[must_use]
pub fn parse_float(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
}

/// Coerce a string array to `Int32`, flagging values that did not parse
#[must_use]
pub fn coerce_int(array: &StringArray) -> (Int32Array, BooleanArray) {
    coerce(array, parse_int)
}

/// Coerce a string array to `Float64`, flagging values that did not parse
#[must_use]
pub fn coerce_float(array: &StringArray) -> (Float64Array, BooleanArray) {
    coerce(array, parse_float)
}

fn coerce<T, A>(array: &StringArray, parse: impl Fn(&str) -> Option<T>) -> (A, BooleanArray)
where
    A: From<Vec<Option<T>>>,
{
    let (values, ok): (Vec<Option<T>>, Vec<bool>) = array
        .iter()
        .map(|value| match value {
            None => (None, true),
            Some(s) => {
                let parsed = parse(s);
                let ok = parsed.is_some();
                (parsed, ok)
            }
        })
        .unzip();

    (A::from(values), BooleanArray::from(ok))
}
