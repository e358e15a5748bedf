//! Null-like sentinel normalization.

use arrow::array::StringArray;

/// Tokens that stand for a missing value (compared case-insensitively)
pub const NULL_TOKENS: [&str; 8] = ["", "nan", "none", "null", "n/a", "na", "--", "<na>"];

/// Whether a raw cell is a missing-value sentinel
#[must_use]
pub fn is_null_token(value: &str) -> bool {
    let trimmed = value.trim();
    NULL_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Trim every value and replace sentinel tokens with a real null
///
/// Runs before any type coercion, so "N/A" in a numeric column is a missing
/// value rather than a malformed one.
#[must_use]
pub fn normalize_nulls(array: &StringArray) -> StringArray {
    array
        .iter()
        .map(|value| value.map(str::trim).filter(|v| !is_null_token(v)))
        .collect()
}
