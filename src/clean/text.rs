//! Canonical casing for text columns.

use arrow::array::StringArray;

/// Lowercase everything, then capitalise the first letter of every word
///
/// A word starts after any non-alphabetic character, so "o'neil-smith"
/// becomes "O'Neil-Smith".
#[must_use]
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut previous_is_letter = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }
    out
}

/// Uppercase the first character and lowercase the rest
#[must_use]
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Uppercase every character
#[must_use]
pub fn upper_case(value: &str) -> String {
    value.to_uppercase()
}

/// Apply a string transform to every non-null value
#[must_use]
pub fn map_strings(array: &StringArray, transform: impl Fn(&str) -> String) -> StringArray {
    array.iter().map(|value| value.map(&transform)).collect()
}
