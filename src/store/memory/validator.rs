//! Local evaluation of `$jsonSchema` validators.
//!
//! Supports the keywords the clinical validators use: `bsonType`,
//! `required`, `additionalProperties: false`, `properties`, `enum`,
//! `minimum` and `maximum`.

use mongodb::bson::{Bson, Document};

/// Check a document against a validator of the form `{ "$jsonSchema": ... }`
///
/// Validators without a `$jsonSchema` key accept every document.
///
/// # Errors
///
/// Returns a description of the first violation found.
pub fn validate_document(validator: &Document, document: &Document) -> Result<(), String> {
    let Ok(schema) = validator.get_document("$jsonSchema") else {
        return Ok(());
    };
    validate_object(schema, document, "")
}

fn validate_object(schema: &Document, object: &Document, prefix: &str) -> Result<(), String> {
    if let Ok(required) = schema.get_array("required") {
        for field in required.iter().filter_map(Bson::as_str) {
            if !object.contains_key(field) {
                return Err(format!("missing required field '{}'", path(prefix, field)));
            }
        }
    }

    let properties = schema.get_document("properties").ok();

    if schema.get_bool("additionalProperties") == Ok(false) {
        for key in object.keys() {
            if properties.is_none_or(|p| !p.contains_key(key)) {
                return Err(format!("undeclared field '{}'", path(prefix, key)));
            }
        }
    }

    if let Some(properties) = properties {
        for (field, spec) in properties {
            let (Bson::Document(spec), Some(value)) = (spec, object.get(field)) else {
                continue;
            };
            validate_value(spec, value, &path(prefix, field))?;
        }
    }
    Ok(())
}

fn validate_value(spec: &Document, value: &Bson, field: &str) -> Result<(), String> {
    if let Some(expected) = spec.get("bsonType") {
        let allowed: Vec<&str> = match expected {
            Bson::String(alias) => vec![alias.as_str()],
            Bson::Array(aliases) => aliases.iter().filter_map(Bson::as_str).collect(),
            _ => Vec::new(),
        };
        if !allowed.iter().any(|alias| matches_type(alias, value)) {
            return Err(format!(
                "field '{field}' has type {} but expected {}",
                type_name(value),
                allowed.join(" or ")
            ));
        }
    }

    if let Ok(options) = spec.get_array("enum") {
        if !options.contains(value) {
            return Err(format!("field '{field}' value {value} is not an allowed value"));
        }
    }

    if let Some(number) = as_number(value) {
        if let Some(minimum) = spec.get("minimum").and_then(as_number) {
            if number < minimum {
                return Err(format!("field '{field}' value {number} is below {minimum}"));
            }
        }
        if let Some(maximum) = spec.get("maximum").and_then(as_number) {
            if number > maximum {
                return Err(format!("field '{field}' value {number} is above {maximum}"));
            }
        }
    }

    if let (Bson::Document(nested), Some("object")) =
        (value, spec.get_str("bsonType").ok())
    {
        validate_object(spec, nested, field)?;
    }
    Ok(())
}

fn matches_type(alias: &str, value: &Bson) -> bool {
    matches!(
        (alias, value),
        ("string", Bson::String(_))
            | ("int", Bson::Int32(_))
            | ("long", Bson::Int64(_))
            | ("double", Bson::Double(_))
            | ("number", Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
            | ("date", Bson::DateTime(_))
            | ("objectId", Bson::ObjectId(_))
            | ("null", Bson::Null)
            | ("object", Bson::Document(_))
            | ("array", Bson::Array(_))
            | ("bool", Bson::Boolean(_))
    )
}

fn type_name(value: &Bson) -> &'static str {
    match value {
        Bson::String(_) => "string",
        Bson::Int32(_) => "int",
        Bson::Int64(_) => "long",
        Bson::Double(_) => "double",
        Bson::DateTime(_) => "date",
        Bson::ObjectId(_) => "objectId",
        Bson::Null => "null",
        Bson::Document(_) => "object",
        Bson::Array(_) => "array",
        Bson::Boolean(_) => "bool",
        _ => "other",
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

fn path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}
