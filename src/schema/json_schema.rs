//! Rendering of typed schemas into server-side `$jsonSchema` validators.

use mongodb::bson::{Bson, Document, doc};

use crate::schema::types::{BsonKind, CollectionSchema, Constraint, FieldRule};

/// Render the `$jsonSchema` body for a collection
///
/// Documents may only carry the declared fields plus `_id`.
#[must_use]
pub fn json_schema(schema: &CollectionSchema) -> Document {
    let mut properties = Document::new();
    properties.insert("_id", doc! { "bsonType": BsonKind::ObjectId.alias() });
    for rule in &schema.fields {
        properties.insert(rule.name, field_schema(rule));
    }

    let required: Vec<Bson> = schema.required_fields().map(Bson::from).collect();

    doc! {
        "bsonType": "object",
        "title": schema.title,
        "required": required,
        "additionalProperties": false,
        "properties": properties,
    }
}

/// The full validator document, `{ "$jsonSchema": ... }`
#[must_use]
pub fn validator_document(schema: &CollectionSchema) -> Document {
    doc! { "$jsonSchema": json_schema(schema) }
}

fn field_schema(rule: &FieldRule) -> Document {
    let mut spec = Document::new();

    if rule.nullable {
        spec.insert(
            "bsonType",
            vec![Bson::from(rule.kind.alias()), Bson::from("null")],
        );
    } else {
        spec.insert("bsonType", rule.kind.alias());
    }

    match &rule.constraint {
        Constraint::None => {}
        Constraint::OneOf(labels) => {
            let mut values: Vec<Bson> = labels.iter().map(|l| Bson::from(*l)).collect();
            if rule.nullable {
                values.push(Bson::Null);
            }
            spec.insert("enum", values);
        }
        Constraint::Range { minimum, maximum } => {
            if let Some(min) = minimum {
                spec.insert("minimum", bound(rule.kind, *min));
            }
            if let Some(max) = maximum {
                spec.insert("maximum", bound(rule.kind, *max));
            }
        }
    }

    spec
}

#[allow(clippy::cast_possible_truncation)]
fn bound(kind: BsonKind, value: f64) -> Bson {
    match kind {
        BsonKind::Int => Bson::Int32(value as i32),
        _ => Bson::Double(value),
    }
}
