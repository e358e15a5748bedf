//! Typed, declarative collection schemas.
//!
//! A `CollectionSchema` is built once at startup and read by both the
//! vectorized row validator and the `$jsonSchema` renderer, so the local and
//! remote rule sets come from the same definition.

/// BSON storage type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BsonKind {
    String,
    /// 32-bit integer (`int`)
    Int,
    Double,
    Date,
    ObjectId,
}

impl BsonKind {
    /// The `bsonType` alias used by `$jsonSchema`
    #[must_use]
    pub const fn alias(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Double => "double",
            Self::Date => "date",
            Self::ObjectId => "objectId",
        }
    }
}

/// Value constraint beyond the storage type
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    None,
    /// Value must be one of the listed labels
    OneOf(&'static [&'static str]),
    /// Inclusive numeric bounds
    Range {
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
}

/// Validation rule for a single field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: BsonKind,
    /// The key must be present in the document
    pub required: bool,
    /// `null` is an accepted value
    pub nullable: bool,
    pub constraint: Constraint,
}

impl FieldRule {
    #[must_use]
    pub const fn new(name: &'static str, kind: BsonKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            nullable: false,
            constraint: Constraint::None,
        }
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub const fn one_of(mut self, labels: &'static [&'static str]) -> Self {
        self.constraint = Constraint::OneOf(labels);
        self
    }

    #[must_use]
    pub const fn range(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.constraint = Constraint::Range { minimum, maximum };
        self
    }
}

/// Cross-field rule: `later` must not precede `earlier` when both are present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldOrder {
    pub earlier: &'static str,
    pub later: &'static str,
}

/// Whether a collection holds parent documents or references them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionRole {
    /// Required fields gate the whole source row
    Parent,
    /// Built only when its own required fields are present
    Child,
}

/// Ascending index over one or more fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub fields: Vec<&'static str>,
    pub unique: bool,
}

impl IndexSpec {
    #[must_use]
    pub fn ascending(fields: &[&'static str]) -> Self {
        Self {
            fields: fields.to_vec(),
            unique: false,
        }
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Server-style index name, e.g. `patient_id_1_Doctor_1`
    #[must_use]
    pub fn name(&self) -> String {
        self.fields
            .iter()
            .map(|f| format!("{f}_1"))
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Declarative definition of one collection
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSchema {
    pub name: &'static str,
    pub title: &'static str,
    pub role: CollectionRole,
    pub fields: Vec<FieldRule>,
    pub orderings: Vec<FieldOrder>,
    pub indexes: Vec<IndexSpec>,
}

impl CollectionSchema {
    #[must_use]
    pub const fn new(name: &'static str, title: &'static str, role: CollectionRole) -> Self {
        Self {
            name,
            title,
            role,
            fields: Vec::new(),
            orderings: Vec::new(),
            indexes: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, rule: FieldRule) -> Self {
        self.fields.push(rule);
        self
    }

    #[must_use]
    pub fn ordering(mut self, earlier: &'static str, later: &'static str) -> Self {
        self.orderings.push(FieldOrder { earlier, later });
        self
    }

    #[must_use]
    pub fn index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    /// Mutable access, used to tighten a rule for a single deployment
    pub fn rule_mut(&mut self, name: &str) -> Option<&mut FieldRule> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    /// Names of the fields that must be present
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }
}
