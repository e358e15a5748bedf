//! Source columns of the clinical CSV and how each one is cleaned.
//!
//! Stored field names are the header names themselves, so these constants are
//! shared by the cleaners, the validators and the document builders.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};

pub const NAME: &str = "Name";
pub const AGE: &str = "Age";
pub const GENDER: &str = "Gender";
pub const BLOOD_TYPE: &str = "Blood Type";
pub const MEDICAL_CONDITION: &str = "Medical Condition";
pub const DATE_OF_ADMISSION: &str = "Date of Admission";
pub const DOCTOR: &str = "Doctor";
pub const HOSPITAL: &str = "Hospital";
pub const INSURANCE_PROVIDER: &str = "Insurance Provider";
pub const BILLING_AMOUNT: &str = "Billing Amount";
pub const ROOM_NUMBER: &str = "Room Number";
pub const ADMISSION_TYPE: &str = "Admission Type";
pub const DISCHARGE_DATE: &str = "Discharge Date";
pub const MEDICATION: &str = "Medication";
pub const TEST_RESULTS: &str = "Test Results";

/// How a raw string column is turned into a typed one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Treatment {
    /// Lowercase then capitalise every word
    TitleCase,
    /// Capitalise the first letter, lowercase the rest
    Capitalize,
    /// Uppercase everything (blood group codes)
    UpperCase,
    /// 32-bit integer; integral floats such as "401.0" are accepted
    Integer,
    /// 64-bit float
    Float,
    /// Date or date-time, normalized to a tz-naive UTC instant
    DateTime,
}

impl Treatment {
    /// Arrow type of the cleaned column
    #[must_use]
    pub fn data_type(self) -> DataType {
        match self {
            Self::TitleCase | Self::Capitalize | Self::UpperCase => DataType::Utf8,
            Self::Integer => DataType::Int32,
            Self::Float => DataType::Float64,
            Self::DateTime => DataType::Timestamp(TimeUnit::Millisecond, None),
        }
    }
}

/// One expected column of the source file
#[derive(Debug, Clone, Copy)]
pub struct SourceColumn {
    pub name: &'static str,
    pub treatment: Treatment,
    /// Whether the header must carry this column
    pub required: bool,
}

const fn column(name: &'static str, treatment: Treatment, required: bool) -> SourceColumn {
    SourceColumn {
        name,
        treatment,
        required,
    }
}

/// The fixed header, in canonical order
pub const SOURCE_COLUMNS: [SourceColumn; 15] = [
    column(NAME, Treatment::TitleCase, true),
    column(AGE, Treatment::Integer, true),
    column(GENDER, Treatment::Capitalize, true),
    column(BLOOD_TYPE, Treatment::UpperCase, true),
    column(MEDICAL_CONDITION, Treatment::TitleCase, true),
    column(DATE_OF_ADMISSION, Treatment::DateTime, false),
    column(DOCTOR, Treatment::TitleCase, false),
    column(HOSPITAL, Treatment::TitleCase, false),
    column(INSURANCE_PROVIDER, Treatment::TitleCase, false),
    column(BILLING_AMOUNT, Treatment::Float, false),
    column(ROOM_NUMBER, Treatment::Integer, false),
    column(ADMISSION_TYPE, Treatment::TitleCase, false),
    column(DISCHARGE_DATE, Treatment::DateTime, false),
    column(MEDICATION, Treatment::TitleCase, false),
    column(TEST_RESULTS, Treatment::TitleCase, false),
];

/// Arrow schema of a cleaned batch
#[must_use]
pub fn typed_schema() -> SchemaRef {
    let fields: Vec<Field> = SOURCE_COLUMNS
        .iter()
        .map(|c| Field::new(c.name, c.treatment.data_type(), true))
        .collect();
    Arc::new(Schema::new(fields))
}

/// Names of the columns the header must carry
pub fn required_columns() -> impl Iterator<Item = &'static str> {
    SOURCE_COLUMNS.iter().filter(|c| c.required).map(|c| c.name)
}
