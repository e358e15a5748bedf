//! Typed documents for the four clinical collections
//!
//! A `Patient` is the parent document; the three child records are built
//! without an id and receive their `patient_id` only once the parent write
//! has resolved one.

use std::fmt;

use chrono::NaiveDateTime;
use mongodb::bson::{Bson, DateTime, Document, doc, oid::ObjectId};

use crate::models::types::{AdmissionType, BloodType, Gender, MedicalCondition, TestResult};
use crate::schema::collections::{PATIENT_ID, PATIENT_KEY_FIELDS};
use crate::schema::columns;
use crate::store::WriteOp;

/// Convert a tz-naive UTC instant to a BSON date
#[must_use]
pub fn bson_datetime(value: NaiveDateTime) -> Bson {
    Bson::DateTime(DateTime::from_millis(value.and_utc().timestamp_millis()))
}

fn optional<T: Into<Bson>>(value: Option<T>) -> Bson {
    value.map_or(Bson::Null, Into::into)
}

/// A patient document. The full field set doubles as the natural key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Patient {
    pub name: String,
    pub age: i32,
    pub gender: Gender,
    pub blood_type: BloodType,
    pub medical_condition: MedicalCondition,
}

impl Patient {
    /// Render the stored document (without `_id`)
    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        document.insert(columns::NAME, self.name.as_str());
        document.insert(columns::AGE, self.age);
        document.insert(columns::GENDER, self.gender.as_str());
        document.insert(columns::BLOOD_TYPE, self.blood_type.as_str());
        document.insert(columns::MEDICAL_CONDITION, self.medical_condition.as_str());
        document
    }

    /// Equality filter over the natural key fields
    #[must_use]
    pub fn key_filter(&self) -> Document {
        let full = self.to_document();
        PATIENT_KEY_FIELDS
            .iter()
            .filter_map(|field| full.get(*field).map(|v| ((*field).to_string(), v.clone())))
            .collect()
    }

    /// Upsert matching on the natural key and setting the full document
    #[must_use]
    pub fn upsert_op(&self) -> WriteOp {
        WriteOp::Upsert {
            filter: self.key_filter(),
            update: doc! { "$set": self.to_document() },
        }
    }

    /// Rebuild a patient from a stored document, if every key field is present
    #[must_use]
    pub fn from_document(document: &Document) -> Option<Self> {
        Some(Self {
            name: document.get_str(columns::NAME).ok()?.to_string(),
            age: document.get_i32(columns::AGE).ok()?,
            gender: document.get_str(columns::GENDER).ok()?.parse().ok()?,
            blood_type: document.get_str(columns::BLOOD_TYPE).ok()?.parse().ok()?,
            medical_condition: document
                .get_str(columns::MEDICAL_CONDITION)
                .ok()?
                .parse()
                .ok()?,
        })
    }
}

impl fmt::Display for Patient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}, {}, {})",
            self.name, self.age, self.gender, self.blood_type, self.medical_condition
        )
    }
}

/// Admission fields of one source row
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionRecord {
    pub date_of_admission: NaiveDateTime,
    pub admission_type: Option<AdmissionType>,
    pub room_number: Option<i32>,
    pub discharge_date: Option<NaiveDateTime>,
}

impl AdmissionRecord {
    #[must_use]
    pub fn to_document(&self, patient_id: ObjectId) -> Document {
        let mut document = Document::new();
        document.insert(PATIENT_ID, patient_id);
        document.insert(columns::DATE_OF_ADMISSION, bson_datetime(self.date_of_admission));
        document.insert(
            columns::ADMISSION_TYPE,
            optional(self.admission_type.map(AdmissionType::as_str)),
        );
        document.insert(columns::ROOM_NUMBER, optional(self.room_number));
        document.insert(
            columns::DISCHARGE_DATE,
            self.discharge_date.map_or(Bson::Null, bson_datetime),
        );
        document
    }
}

/// Medical record fields of one source row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicalRecordEntry {
    pub doctor: String,
    pub hospital: String,
    pub medication: Option<String>,
    pub test_results: Option<TestResult>,
}

impl MedicalRecordEntry {
    #[must_use]
    pub fn to_document(&self, patient_id: ObjectId) -> Document {
        let mut document = Document::new();
        document.insert(PATIENT_ID, patient_id);
        document.insert(columns::DOCTOR, self.doctor.as_str());
        document.insert(columns::HOSPITAL, self.hospital.as_str());
        document.insert(columns::MEDICATION, optional(self.medication.as_deref()));
        document.insert(
            columns::TEST_RESULTS,
            optional(self.test_results.map(TestResult::as_str)),
        );
        document
    }
}

/// Billing fields of one source row
#[derive(Debug, Clone, PartialEq)]
pub struct BillingEntry {
    pub billing_amount: Option<f64>,
    pub insurance_provider: Option<String>,
}

impl BillingEntry {
    #[must_use]
    pub fn to_document(&self, patient_id: ObjectId) -> Document {
        let mut document = Document::new();
        document.insert(PATIENT_ID, patient_id);
        document.insert(columns::BILLING_AMOUNT, optional(self.billing_amount));
        document.insert(
            columns::INSURANCE_PROVIDER,
            optional(self.insurance_provider.as_deref()),
        );
        document
    }
}
