//! The four clinical collection definitions.

use crate::models::{AdmissionType, BloodType, Gender, MedicalCondition, TestResult};
use crate::schema::columns::{
    ADMISSION_TYPE, AGE, BILLING_AMOUNT, BLOOD_TYPE, DATE_OF_ADMISSION, DISCHARGE_DATE, DOCTOR,
    GENDER, HOSPITAL, INSURANCE_PROVIDER, MEDICAL_CONDITION, MEDICATION, NAME, ROOM_NUMBER,
    TEST_RESULTS,
};
use crate::schema::types::{BsonKind, CollectionRole, CollectionSchema, FieldRule, IndexSpec};

pub const PATIENTS: &str = "Patients";
pub const ADMISSIONS: &str = "Admissions";
pub const MEDICAL_RECORDS: &str = "MedicalRecords";
pub const BILLING: &str = "Billing";

/// Back-reference from a child document to its patient
pub const PATIENT_ID: &str = "patient_id";

/// Fields whose combination identifies a patient across runs
pub const PATIENT_KEY_FIELDS: [&str; 5] = [NAME, AGE, GENDER, BLOOD_TYPE, MEDICAL_CONDITION];

#[must_use]
pub fn patient_schema() -> CollectionSchema {
    CollectionSchema::new(PATIENTS, "Patient Validation", CollectionRole::Parent)
        .field(FieldRule::new(NAME, BsonKind::String).required())
        .field(
            FieldRule::new(AGE, BsonKind::Int)
                .required()
                .range(Some(0.0), Some(125.0)),
        )
        .field(
            FieldRule::new(GENDER, BsonKind::String)
                .required()
                .one_of(Gender::NAMES),
        )
        .field(
            FieldRule::new(BLOOD_TYPE, BsonKind::String)
                .required()
                .one_of(BloodType::NAMES),
        )
        .field(
            FieldRule::new(MEDICAL_CONDITION, BsonKind::String)
                .required()
                .one_of(MedicalCondition::NAMES),
        )
        .index(IndexSpec::ascending(&PATIENT_KEY_FIELDS).unique())
}

#[must_use]
pub fn admission_schema() -> CollectionSchema {
    CollectionSchema::new(ADMISSIONS, "Admission Validation", CollectionRole::Child)
        .field(FieldRule::new(PATIENT_ID, BsonKind::ObjectId).required())
        .field(FieldRule::new(DATE_OF_ADMISSION, BsonKind::Date).required())
        .field(
            FieldRule::new(ADMISSION_TYPE, BsonKind::String)
                .required()
                .nullable()
                .one_of(AdmissionType::NAMES),
        )
        .field(
            FieldRule::new(ROOM_NUMBER, BsonKind::Int)
                .nullable()
                .range(Some(1.0), None),
        )
        .field(FieldRule::new(DISCHARGE_DATE, BsonKind::Date).nullable())
        .ordering(DATE_OF_ADMISSION, DISCHARGE_DATE)
        .index(IndexSpec::ascending(&[PATIENT_ID, DATE_OF_ADMISSION]))
}

#[must_use]
pub fn medical_record_schema() -> CollectionSchema {
    CollectionSchema::new(
        MEDICAL_RECORDS,
        "Medical Record Validation",
        CollectionRole::Child,
    )
    .field(FieldRule::new(PATIENT_ID, BsonKind::ObjectId).required())
    .field(FieldRule::new(DOCTOR, BsonKind::String).required())
    .field(FieldRule::new(HOSPITAL, BsonKind::String).required())
    .field(FieldRule::new(MEDICATION, BsonKind::String).nullable())
    .field(
        FieldRule::new(TEST_RESULTS, BsonKind::String)
            .nullable()
            .one_of(TestResult::NAMES),
    )
    .index(IndexSpec::ascending(&[PATIENT_ID, DOCTOR]))
}

#[must_use]
pub fn billing_schema() -> CollectionSchema {
    CollectionSchema::new(BILLING, "Billing Validation", CollectionRole::Child)
        .field(FieldRule::new(PATIENT_ID, BsonKind::ObjectId).required())
        .field(
            FieldRule::new(BILLING_AMOUNT, BsonKind::Double)
                .nullable()
                .range(Some(0.0), None),
        )
        .field(FieldRule::new(INSURANCE_PROVIDER, BsonKind::String).nullable())
        .index(IndexSpec::ascending(&[PATIENT_ID, BILLING_AMOUNT]))
}

/// All four schemas, constructed once and shared by validation and provisioning
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicalSchemas {
    pub patients: CollectionSchema,
    pub admissions: CollectionSchema,
    pub medical_records: CollectionSchema,
    pub billing: CollectionSchema,
}

impl ClinicalSchemas {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patients: patient_schema(),
            admissions: admission_schema(),
            medical_records: medical_record_schema(),
            billing: billing_schema(),
        }
    }

    /// Parent first, then children in write order
    #[must_use]
    pub fn all(&self) -> [&CollectionSchema; 4] {
        [
            &self.patients,
            &self.admissions,
            &self.medical_records,
            &self.billing,
        ]
    }
}

impl Default for ClinicalSchemas {
    fn default() -> Self {
        Self::new()
    }
}
