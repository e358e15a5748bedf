//! Domain models for clinical records

pub mod records;
pub mod types;

pub use records::{AdmissionRecord, BillingEntry, MedicalRecordEntry, Patient};
pub use types::{AdmissionType, BloodType, Gender, MedicalCondition, TestResult};
