//! Typed row extraction from validated batches.

use arrow::array::{Array, Float64Array, Int32Array, StringArray, TimestampMillisecondArray};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;

use crate::error::Result;
use crate::models::{AdmissionRecord, BillingEntry, MedicalRecordEntry, Patient};
use crate::schema::columns::{
    ADMISSION_TYPE, AGE, BILLING_AMOUNT, BLOOD_TYPE, DATE_OF_ADMISSION, DISCHARGE_DATE, DOCTOR,
    GENDER, HOSPITAL, INSURANCE_PROVIDER, MEDICAL_CONDITION, MEDICATION, NAME, ROOM_NUMBER,
    TEST_RESULTS,
};
use crate::utils::arrow::typed_column;

/// One valid source row split into its parent and optional children
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub patient: Patient,
    pub admission: Option<AdmissionRecord>,
    pub medical: Option<MedicalRecordEntry>,
    pub billing: Option<BillingEntry>,
}

/// Column views over a cleaned batch
struct RowColumns<'a> {
    name: &'a StringArray,
    age: &'a Int32Array,
    gender: &'a StringArray,
    blood_type: &'a StringArray,
    medical_condition: &'a StringArray,
    date_of_admission: &'a TimestampMillisecondArray,
    admission_type: &'a StringArray,
    room_number: &'a Int32Array,
    discharge_date: &'a TimestampMillisecondArray,
    doctor: &'a StringArray,
    hospital: &'a StringArray,
    medication: &'a StringArray,
    test_results: &'a StringArray,
    billing_amount: &'a Float64Array,
    insurance_provider: &'a StringArray,
}

impl<'a> RowColumns<'a> {
    fn new(batch: &'a RecordBatch) -> Result<Self> {
        Ok(Self {
            name: typed_column(batch, NAME)?,
            age: typed_column(batch, AGE)?,
            gender: typed_column(batch, GENDER)?,
            blood_type: typed_column(batch, BLOOD_TYPE)?,
            medical_condition: typed_column(batch, MEDICAL_CONDITION)?,
            date_of_admission: typed_column(batch, DATE_OF_ADMISSION)?,
            admission_type: typed_column(batch, ADMISSION_TYPE)?,
            room_number: typed_column(batch, ROOM_NUMBER)?,
            discharge_date: typed_column(batch, DISCHARGE_DATE)?,
            doctor: typed_column(batch, DOCTOR)?,
            hospital: typed_column(batch, HOSPITAL)?,
            medication: typed_column(batch, MEDICATION)?,
            test_results: typed_column(batch, TEST_RESULTS)?,
            billing_amount: typed_column(batch, BILLING_AMOUNT)?,
            insurance_provider: typed_column(batch, INSURANCE_PROVIDER)?,
        })
    }

    fn row(&self, i: usize) -> Result<SourceRow> {
        let patient = Patient {
            name: required_str(self.name, i, NAME)?.to_string(),
            age: required(self.age.is_valid(i).then(|| self.age.value(i)), AGE)?,
            gender: required_str(self.gender, i, GENDER)?.parse()?,
            blood_type: required_str(self.blood_type, i, BLOOD_TYPE)?.parse()?,
            medical_condition: required_str(self.medical_condition, i, MEDICAL_CONDITION)?
                .parse()?,
        };

        let admission = match timestamp(self.date_of_admission, i) {
            Some(date_of_admission) => Some(AdmissionRecord {
                date_of_admission,
                admission_type: text(self.admission_type, i).map(str::parse).transpose()?,
                room_number: self.room_number.is_valid(i).then(|| self.room_number.value(i)),
                discharge_date: timestamp(self.discharge_date, i),
            }),
            None => None,
        };

        let medical = match (text(self.doctor, i), text(self.hospital, i)) {
            (Some(doctor), Some(hospital)) => Some(MedicalRecordEntry {
                doctor: doctor.to_string(),
                hospital: hospital.to_string(),
                medication: text(self.medication, i).map(str::to_string),
                test_results: text(self.test_results, i).map(str::parse).transpose()?,
            }),
            _ => None,
        };

        let billing_amount = self
            .billing_amount
            .is_valid(i)
            .then(|| self.billing_amount.value(i));
        let insurance_provider = text(self.insurance_provider, i).map(str::to_string);
        let billing = (billing_amount.is_some() || insurance_provider.is_some()).then(|| {
            BillingEntry {
                billing_amount,
                insurance_provider,
            }
        });

        Ok(SourceRow {
            patient,
            admission,
            medical,
            billing,
        })
    }
}

fn text(array: &StringArray, i: usize) -> Option<&str> {
    array.is_valid(i).then(|| array.value(i))
}

fn timestamp(array: &TimestampMillisecondArray, i: usize) -> Option<NaiveDateTime> {
    if array.is_valid(i) {
        array.value_as_datetime(i)
    } else {
        None
    }
}

fn required<T>(value: Option<T>, column: &str) -> Result<T> {
    value.ok_or_else(|| {
        crate::error::LoaderError::Schema(format!("Validated row is missing '{column}'"))
    })
}

fn required_str<'a>(array: &'a StringArray, i: usize, column: &str) -> Result<&'a str> {
    required(text(array, i), column)
}

/// Convert every row of an already-validated batch
///
/// # Errors
/// Returns an error if the batch does not have the cleaned schema or a row
/// violates a rule the validator should have caught.
pub fn extract_rows(batch: &RecordBatch) -> Result<Vec<SourceRow>> {
    let columns = RowColumns::new(batch)?;
    (0..batch.num_rows()).map(|i| columns.row(i)).collect()
}
