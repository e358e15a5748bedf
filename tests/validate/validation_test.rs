use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use medrecord_loader::ClinicalSchemas;
use medrecord_loader::clean::{DateFormatConfig, clean_batch};
use medrecord_loader::validate::validate_rows;

const PATIENT_COLUMNS: [&str; 5] = ["Name", "Age", "Gender", "Blood Type", "Medical Condition"];

/// Build a raw batch from rows sharing one column set
fn raw<'a, R: AsRef<[Option<&'a str>]>>(columns: &[&str], rows: &[R]) -> RecordBatch {
    let fields: Vec<Field> = columns
        .iter()
        .map(|name| Field::new(*name, DataType::Utf8, true))
        .collect();
    let arrays: Vec<ArrayRef> = (0..columns.len())
        .map(|c| {
            let values: Vec<Option<&str>> = rows.iter().map(|row| row.as_ref()[c]).collect();
            Arc::new(StringArray::from(values)) as ArrayRef
        })
        .collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
}

fn validity(batch: &RecordBatch) -> medrecord_loader::Result<BooleanArray> {
    let cleaned = clean_batch(batch, &DateFormatConfig::default())?;
    let report = validate_rows(&cleaned.batch, &ClinicalSchemas::new(), &cleaned.coercion_ok)?;
    assert_eq!(report.valid_rows + report.invalid_rows, batch.num_rows());
    Ok(report.mask)
}

#[test]
fn patient_constraints() -> medrecord_loader::Result<()> {
    let batch = raw(
        &PATIENT_COLUMNS,
        &[
            &[Some("Ok"), Some("30"), Some("male"), Some("a+"), Some("asthma")],
            &[Some("Old"), Some("126"), Some("Male"), Some("A+"), Some("Asthma")],
            &[Some("Neg"), Some("-5"), Some("Male"), Some("A+"), Some("Asthma")],
            &[Some("Alien"), Some("30"), Some("Unknown"), Some("A+"), Some("Asthma")],
            &[Some("NoBlood"), Some("30"), Some("Male"), None, Some("Asthma")],
            &[Some("BadAge"), Some("abc"), Some("Male"), Some("A+"), Some("Asthma")],
            &[Some("Flu"), Some("30"), Some("Male"), Some("A+"), Some("Influenza")],
        ],
    );
    assert_eq!(
        validity(&batch)?,
        BooleanArray::from(vec![true, false, false, false, false, false, false])
    );
    Ok(())
}

#[test]
fn discharge_before_admission_is_invalid() -> medrecord_loader::Result<()> {
    let mut columns = PATIENT_COLUMNS.to_vec();
    columns.extend(["Date of Admission", "Discharge Date"]);
    let patient = [Some("A"), Some("30"), Some("Male"), Some("A+"), Some("Asthma")];

    let row = |admitted: Option<&'static str>, discharged: Option<&'static str>| {
        let mut values = patient.to_vec();
        values.extend([admitted, discharged]);
        values
    };
    let before = row(Some("2023-02-01"), Some("2023-01-01"));
    let after = row(Some("2023-01-01"), Some("2023-02-01"));
    let same_day = row(Some("2023-01-01"), Some("2023-01-01"));
    let open = row(Some("2023-01-01"), None);

    let batch = raw(&columns, &[&before, &after, &same_day, &open]);
    assert_eq!(
        validity(&batch)?,
        BooleanArray::from(vec![false, true, true, true])
    );
    Ok(())
}

#[test]
fn child_ranges_and_enums_apply_when_present() -> medrecord_loader::Result<()> {
    let mut columns = PATIENT_COLUMNS.to_vec();
    columns.extend(["Room Number", "Billing Amount", "Admission Type", "Test Results"]);
    let patient = [Some("A"), Some("30"), Some("Male"), Some("A+"), Some("Asthma")];

    let row = |values: [Option<&'static str>; 4]| {
        let mut full = patient.to_vec();
        full.extend(values);
        full
    };
    let fine = row([Some("12"), Some("0"), Some("urgent"), Some("normal")]);
    let room_zero = row([Some("0"), None, None, None]);
    let negative_bill = row([None, Some("-1.5"), None, None]);
    let bad_type = row([None, None, Some("Walk-In"), None]);
    let bad_result = row([None, None, None, Some("Pending")]);
    let all_missing = row([None, None, None, None]);

    let batch = raw(
        &columns,
        &[&fine, &room_zero, &negative_bill, &bad_type, &bad_result, &all_missing],
    );
    assert_eq!(
        validity(&batch)?,
        BooleanArray::from(vec![true, false, false, false, false, true])
    );
    Ok(())
}

#[test]
fn report_names_failing_rules() -> medrecord_loader::Result<()> {
    let batch = raw(
        &PATIENT_COLUMNS,
        &[&[Some("Neg"), Some("-5"), Some("Female"), Some("O-"), Some("Cancer")]],
    );
    let cleaned = clean_batch(&batch, &DateFormatConfig::default())?;
    let report = validate_rows(&cleaned.batch, &ClinicalSchemas::new(), &cleaned.coercion_ok)?;
    assert_eq!(report.invalid_rows, 1);
    assert!(report.describe().contains("Age out of range"));
    Ok(())
}
