use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, Float64Array, Int32Array, StringArray, TimestampMillisecondArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use medrecord_loader::clean::{DateFormatConfig, clean_batch, parse_datetime};
use medrecord_loader::utils::arrow::typed_column;

fn raw(columns: &[(&str, Vec<Option<&str>>)]) -> RecordBatch {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, _)| Field::new(*name, DataType::Utf8, true))
        .collect();
    let arrays: Vec<ArrayRef> = columns
        .iter()
        .map(|(_, values)| Arc::new(StringArray::from(values.clone())) as ArrayRef)
        .collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
}

#[test]
fn gender_casing_variants_converge() -> medrecord_loader::Result<()> {
    let batch = raw(&[("Gender", vec![Some("male"), Some("MALE"), Some("Male")])]);
    let cleaned = clean_batch(&batch, &DateFormatConfig::default())?;
    let genders = typed_column::<StringArray>(&cleaned.batch, "Gender")?;
    assert!(genders.iter().all(|g| g == Some("Male")));
    Ok(())
}

#[test]
fn sentinels_are_null_before_coercion() -> medrecord_loader::Result<()> {
    let batch = raw(&[
        ("Billing Amount", vec![Some("N/A"), Some("--"), Some("12.50")]),
        ("Room Number", vec![Some("null"), Some("401.0"), Some("")]),
    ]);
    let cleaned = clean_batch(&batch, &DateFormatConfig::default())?;

    let amounts = typed_column::<Float64Array>(&cleaned.batch, "Billing Amount")?;
    assert_eq!(amounts.null_count(), 2);
    assert!((amounts.value(2) - 12.5).abs() < f64::EPSILON);

    let rooms = typed_column::<Int32Array>(&cleaned.batch, "Room Number")?;
    assert!(rooms.is_null(0));
    assert_eq!(rooms.value(1), 401);
    assert!(rooms.is_null(2));

    assert_eq!(cleaned.coercion_failures(), 0);
    Ok(())
}

#[test]
fn unparseable_date_flags_row() -> medrecord_loader::Result<()> {
    let batch = raw(&[(
        "Date of Admission",
        vec![Some("2023-01-15"), Some("not a date"), None],
    )]);
    let cleaned = clean_batch(&batch, &DateFormatConfig::default())?;
    let dates = typed_column::<TimestampMillisecondArray>(&cleaned.batch, "Date of Admission")?;

    let expected = NaiveDate::from_ymd_opt(2023, 1, 15)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap();
    assert_eq!(dates.value_as_datetime(0), Some(expected));
    assert!(dates.is_null(1));
    assert!(!cleaned.coercion_ok.value(1));
    assert!(cleaned.coercion_ok.value(2));
    Ok(())
}

#[test]
fn offset_datetimes_are_normalized_to_utc() {
    let config = DateFormatConfig::default();
    let parsed = parse_datetime("2023-01-15T10:00:00+02:00", &config).unwrap();
    let expected = NaiveDate::from_ymd_opt(2023, 1, 15)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .unwrap();
    assert_eq!(parsed, expected);
}

#[test]
fn text_columns_are_title_cased() -> medrecord_loader::Result<()> {
    let batch = raw(&[
        ("Name", vec![Some("jOHN dOE")]),
        ("Blood Type", vec![Some("ab+")]),
        ("Medical Condition", vec![Some("DIABETES")]),
    ]);
    let cleaned = clean_batch(&batch, &DateFormatConfig::default())?;
    assert_eq!(typed_column::<StringArray>(&cleaned.batch, "Name")?.value(0), "John Doe");
    assert_eq!(typed_column::<StringArray>(&cleaned.batch, "Blood Type")?.value(0), "AB+");
    assert_eq!(
        typed_column::<StringArray>(&cleaned.batch, "Medical Condition")?.value(0),
        "Diabetes"
    );
    Ok(())
}
