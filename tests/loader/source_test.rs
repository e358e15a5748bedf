use medrecord_loader::{CsvChunkSource, LoaderError, Result};

use crate::utils::{JANE, JOHN, write_csv, write_raw};

#[test]
fn chunks_respect_the_chunk_size() -> Result<()> {
    let fixture = write_csv(&[JOHN, JANE, JOHN]);
    let sizes: Vec<usize> = CsvChunkSource::open(&fixture.path, b',', 2)?
        .map(|batch| batch.map(|b| b.num_rows()))
        .collect::<Result<_>>()?;
    assert_eq!(sizes, vec![2, 1]);
    Ok(())
}

#[test]
fn header_only_file_has_no_chunks() -> Result<()> {
    let fixture = write_csv(&[]);
    let source = CsvChunkSource::open(&fixture.path, b',', 10)?;
    assert_eq!(source.schema().fields().len(), 15);
    assert_eq!(source.count(), 0);
    Ok(())
}

#[test]
fn zero_byte_file_is_empty() -> Result<()> {
    let fixture = write_raw("");
    assert_eq!(CsvChunkSource::open(&fixture.path, b',', 10)?.count(), 0);
    Ok(())
}

#[test]
fn missing_required_column_is_a_header_error() {
    let fixture = write_raw("Name,Age,Gender\nJohn,35,Male\n");
    let err = CsvChunkSource::open(&fixture.path, b',', 10).unwrap_err();
    assert!(matches!(err, LoaderError::Header(ref msg) if msg.contains("Blood Type")));
}

#[test]
fn semicolon_delimiter() -> Result<()> {
    let fixture = write_raw(
        "Name;Age;Gender;Blood Type;Medical Condition\nJohn Doe;35;Male;A+;Diabetes\n",
    );
    let batches: Vec<_> = CsvChunkSource::open(&fixture.path, b';', 10)?.collect::<Result<_>>()?;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].num_columns(), 5);
    Ok(())
}

#[test]
fn missing_file_reports_path() {
    let err = CsvChunkSource::open(std::path::Path::new("/nonexistent/patients.csv"), b',', 10)
        .unwrap_err();
    assert!(err.to_string().contains("/nonexistent/patients.csv"));
}
