use std::io::Write;
use std::path::PathBuf;

use medrecord_loader::{
    ClinicalSchemas, LoaderConfig, MemoryStore, Result, provision_schemas,
};
use tempfile::TempDir;

pub const HEADER: &str = "Name,Age,Gender,Blood Type,Medical Condition,Date of Admission,Doctor,Hospital,Insurance Provider,Billing Amount,Room Number,Admission Type,Discharge Date,Medication,Test Results";

pub const JOHN: &str = "John Doe,35,Male,A+,Diabetes,2023-01-15,Dr. Brown,City General,HealthPlus,2500.75,305,Urgent,2023-01-22,Insulin,Normal";

pub const JANE: &str = "Jane Smith,42,Female,B-,Hypertension,2023-02-20,Dr. Taylor,Metro Hospital,MediCare,3200.50,412,Elective,2023-03-01,Lisinopril,Abnormal";

/// A CSV file living in its own temporary directory
pub struct CsvFixture {
    _dir: TempDir,
    pub path: PathBuf,
}

/// Write `HEADER` followed by `rows` to a temporary file
pub fn write_csv(rows: &[&str]) -> CsvFixture {
    let mut content = String::from(HEADER);
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    write_raw(&content)
}

/// Write arbitrary content to a temporary `.csv` file
pub fn write_raw(content: &str) -> CsvFixture {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("patients.csv");
    let mut file = std::fs::File::create(&path).expect("create csv");
    file.write_all(content.as_bytes()).expect("write csv");
    CsvFixture { _dir: dir, path }
}

/// Loader configuration for tests: given chunk size, no spinner
pub fn test_config(fixture: &CsvFixture, chunk_size: usize) -> LoaderConfig {
    LoaderConfig::default()
        .with_csv_path(&fixture.path)
        .with_progress(false)
        .with_chunk_size(chunk_size)
        .expect("positive chunk size")
}

/// An in-memory store with validators and indexes already applied
pub async fn provisioned_store(schemas: &ClinicalSchemas) -> Result<MemoryStore> {
    let store = MemoryStore::new("UnitTestDB");
    provision_schemas(&store, schemas).await?;
    Ok(store)
}
