use medrecord_loader::schema::{
    ADMISSIONS, BILLING, Constraint, MEDICAL_RECORDS, PATIENT_ID, PATIENTS,
};
use medrecord_loader::store::DocumentStore;
use medrecord_loader::{ChunkLoader, ClinicalSchemas, MemoryStore, Result, run_load};
use mongodb::bson::{Bson, doc};

use crate::utils::{JANE, JOHN, provisioned_store, test_config, write_csv, write_raw};

const COLLECTIONS: [&str; 4] = [PATIENTS, ADMISSIONS, MEDICAL_RECORDS, BILLING];

async fn counts(store: &MemoryStore) -> Result<Vec<u64>> {
    let mut counts = Vec::with_capacity(COLLECTIONS.len());
    for collection in COLLECTIONS {
        counts.push(store.count_documents(collection, doc! {}).await?);
    }
    Ok(counts)
}

#[tokio::test]
async fn full_load_happy_path() -> Result<()> {
    let schemas = ClinicalSchemas::new();
    let store = provisioned_store(&schemas).await?;
    let fixture = write_csv(&[JOHN, JANE]);
    let config = test_config(&fixture, 1);

    let summary = ChunkLoader::new(&store, &schemas, &config)
        .load_file(&fixture.path)
        .await?;

    assert_eq!(summary.chunks, 2);
    assert_eq!(summary.rows_read, 2);
    assert_eq!(summary.rows_valid, 2);
    assert_eq!(counts(&store).await?, vec![2, 2, 2, 2]);

    let john = store
        .find(PATIENTS, doc! { "Name": "John Doe" })
        .await?
        .pop()
        .expect("John Doe stored");
    assert_eq!(john.get("Age"), Some(&Bson::Int32(35)));
    assert_eq!(john.get_str("Gender").ok(), Some("Male"));
    assert_eq!(john.get_str("Blood Type").ok(), Some("A+"));

    let john_id = john.get_object_id("_id").expect("object id");
    let admission = store
        .find(ADMISSIONS, doc! { PATIENT_ID: john_id })
        .await?
        .pop()
        .expect("admission for John Doe");
    assert_eq!(admission.get("Room Number"), Some(&Bson::Int32(305)));
    assert!(matches!(admission.get("Date of Admission"), Some(Bson::DateTime(_))));
    Ok(())
}

#[tokio::test]
async fn rerun_upserts_patients_and_appends_children() -> Result<()> {
    let schemas = ClinicalSchemas::new();
    let store = provisioned_store(&schemas).await?;
    let fixture = write_csv(&[JOHN, JANE]);
    let config = test_config(&fixture, 5000);
    let loader = ChunkLoader::new(&store, &schemas, &config);

    let first = loader.load_file(&fixture.path).await?;
    let second = loader.load_file(&fixture.path).await?;

    assert_eq!(first.counts(PATIENTS).created, 2);
    assert_eq!(second.counts(PATIENTS).created, 0);
    assert_eq!(second.counts(PATIENTS).written, 2);
    assert_eq!(counts(&store).await?, vec![2, 4, 4, 4]);
    Ok(())
}

#[tokio::test]
async fn children_reference_existing_patients() -> Result<()> {
    let schemas = ClinicalSchemas::new();
    let store = provisioned_store(&schemas).await?;
    let fixture = write_csv(&[JOHN, JANE, JOHN]);
    let config = test_config(&fixture, 2);

    ChunkLoader::new(&store, &schemas, &config)
        .load_file(&fixture.path)
        .await?;

    let patient_ids: Vec<Bson> = store
        .find(PATIENTS, doc! {})
        .await?
        .iter()
        .filter_map(|p| p.get("_id").cloned())
        .collect();
    assert_eq!(patient_ids.len(), 2);

    for collection in [ADMISSIONS, MEDICAL_RECORDS, BILLING] {
        let children = store.find(collection, doc! {}).await?;
        assert_eq!(children.len(), 3, "{collection}");
        for child in &children {
            let reference = child.get(PATIENT_ID).expect("patient_id set");
            assert!(patient_ids.contains(reference), "{collection} orphan");
        }
    }
    Ok(())
}

#[tokio::test]
async fn duplicate_rows_in_one_chunk_share_a_patient() -> Result<()> {
    let schemas = ClinicalSchemas::new();
    let store = provisioned_store(&schemas).await?;
    let fixture = write_csv(&[JOHN, JOHN]);
    let config = test_config(&fixture, 5000);

    let summary = ChunkLoader::new(&store, &schemas, &config)
        .load_file(&fixture.path)
        .await?;

    assert_eq!(summary.counts(PATIENTS).created, 1);
    assert_eq!(summary.orphaned_rows, 0);
    assert_eq!(counts(&store).await?, vec![1, 2, 2, 2]);
    Ok(())
}

#[tokio::test]
async fn invalid_rows_are_dropped() -> Result<()> {
    let schemas = ClinicalSchemas::new();
    let store = provisioned_store(&schemas).await?;
    let fixture = write_csv(&[
        "Bad Guy,20,Alien,O+,Asthma,2023-05-05,Dr. X,Mercy,Aetna,100,1,Urgent,2023-05-06,Aspirin,Normal",
        "Good Guy,30,Male,O+,Asthma,2023-05-05,Dr. X,Mercy,Aetna,100,1,Urgent,2023-05-06,Aspirin,Normal",
    ]);
    let config = test_config(&fixture, 5000);

    let summary = ChunkLoader::new(&store, &schemas, &config)
        .load_file(&fixture.path)
        .await?;

    assert_eq!(summary.rows_rejected, 1);
    assert_eq!(counts(&store).await?, vec![1, 1, 1, 1]);
    assert!(store.find(PATIENTS, doc! { "Name": "Bad Guy" }).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn malformed_row_does_not_affect_its_neighbours() -> Result<()> {
    let schemas = ClinicalSchemas::new();
    let store = provisioned_store(&schemas).await?;
    let fixture = write_csv(&[
        JOHN,
        "Broken Row,abc,Male,A+,Asthma,2023-01-15,Dr. Brown,City General,HealthPlus,10,3,Urgent,2023-01-20,Insulin,Normal",
        JANE,
    ]);
    let config = test_config(&fixture, 5000);

    let summary = ChunkLoader::new(&store, &schemas, &config)
        .load_file(&fixture.path)
        .await?;

    assert_eq!(summary.rows_valid, 2);
    assert_eq!(summary.rows_rejected, 1);
    assert_eq!(counts(&store).await?, vec![2, 2, 2, 2]);
    Ok(())
}

#[tokio::test]
async fn discharge_before_admission_writes_nothing() -> Result<()> {
    let schemas = ClinicalSchemas::new();
    let store = provisioned_store(&schemas).await?;
    let fixture = write_csv(&[
        "Time Traveller,50,Female,AB-,Cancer,2023-03-10,Dr. Who,Tardis General,Gallifrey,500,7,Emergency,2023-03-01,Morphine,Inconclusive",
    ]);
    let config = test_config(&fixture, 5000);

    let summary = ChunkLoader::new(&store, &schemas, &config)
        .load_file(&fixture.path)
        .await?;

    assert_eq!(summary.rows_rejected, 1);
    assert_eq!(counts(&store).await?, vec![0, 0, 0, 0]);
    Ok(())
}

#[tokio::test]
async fn patient_only_rows_create_no_children() -> Result<()> {
    let schemas = ClinicalSchemas::new();
    let store = provisioned_store(&schemas).await?;
    let fixture = write_csv(&["Lone Patient,61,Male,B+,Arthritis,,,,,,,,,,"]);
    let config = test_config(&fixture, 5000);

    let summary = ChunkLoader::new(&store, &schemas, &config)
        .load_file(&fixture.path)
        .await?;

    assert_eq!(summary.rows_valid, 1);
    assert_eq!(counts(&store).await?, vec![1, 0, 0, 0]);
    Ok(())
}

#[tokio::test]
async fn empty_inputs_are_not_errors() -> Result<()> {
    let schemas = ClinicalSchemas::new();
    let store = provisioned_store(&schemas).await?;

    for fixture in [write_csv(&[]), write_raw("")] {
        let config = test_config(&fixture, 5000);
        let summary = ChunkLoader::new(&store, &schemas, &config)
            .load_file(&fixture.path)
            .await?;
        assert_eq!(summary.chunks, 0);
        assert_eq!(summary.rows_read, 0);
        assert_eq!(summary.remote_rejections(), 0);
    }
    assert_eq!(counts(&store).await?, vec![0, 0, 0, 0]);
    Ok(())
}

#[tokio::test]
async fn counts_reconcile_for_any_chunk_size() -> Result<()> {
    let rows = [
        JOHN,
        JANE,
        "Neg Age,-5,Male,A+,Asthma,2023-01-01,Dr. A,H,P,1,1,Urgent,2023-01-02,M,Normal",
        "Unknown,40,Unknown,A+,Asthma,2023-01-01,Dr. A,H,P,1,1,Urgent,2023-01-02,M,Normal",
        "No Blood,40,Male,,Asthma,2023-01-01,Dr. A,H,P,1,1,Urgent,2023-01-02,M,Normal",
    ];

    for chunk_size in [1, 5000] {
        let schemas = ClinicalSchemas::new();
        let store = provisioned_store(&schemas).await?;
        let fixture = write_csv(&rows);
        let config = test_config(&fixture, chunk_size);

        let summary = ChunkLoader::new(&store, &schemas, &config)
            .load_file(&fixture.path)
            .await?;

        assert_eq!(summary.rows_read, 5);
        assert_eq!(summary.rows_read, summary.rows_valid + summary.rows_rejected);
        assert_eq!(summary.rows_rejected, 3);
        let patients = summary.counts(PATIENTS);
        assert_eq!(patients.attempted, summary.rows_valid);
        assert_eq!(patients.written + summary.orphaned_rows, summary.rows_valid);
        for collection in COLLECTIONS {
            let stored = store.count_documents(collection, doc! {}).await?;
            assert_eq!(stored, summary.counts(collection).created as u64, "{collection}");
        }
    }
    Ok(())
}

#[tokio::test]
async fn stricter_remote_rules_are_counted_and_replayed() -> Result<()> {
    let mut remote = ClinicalSchemas::new();
    if let Some(rule) = remote.billing.rule_mut("Billing Amount") {
        rule.constraint = Constraint::Range {
            minimum: Some(0.0),
            maximum: Some(1000.0),
        };
    }
    let store = provisioned_store(&remote).await?;

    let local = ClinicalSchemas::new();
    let fixture = write_csv(&[
        JOHN,
        JANE,
        "Cheap Visit,28,Female,O+,Obesity,2023-04-01,Dr. Lee,Clinic,Aetna,150.00,2,Elective,2023-04-02,None,Normal",
    ]);
    let config = test_config(&fixture, 5000);

    let summary = ChunkLoader::new(&store, &local, &config)
        .load_file(&fixture.path)
        .await?;

    let billing = summary.counts(BILLING);
    assert_eq!(billing.attempted, 3);
    assert_eq!(billing.rejected, 1);
    assert_eq!(billing.replay_failed, 1);
    assert_eq!(billing.written, 1);
    assert_eq!(summary.remote_rejections(), 2);
    assert_eq!(counts(&store).await?, vec![3, 3, 3, 1]);
    Ok(())
}

#[tokio::test]
async fn run_load_provisions_before_loading() -> Result<()> {
    let schemas = ClinicalSchemas::new();
    let store = MemoryStore::new("UnitTestDB");
    let fixture = write_csv(&[JOHN]);
    let config = test_config(&fixture, 5000);

    let summary = run_load(&store, &schemas, &config).await?;
    store.close().await?;

    assert_eq!(summary.rows_valid, 1);
    assert!(store.collection_validator(PATIENTS).await?.is_some());
    assert_eq!(store.index_names(PATIENTS)?.len(), 1);
    assert!(store.is_closed());
    Ok(())
}

#[tokio::test]
async fn label_casing_is_normalized_before_writing() -> Result<()> {
    let schemas = ClinicalSchemas::new();
    let store = provisioned_store(&schemas).await?;
    let fixture = write_csv(&[
        "Alpha,20,MALE,A+,Asthma,,,,,,,,,,",
        "Beta,21,male,A+,Asthma,,,,,,,,,,",
        "Gamma,22,  Male ,A+,Asthma,,,,,,,,,,",
    ]);
    let config = test_config(&fixture, 5000);

    let summary = ChunkLoader::new(&store, &schemas, &config)
        .load_file(&fixture.path)
        .await?;

    assert_eq!(summary.rows_valid, 3);
    let males = store.count_documents(PATIENTS, doc! { "Gender": "Male" }).await?;
    assert_eq!(males, 3);
    Ok(())
}
