use medrecord_loader::models::{BloodType, Gender, MedicalCondition, Patient};
use medrecord_loader::provision::{SchemaAction, apply_collection_schema, provision_schemas};
use medrecord_loader::schema::{ADMISSIONS, BILLING, MEDICAL_RECORDS, PATIENTS};
use medrecord_loader::store::{DocumentStore, WriteOp};
use medrecord_loader::{ClinicalSchemas, MemoryStore, Result};
use mongodb::bson::{Bson, Document, doc};

use crate::utils::provisioned_store;

fn valid_patient() -> Document {
    Patient {
        name: "John Doe".to_string(),
        age: 35,
        gender: Gender::Male,
        blood_type: BloodType::APositive,
        medical_condition: MedicalCondition::Diabetes,
    }
    .to_document()
}

async fn insert_patient(store: &MemoryStore, document: Document) -> Result<Option<i32>> {
    let result = store
        .grouped_write(PATIENTS, &[WriteOp::Insert(document)])
        .await?;
    Ok(result.first_error().map(|e| e.code))
}

#[tokio::test]
async fn provisioning_is_idempotent() -> Result<()> {
    let schemas = ClinicalSchemas::new();
    let store = MemoryStore::new("UnitTestDB");

    let first = apply_collection_schema(&store, &schemas.patients).await?;
    let second = apply_collection_schema(&store, &schemas.patients).await?;
    assert_eq!(first, SchemaAction::Created);
    assert_eq!(second, SchemaAction::Modified);

    provision_schemas(&store, &schemas).await?;
    provision_schemas(&store, &schemas).await?;

    let mut names = store.list_collection_names().await?;
    names.sort();
    assert_eq!(names, vec![ADMISSIONS, BILLING, MEDICAL_RECORDS, PATIENTS]);
    for name in [PATIENTS, ADMISSIONS, MEDICAL_RECORDS, BILLING] {
        assert!(store.collection_validator(name).await?.is_some());
    }
    Ok(())
}

#[tokio::test]
async fn indexes_are_declared_per_collection() -> Result<()> {
    let store = provisioned_store(&ClinicalSchemas::new()).await?;
    assert_eq!(
        store.index_names(PATIENTS)?,
        vec!["Name_1_Age_1_Gender_1_Blood Type_1_Medical Condition_1".to_string()]
    );
    assert_eq!(
        store.index_names(ADMISSIONS)?,
        vec!["patient_id_1_Date of Admission_1".to_string()]
    );
    assert_eq!(store.index_names(MEDICAL_RECORDS)?, vec!["patient_id_1_Doctor_1".to_string()]);
    assert_eq!(
        store.index_names(BILLING)?,
        vec!["patient_id_1_Billing Amount_1".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn remote_validator_rejects_bad_patients() -> Result<()> {
    let store = provisioned_store(&ClinicalSchemas::new()).await?;

    let mut negative_age = valid_patient();
    negative_age.insert("Age", -5);
    assert_eq!(insert_patient(&store, negative_age).await?, Some(121));

    let mut unknown_gender = valid_patient();
    unknown_gender.insert("Gender", "Unknown");
    assert_eq!(insert_patient(&store, unknown_gender).await?, Some(121));

    let mut no_blood_type = valid_patient();
    no_blood_type.remove("Blood Type");
    assert_eq!(insert_patient(&store, no_blood_type).await?, Some(121));

    let mut extra_field = valid_patient();
    extra_field.insert("Nickname", "JD");
    assert_eq!(insert_patient(&store, extra_field).await?, Some(121));

    let mut age_as_string = valid_patient();
    age_as_string.insert("Age", Bson::String("35".to_string()));
    assert_eq!(insert_patient(&store, age_as_string).await?, Some(121));

    assert_eq!(insert_patient(&store, valid_patient()).await?, None);
    assert_eq!(store.count_documents(PATIENTS, doc! {}).await?, 1);
    Ok(())
}

#[tokio::test]
async fn natural_key_is_unique() -> Result<()> {
    let store = provisioned_store(&ClinicalSchemas::new()).await?;
    assert_eq!(insert_patient(&store, valid_patient()).await?, None);
    assert_eq!(insert_patient(&store, valid_patient()).await?, Some(11000));
    Ok(())
}
