use medrecord_loader::loader::{OpOutcome, ordered_write_with_replay};
use medrecord_loader::schema::IndexSpec;
use medrecord_loader::store::{DocumentStore, WriteOp};
use medrecord_loader::{MemoryStore, Result};
use mongodb::bson::doc;

fn insert(name: &str) -> WriteOp {
    WriteOp::Insert(doc! { "name": name })
}

#[tokio::test]
async fn operations_after_a_failure_are_replayed() -> Result<()> {
    let store = MemoryStore::new("UnitTestDB");
    store
        .create_index("people", &IndexSpec::ascending(&["name"]).unique())
        .await?;

    let ops = vec![insert("a"), insert("a"), insert("b"), insert("a"), insert("c")];
    let report = ordered_write_with_replay(&store, "people", &ops, |i| format!("op {i}")).await?;

    assert!(matches!(report.outcomes[0], OpOutcome::Applied { upserted_id: Some(_) }));
    assert!(matches!(report.outcomes[1], OpOutcome::Rejected { code: 11000, .. }));
    assert!(matches!(report.outcomes[2], OpOutcome::Applied { .. }));
    assert!(matches!(report.outcomes[3], OpOutcome::ReplayFailed { code: 11000, .. }));
    assert!(matches!(report.outcomes[4], OpOutcome::Applied { .. }));

    assert_eq!(report.written(), 3);
    assert_eq!(report.rejected(), 1);
    assert_eq!(report.replay_failed(), 1);
    assert_eq!(store.count_documents("people", doc! {}).await?, 3);
    Ok(())
}

#[tokio::test]
async fn clean_group_needs_no_replay() -> Result<()> {
    let store = MemoryStore::new("UnitTestDB");
    let ops = vec![insert("a"), insert("b")];
    let report = ordered_write_with_replay(&store, "people", &ops, |i| format!("op {i}")).await?;
    assert_eq!(report.written(), 2);
    assert_eq!(report.created(), 2);
    assert!(report.created_id(1).is_some());
    Ok(())
}

#[tokio::test]
async fn empty_group_is_a_no_op() -> Result<()> {
    let store = MemoryStore::new("UnitTestDB");
    let report = ordered_write_with_replay(&store, "people", &[], |i| format!("op {i}")).await?;
    assert!(report.outcomes.is_empty());
    assert!(store.list_collection_names().await?.is_empty());
    Ok(())
}
