use medrecord_loader::provision::ProvisionOutcome;
use medrecord_loader::provision::access::{
    ADMIN_USER, ANALYST_ROLE, ANALYST_USER, LOADER_ROLE, LOADER_USER, loader_role, users,
};
use medrecord_loader::{AccessConfig, MemoryStore, Result, provision_access};

#[tokio::test]
async fn access_provisioning_is_idempotent() -> Result<()> {
    let store = MemoryStore::new("admin");
    let access = AccessConfig::default();

    let first = provision_access(&store, "HealthcareDB", &access).await?;
    assert_eq!(first, vec![ProvisionOutcome::Created; 5]);

    let second = provision_access(&store, "HealthcareDB", &access).await?;
    assert_eq!(second, vec![ProvisionOutcome::AlreadyExists; 5]);

    assert!(store.has_role(LOADER_ROLE)?);
    assert!(store.has_role(ANALYST_ROLE)?);
    for user in [LOADER_USER, ANALYST_USER, ADMIN_USER] {
        assert!(store.has_user(user, "HealthcareDB")?);
    }
    Ok(())
}

#[test]
fn loader_role_is_scoped_to_the_target_database() {
    let role = loader_role("HealthcareDB");
    assert_eq!(role.privileges.len(), 1);
    let privilege = &role.privileges[0];
    assert_eq!(privilege.database, "HealthcareDB");
    assert!(privilege.collection.is_empty());
    assert!(privilege.actions.contains(&"insert"));
    assert!(!privilege.actions.contains(&"dropDatabase"));
}

#[test]
fn admin_user_gets_db_admin_and_user_admin() {
    let [_, analyst, admin] = users("HealthcareDB", &AccessConfig::default());
    assert_eq!(analyst.roles[0].role, ANALYST_ROLE);
    let roles: Vec<&str> = admin.roles.iter().map(|r| r.role.as_str()).collect();
    assert_eq!(roles, vec!["dbAdmin", "userAdmin"]);
    assert!(admin.roles.iter().all(|r| r.db == "HealthcareDB"));
    assert!(!format!("{admin:?}").contains("adminpwd"));
}
