//! Roles and users for least-privilege access.
//!
//! Runs on the administrative connection. Roles live in `admin`, users in
//! the target database; anything that already exists is left untouched.

use log::info;

use crate::config::AccessConfig;
use crate::error::Result;
use crate::store::{DocumentStore, Privilege, RoleRef, RoleSpec, UserSpec};

pub const LOADER_ROLE: &str = "loaderRole";
pub const ANALYST_ROLE: &str = "analystRole";
pub const LOADER_USER: &str = "loader";
pub const ANALYST_USER: &str = "analyst";
pub const ADMIN_USER: &str = "admin";

const ROLE_DB: &str = "admin";

const LOADER_ACTIONS: [&str; 7] = [
    "find",
    "insert",
    "update",
    "createIndex",
    "collMod",
    "listCollections",
    "listIndexes",
];
const ANALYST_ACTIONS: [&str; 3] = ["find", "listCollections", "listIndexes"];

/// Result of one idempotent create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created,
    AlreadyExists,
}

/// Privileges on every collection of `db_name`
fn database_privilege(db_name: &str, actions: &[&'static str]) -> Privilege {
    Privilege {
        database: db_name.to_string(),
        collection: String::new(),
        actions: actions.to_vec(),
    }
}

/// Read-write role used by the data pipeline
#[must_use]
pub fn loader_role(db_name: &str) -> RoleSpec {
    RoleSpec {
        name: LOADER_ROLE.to_string(),
        privileges: vec![database_privilege(db_name, &LOADER_ACTIONS)],
    }
}

/// Read-only role for analysts
#[must_use]
pub fn analyst_role(db_name: &str) -> RoleSpec {
    RoleSpec {
        name: ANALYST_ROLE.to_string(),
        privileges: vec![database_privilege(db_name, &ANALYST_ACTIONS)],
    }
}

/// The three users: loader, analyst and a database administrator
#[must_use]
pub fn users(db_name: &str, access: &AccessConfig) -> [UserSpec; 3] {
    [
        UserSpec {
            name: LOADER_USER.to_string(),
            password: access.loader_password.clone(),
            database: db_name.to_string(),
            roles: vec![RoleRef::new(LOADER_ROLE, ROLE_DB)],
        },
        UserSpec {
            name: ANALYST_USER.to_string(),
            password: access.analyst_password.clone(),
            database: db_name.to_string(),
            roles: vec![RoleRef::new(ANALYST_ROLE, ROLE_DB)],
        },
        UserSpec {
            name: ADMIN_USER.to_string(),
            password: access.admin_password.clone(),
            database: db_name.to_string(),
            roles: vec![
                RoleRef::new("dbAdmin", db_name),
                RoleRef::new("userAdmin", db_name),
            ],
        },
    ]
}

fn tolerate_existing(result: Result<()>, what: &str) -> Result<ProvisionOutcome> {
    match result {
        Ok(()) => {
            info!("{what} created");
            Ok(ProvisionOutcome::Created)
        }
        Err(err) if err.is_already_exists() => {
            info!("{what} already exists, skipping");
            Ok(ProvisionOutcome::AlreadyExists)
        }
        Err(err) => Err(err),
    }
}

/// Create both roles and all three users, tolerating existing ones
///
/// # Errors
/// Returns the first failure that is not an "already exists" response.
pub async fn provision_access(
    store: &dyn DocumentStore,
    db_name: &str,
    access: &AccessConfig,
) -> Result<Vec<ProvisionOutcome>> {
    let mut outcomes = Vec::with_capacity(5);

    for role in [loader_role(db_name), analyst_role(db_name)] {
        let result = store.create_role(&role).await;
        outcomes.push(tolerate_existing(result, &format!("Role '{}'", role.name))?);
    }

    for user in users(db_name, access) {
        let result = store.create_user(&user).await;
        outcomes.push(tolerate_existing(
            result,
            &format!("User '{}' on '{}'", user.name, user.database),
        )?);
    }

    info!("User and role provisioning complete for '{db_name}'");
    Ok(outcomes)
}
