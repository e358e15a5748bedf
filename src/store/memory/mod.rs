//! In-memory `DocumentStore`.
//!
//! Keeps collections, indexes, roles and users behind a mutex and mirrors the
//! server behaviour the loader depends on: ordered grouped writes that stop
//! at the first failure, `$jsonSchema` enforcement, unique indexes and the
//! usual "already exists" error codes.

pub mod validator;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use log::debug;
use mongodb::bson::{Bson, Document, oid::ObjectId};

use crate::error::{LoaderError, Result};
use crate::schema::IndexSpec;
use crate::store::{
    CollectionOptions, DocumentStore, GroupedWriteResult, RoleSpec, StoreFuture, UserSpec,
    ValidationAction, ValidationLevel, WriteFailure, WriteOp,
};

const CODE_NAMESPACE_NOT_FOUND: i32 = 26;
const CODE_NAMESPACE_EXISTS: i32 = 48;
const CODE_INDEX_OPTIONS_CONFLICT: i32 = 85;
const CODE_DOCUMENT_VALIDATION_FAILURE: i32 = 121;
const CODE_DUPLICATE_KEY: i32 = 11000;
const CODE_ROLE_EXISTS: i32 = 51002;
const CODE_USER_EXISTS: i32 = 51003;

#[derive(Debug, Default)]
struct CollectionState {
    options: Option<CollectionOptions>,
    documents: Vec<Document>,
    indexes: Vec<IndexSpec>,
}

#[derive(Debug, Default)]
struct MemoryState {
    collections: BTreeMap<String, CollectionState>,
    roles: BTreeMap<String, RoleSpec>,
    users: BTreeMap<(String, String), UserSpec>,
}

/// Store that keeps everything in process memory
#[derive(Debug)]
pub struct MemoryStore {
    database: String,
    state: Mutex<MemoryState>,
    closed: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            state: Mutex::new(MemoryState::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// Whether `close` has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Names of the indexes on a collection
    pub fn index_names(&self, collection: &str) -> Result<Vec<String>> {
        let state = self.lock()?;
        Ok(state
            .collections
            .get(collection)
            .map(|c| c.indexes.iter().map(IndexSpec::name).collect())
            .unwrap_or_default())
    }

    pub fn has_role(&self, name: &str) -> Result<bool> {
        Ok(self.lock()?.roles.contains_key(name))
    }

    pub fn has_user(&self, name: &str, database: &str) -> Result<bool> {
        Ok(self
            .lock()?
            .users
            .contains_key(&(name.to_string(), database.to_string())))
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| LoaderError::InvalidOperation("memory store lock poisoned".to_string()))
    }

    fn namespace(&self, collection: &str) -> String {
        format!("{}.{collection}", self.database)
    }
}

/// Equality match with support for a top-level `$or`
#[must_use]
pub fn matches(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, expected)| {
        if key == "$or" {
            return match expected {
                Bson::Array(branches) => branches.iter().any(|branch| match branch {
                    Bson::Document(branch) => matches(document, branch),
                    _ => false,
                }),
                _ => false,
            };
        }
        match document.get(key) {
            Some(actual) => actual == expected,
            None => *expected == Bson::Null,
        }
    })
}

fn failure(code: i32, message: impl Into<String>) -> (i32, String) {
    (code, message.into())
}

impl CollectionState {
    fn check(
        &self,
        candidate: &Document,
        replacing: Option<usize>,
        namespace: &str,
    ) -> std::result::Result<(), (i32, String)> {
        if let Some(options) = &self.options {
            if options.level != ValidationLevel::Off && options.action == ValidationAction::Error {
                validator::validate_document(&options.validator, candidate).map_err(|reason| {
                    failure(
                        CODE_DOCUMENT_VALIDATION_FAILURE,
                        format!("Document failed validation: {reason}"),
                    )
                })?;
            }
        }

        for index in self.indexes.iter().filter(|i| i.unique) {
            let key = index_key(index, candidate);
            let clash = self
                .documents
                .iter()
                .enumerate()
                .any(|(position, existing)| {
                    Some(position) != replacing && index_key(index, existing) == key
                });
            if clash {
                return Err(failure(
                    CODE_DUPLICATE_KEY,
                    format!(
                        "E11000 duplicate key error collection: {namespace} index: {}",
                        index.name()
                    ),
                ));
            }
        }
        Ok(())
    }

    fn apply(
        &mut self,
        op: &WriteOp,
        namespace: &str,
    ) -> std::result::Result<Option<Bson>, (i32, String)> {
        match op {
            WriteOp::Insert(document) => {
                let mut document = document.clone();
                let id = match document.get("_id") {
                    Some(id) => id.clone(),
                    None => {
                        let id = Bson::ObjectId(ObjectId::new());
                        document.insert("_id", id.clone());
                        id
                    }
                };
                self.check(&document, None, namespace)?;
                self.documents.push(document);
                Ok(Some(id))
            }
            WriteOp::Upsert { filter, update } => {
                let position = self.documents.iter().position(|d| matches(d, filter));
                match position {
                    Some(position) => {
                        let mut document = self.documents[position].clone();
                        apply_update(&mut document, update, false);
                        self.check(&document, Some(position), namespace)?;
                        self.documents[position] = document;
                        Ok(None)
                    }
                    None => {
                        let mut document = Document::new();
                        let id = Bson::ObjectId(ObjectId::new());
                        document.insert("_id", id.clone());
                        for (key, value) in filter {
                            if !key.starts_with('$') {
                                document.insert(key.clone(), value.clone());
                            }
                        }
                        apply_update(&mut document, update, true);
                        self.check(&document, None, namespace)?;
                        self.documents.push(document);
                        Ok(Some(id))
                    }
                }
            }
        }
    }
}

fn apply_update(document: &mut Document, update: &Document, inserting: bool) {
    if let Ok(set) = update.get_document("$set") {
        for (key, value) in set {
            document.insert(key.clone(), value.clone());
        }
    }
    if inserting {
        if let Ok(set) = update.get_document("$setOnInsert") {
            for (key, value) in set {
                document.insert(key.clone(), value.clone());
            }
        }
    }
}

fn index_key(index: &IndexSpec, document: &Document) -> Vec<Bson> {
    index
        .fields
        .iter()
        .map(|field| document.get(*field).cloned().unwrap_or(Bson::Null))
        .collect()
}

impl DocumentStore for MemoryStore {
    fn database_name(&self) -> &str {
        &self.database
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { Ok(()) })
    }

    fn list_collection_names(&self) -> StoreFuture<'_, Vec<String>> {
        Box::pin(async move { Ok(self.lock()?.collections.keys().cloned().collect()) })
    }

    fn create_collection<'a>(
        &'a self,
        name: &'a str,
        options: &'a CollectionOptions,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.lock()?;
            if state.collections.contains_key(name) {
                return Err(LoaderError::Command {
                    code: CODE_NAMESPACE_EXISTS,
                    message: format!(
                        "Collection already exists. NS: {}",
                        self.namespace(name)
                    ),
                });
            }
            state.collections.insert(
                name.to_string(),
                CollectionState {
                    options: Some(options.clone()),
                    ..CollectionState::default()
                },
            );
            debug!("Created collection '{name}'");
            Ok(())
        })
    }

    fn modify_collection<'a>(
        &'a self,
        name: &'a str,
        options: &'a CollectionOptions,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.lock()?;
            let collection =
                state
                    .collections
                    .get_mut(name)
                    .ok_or_else(|| LoaderError::Command {
                        code: CODE_NAMESPACE_NOT_FOUND,
                        message: format!("ns does not exist: {}", self.namespace(name)),
                    })?;
            collection.options = Some(options.clone());
            Ok(())
        })
    }

    fn collection_validator<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Option<Document>> {
        Box::pin(async move {
            let state = self.lock()?;
            Ok(state
                .collections
                .get(name)
                .and_then(|c| c.options.as_ref())
                .map(|o| o.validator.clone()))
        })
    }

    fn create_index<'a>(
        &'a self,
        collection: &'a str,
        index: &'a IndexSpec,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let namespace = self.namespace(collection);
            let mut state = self.lock()?;
            let target = state.collections.entry(collection.to_string()).or_default();

            if let Some(existing) = target.indexes.iter().find(|i| i.name() == index.name()) {
                if existing == index {
                    return Ok(());
                }
                return Err(LoaderError::Command {
                    code: CODE_INDEX_OPTIONS_CONFLICT,
                    message: format!(
                        "An existing index has the same name as the requested index: {}",
                        index.name()
                    ),
                });
            }

            if index.unique {
                let mut seen = Vec::with_capacity(target.documents.len());
                for document in &target.documents {
                    let key = index_key(index, document);
                    if seen.contains(&key) {
                        return Err(LoaderError::Command {
                            code: CODE_DUPLICATE_KEY,
                            message: format!(
                                "E11000 duplicate key error collection: {namespace} index: {}",
                                index.name()
                            ),
                        });
                    }
                    seen.push(key);
                }
            }

            target.indexes.push(index.clone());
            Ok(())
        })
    }

    fn grouped_write<'a>(
        &'a self,
        collection: &'a str,
        ops: &'a [WriteOp],
    ) -> StoreFuture<'a, GroupedWriteResult> {
        Box::pin(async move {
            let namespace = self.namespace(collection);
            let mut state = self.lock()?;
            let target = state.collections.entry(collection.to_string()).or_default();

            let mut result = GroupedWriteResult::default();
            for (index, op) in ops.iter().enumerate() {
                match target.apply(op, &namespace) {
                    Ok(id) => {
                        result.applied += 1;
                        if let Some(id) = id {
                            result.upserted.push((index, id));
                        }
                    }
                    Err((code, message)) => {
                        result.write_errors.push(WriteFailure {
                            index,
                            code,
                            message,
                        });
                        break;
                    }
                }
            }
            Ok(result)
        })
    }

    fn find<'a>(
        &'a self,
        collection: &'a str,
        filter: Document,
    ) -> StoreFuture<'a, Vec<Document>> {
        Box::pin(async move {
            let state = self.lock()?;
            Ok(state
                .collections
                .get(collection)
                .map(|c| {
                    c.documents
                        .iter()
                        .filter(|d| matches(d, &filter))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    fn count_documents<'a>(
        &'a self,
        collection: &'a str,
        filter: Document,
    ) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let state = self.lock()?;
            let count = state.collections.get(collection).map_or(0, |c| {
                c.documents.iter().filter(|d| matches(d, &filter)).count()
            });
            Ok(count as u64)
        })
    }

    fn create_role<'a>(&'a self, role: &'a RoleSpec) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.lock()?;
            if state.roles.contains_key(&role.name) {
                return Err(LoaderError::Command {
                    code: CODE_ROLE_EXISTS,
                    message: format!("Role \"{}@admin\" already exists", role.name),
                });
            }
            state.roles.insert(role.name.clone(), role.clone());
            Ok(())
        })
    }

    fn create_user<'a>(&'a self, user: &'a UserSpec) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.lock()?;
            let key = (user.name.clone(), user.database.clone());
            if state.users.contains_key(&key) {
                return Err(LoaderError::Command {
                    code: CODE_USER_EXISTS,
                    message: format!("User \"{}@{}\" already exists", user.name, user.database),
                });
            }
            state.users.insert(key, user.clone());
            Ok(())
        })
    }

    fn close(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        })
    }
}
