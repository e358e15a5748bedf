//! Document store abstraction.
//!
//! The loader and the provisioning code only talk to a `DocumentStore`. The
//! production implementation wraps the MongoDB driver; the in-memory one
//! evaluates the same validators locally and backs the test suite.

pub mod memory;
pub mod mongo;

use std::future::Future;
use std::pin::Pin;

use mongodb::bson::{Bson, Document};

use crate::error::Result;
use crate::schema::IndexSpec;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Boxed future returned by every store operation
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// A single operation inside a grouped write
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert a new document; the store assigns `_id`
    Insert(Document),
    /// Update the document matching `filter`, creating it when none matches
    Upsert { filter: Document, update: Document },
}

impl WriteOp {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Insert(_) => "insert",
            Self::Upsert { .. } => "upsert",
        }
    }
}

/// Per-operation failure reported by a grouped write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    /// Position of the failing operation within the group
    pub index: usize,
    pub code: i32,
    pub message: String,
}

/// Result of an ordered grouped write
///
/// Ordered writes stop at the first failure, so `write_errors` holds at most
/// one entry and every operation after it was not attempted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedWriteResult {
    /// Operations applied before the first failure
    pub applied: usize,
    /// Position and new `_id` of every inserted or upserted document
    pub upserted: Vec<(usize, Bson)>,
    pub write_errors: Vec<WriteFailure>,
}

impl GroupedWriteResult {
    /// The first failure, if the write stopped early
    #[must_use]
    pub fn first_error(&self) -> Option<&WriteFailure> {
        self.write_errors.iter().min_by_key(|e| e.index)
    }
}

/// Server-side validation strictness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationLevel {
    Off,
    Moderate,
    #[default]
    Strict,
}

impl ValidationLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Moderate => "moderate",
            Self::Strict => "strict",
        }
    }
}

/// What the server does with a document that fails validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationAction {
    #[default]
    Error,
    Warn,
}

impl ValidationAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
        }
    }
}

/// Options used to create or modify a collection
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionOptions {
    /// Validator document, e.g. `{ "$jsonSchema": ... }`
    pub validator: Document,
    pub level: ValidationLevel,
    pub action: ValidationAction,
}

impl CollectionOptions {
    /// Strict, error-raising validation with the given validator
    #[must_use]
    pub fn strict(validator: Document) -> Self {
        Self {
            validator,
            level: ValidationLevel::Strict,
            action: ValidationAction::Error,
        }
    }
}

/// Actions granted on one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Privilege {
    pub database: String,
    pub collection: String,
    pub actions: Vec<&'static str>,
}

/// Custom role definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpec {
    pub name: String,
    pub privileges: Vec<Privilege>,
}

/// Role granted to a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRef {
    pub role: String,
    pub db: String,
}

impl RoleRef {
    pub fn new(role: impl Into<String>, db: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            db: db.into(),
        }
    }
}

/// User definition
#[derive(Clone, PartialEq, Eq)]
pub struct UserSpec {
    pub name: String,
    pub password: String,
    /// Database the user is created in
    pub database: String,
    pub roles: Vec<RoleRef>,
}

impl std::fmt::Debug for UserSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSpec")
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("roles", &self.roles)
            .finish()
    }
}

/// Operations the loader needs from a document database
pub trait DocumentStore: Send + Sync {
    /// Name of the database this store writes to
    fn database_name(&self) -> &str;

    /// Check that the server is reachable
    fn ping(&self) -> StoreFuture<'_, ()>;

    fn list_collection_names(&self) -> StoreFuture<'_, Vec<String>>;

    /// Create a collection; fails if it already exists
    fn create_collection<'a>(
        &'a self,
        name: &'a str,
        options: &'a CollectionOptions,
    ) -> StoreFuture<'a, ()>;

    /// Replace the validation options of an existing collection
    fn modify_collection<'a>(
        &'a self,
        name: &'a str,
        options: &'a CollectionOptions,
    ) -> StoreFuture<'a, ()>;

    /// The validator currently attached to a collection, if any
    fn collection_validator<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Option<Document>>;

    /// Create an index; re-creating an identical index is a no-op
    fn create_index<'a>(&'a self, collection: &'a str, index: &'a IndexSpec)
    -> StoreFuture<'a, ()>;

    /// Apply operations in order, stopping at the first failure
    ///
    /// Per-operation failures are reported in the result; only transport
    /// level problems surface as an `Err`.
    fn grouped_write<'a>(
        &'a self,
        collection: &'a str,
        ops: &'a [WriteOp],
    ) -> StoreFuture<'a, GroupedWriteResult>;

    fn find<'a>(&'a self, collection: &'a str, filter: Document)
    -> StoreFuture<'a, Vec<Document>>;

    fn count_documents<'a>(&'a self, collection: &'a str, filter: Document)
    -> StoreFuture<'a, u64>;

    /// Create a custom role in the admin database
    fn create_role<'a>(&'a self, role: &'a RoleSpec) -> StoreFuture<'a, ()>;

    fn create_user<'a>(&'a self, user: &'a UserSpec) -> StoreFuture<'a, ()>;

    /// Release the connection
    fn close(&self) -> StoreFuture<'_, ()>;
}
