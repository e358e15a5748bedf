//! `DocumentStore` backed by the MongoDB driver.
//!
//! Grouped writes are sent as raw `insert`/`update` commands with
//! `ordered: true` so per-operation errors come back as `writeErrors`
//! instead of aborting the whole call. Large groups are split into several
//! commands that respect the server's batch and message size limits; the
//! split stops at the first command reporting a write error.

use std::ops::Range;

use futures::TryStreamExt;
use itertools::Itertools;
use log::{debug, info, warn};
use mongodb::bson::{Bson, Document, doc, oid::ObjectId};
use mongodb::error::ErrorKind;
use mongodb::options::IndexOptions;
use mongodb::{Client, Database, IndexModel};

use crate::error::{LoaderError, Result};
use crate::schema::IndexSpec;
use crate::store::{
    CollectionOptions, DocumentStore, GroupedWriteResult, RoleSpec, StoreFuture, UserSpec,
    WriteFailure, WriteOp,
};

const ADMIN_DB: &str = "admin";

/// Server limit on operations per write command (`maxWriteBatchSize`)
const MAX_GROUP_OPS: usize = 100_000;
/// Payload budget per write command, below the 16 MiB message limit
const MAX_GROUP_BYTES: usize = 15 * 1024 * 1024;
/// Per-operation envelope (array key, `q`/`u`/`upsert` keys) on top of the documents
const OP_OVERHEAD_BYTES: usize = 64;

/// Store talking to a live MongoDB deployment
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Connect to `uri` and bind to database `db_name`
    ///
    /// The driver connects lazily; call `ping` to verify reachability.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let database = client.database(db_name);
        info!("Connected to database '{db_name}'");
        Ok(Self { client, database })
    }

    async fn command(&self, database: &Database, command: Document) -> Result<Document> {
        database.run_command(command).await.map_err(command_error)
    }

    async fn write_inserts(&self, collection: &str, ops: &[WriteOp]) -> Result<GroupedWriteResult> {
        let mut documents = Vec::with_capacity(ops.len());
        let mut ids = Vec::with_capacity(ops.len());
        for op in ops {
            let WriteOp::Insert(document) = op else {
                return Err(mixed_group(collection, ops));
            };
            let mut document = document.clone();
            let id = match document.get("_id") {
                Some(id) => id.clone(),
                None => {
                    let id = Bson::ObjectId(ObjectId::new());
                    document.insert("_id", id.clone());
                    id
                }
            };
            ids.push(id);
            documents.push(document);
        }

        let response = self
            .command(
                &self.database,
                doc! { "insert": collection, "documents": documents, "ordered": true },
            )
            .await?;
        parse_insert_response(collection, &response, ids)
    }

    async fn write_upserts(&self, collection: &str, ops: &[WriteOp]) -> Result<GroupedWriteResult> {
        let mut updates = Vec::with_capacity(ops.len());
        for op in ops {
            let WriteOp::Upsert { filter, update } = op else {
                return Err(mixed_group(collection, ops));
            };
            updates.push(doc! { "q": filter.clone(), "u": update.clone(), "upsert": true });
        }

        let response = self
            .command(
                &self.database,
                doc! { "update": collection, "updates": updates, "ordered": true },
            )
            .await?;
        parse_update_response(collection, &response)
    }
}

fn mixed_group(collection: &str, ops: &[WriteOp]) -> LoaderError {
    let kinds: Vec<&str> = ops.iter().map(WriteOp::kind).unique().collect();
    LoaderError::InvalidOperation(format!(
        "Grouped write to '{collection}' mixes operation kinds: {}",
        kinds.join(", ")
    ))
}

/// Map driver errors, lifting server command failures into `LoaderError::Command`
fn command_error(err: mongodb::error::Error) -> LoaderError {
    if let ErrorKind::Command(command) = err.kind.as_ref() {
        return LoaderError::Command {
            code: command.code,
            message: command.message.clone(),
        };
    }
    LoaderError::Database(err)
}

/// Encoded size of the part of `op` that lands in the command body
fn encoded_size(op: &WriteOp) -> Result<usize> {
    let size = |document: &Document| {
        mongodb::bson::to_vec(document)
            .map(|bytes| bytes.len())
            .map_err(|e| LoaderError::InvalidOperation(format!("Cannot encode document: {e}")))
    };
    match op {
        WriteOp::Insert(document) => size(document),
        WriteOp::Upsert { filter, update } => Ok(size(filter)? + size(update)?),
    }
}

/// Split `ops` into consecutive ranges that each fit in one write command
///
/// A single operation larger than `max_bytes` still gets its own range so the
/// server can reject it as a per-document error.
fn split_groups(ops: &[WriteOp], max_ops: usize, max_bytes: usize) -> Result<Vec<Range<usize>>> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut bytes = 0;
    for (index, op) in ops.iter().enumerate() {
        let size = encoded_size(op)? + OP_OVERHEAD_BYTES;
        let full = index - start >= max_ops || bytes + size > max_bytes;
        if index > start && full {
            groups.push(start..index);
            start = index;
            bytes = 0;
        }
        bytes += size;
    }
    if start < ops.len() {
        groups.push(start..ops.len());
    }
    Ok(groups)
}

/// Fold the result of the sub-group starting at `offset` into `total`
fn append_group(total: &mut GroupedWriteResult, part: GroupedWriteResult, offset: usize) {
    total.applied += part.applied;
    total
        .upserted
        .extend(part.upserted.into_iter().map(|(i, id)| (i + offset, id)));
    total
        .write_errors
        .extend(part.write_errors.into_iter().map(|mut failure| {
            failure.index += offset;
            failure
        }));
}

fn response_count(response: &Document) -> usize {
    match response.get("n") {
        Some(Bson::Int32(n)) => usize::try_from(*n).unwrap_or(0),
        Some(Bson::Int64(n)) => usize::try_from(*n).unwrap_or(0),
        _ => 0,
    }
}

fn entry_index(entry: &Document) -> Result<usize> {
    let index = match entry.get("index") {
        Some(Bson::Int32(i)) => i64::from(*i),
        Some(Bson::Int64(i)) => *i,
        other => {
            return Err(LoaderError::InvalidOperation(format!(
                "Write result entry has no usable index: {other:?}"
            )));
        }
    };
    usize::try_from(index)
        .map_err(|_| LoaderError::InvalidOperation(format!("Negative write index {index}")))
}

fn parse_write_errors(collection: &str, response: &Document) -> Result<Vec<WriteFailure>> {
    if let Ok(concern) = response.get_document("writeConcernError") {
        warn!(
            "Write concern error on '{collection}' (code {}): {}",
            concern.get_i32("code").unwrap_or_default(),
            concern.get_str("errmsg").unwrap_or_default()
        );
    }

    let Ok(entries) = response.get_array("writeErrors") else {
        return Ok(Vec::new());
    };
    let mut failures = Vec::with_capacity(entries.len());
    for entry in entries {
        let Bson::Document(entry) = entry else {
            continue;
        };
        failures.push(WriteFailure {
            index: entry_index(entry)?,
            code: entry.get_i32("code").unwrap_or_default(),
            message: entry.get_str("errmsg").unwrap_or_default().to_string(),
        });
    }
    Ok(failures)
}

/// Read an `insert` response; `ids` are the client-assigned `_id`s in op order
fn parse_insert_response(
    collection: &str,
    response: &Document,
    ids: Vec<Bson>,
) -> Result<GroupedWriteResult> {
    let write_errors = parse_write_errors(collection, response)?;
    let stop = write_errors
        .iter()
        .map(|e| e.index)
        .min()
        .unwrap_or(ids.len());

    Ok(GroupedWriteResult {
        applied: response_count(response),
        upserted: ids.into_iter().take(stop).enumerate().collect(),
        write_errors,
    })
}

fn parse_update_response(collection: &str, response: &Document) -> Result<GroupedWriteResult> {
    let mut upserted = Vec::new();
    if let Ok(entries) = response.get_array("upserted") {
        for entry in entries {
            if let Bson::Document(entry) = entry {
                let index = entry_index(entry)?;
                let id = entry.get("_id").cloned().unwrap_or(Bson::Null);
                upserted.push((index, id));
            }
        }
    }
    upserted.sort_by_key(|(index, _)| *index);

    Ok(GroupedWriteResult {
        applied: response_count(response),
        upserted,
        write_errors: parse_write_errors(collection, response)?,
    })
}

impl DocumentStore for MongoStore {
    fn database_name(&self) -> &str {
        self.database.name()
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let admin = self.client.database(ADMIN_DB);
            self.command(&admin, doc! { "ping": 1 }).await?;
            debug!("Ping succeeded");
            Ok(())
        })
    }

    fn list_collection_names(&self) -> StoreFuture<'_, Vec<String>> {
        Box::pin(async move { Ok(self.database.list_collection_names().await?) })
    }

    fn create_collection<'a>(
        &'a self,
        name: &'a str,
        options: &'a CollectionOptions,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.command(
                &self.database,
                doc! {
                    "create": name,
                    "validator": options.validator.clone(),
                    "validationLevel": options.level.as_str(),
                    "validationAction": options.action.as_str(),
                },
            )
            .await?;
            Ok(())
        })
    }

    fn modify_collection<'a>(
        &'a self,
        name: &'a str,
        options: &'a CollectionOptions,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.command(
                &self.database,
                doc! {
                    "collMod": name,
                    "validator": options.validator.clone(),
                    "validationLevel": options.level.as_str(),
                    "validationAction": options.action.as_str(),
                },
            )
            .await?;
            Ok(())
        })
    }

    fn collection_validator<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Option<Document>> {
        Box::pin(async move {
            let specs: Vec<_> = self
                .database
                .list_collections()
                .filter(doc! { "name": name })
                .await?
                .try_collect()
                .await?;
            Ok(specs.into_iter().next().and_then(|spec| spec.options.validator))
        })
    }

    fn create_index<'a>(
        &'a self,
        collection: &'a str,
        index: &'a IndexSpec,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let keys: Document = index
                .fields
                .iter()
                .map(|field| ((*field).to_string(), Bson::Int32(1)))
                .collect();
            let model = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(index.name())
                        .unique(index.unique)
                        .build(),
                )
                .build();
            self.database
                .collection::<Document>(collection)
                .create_index(model)
                .await
                .map_err(command_error)?;
            Ok(())
        })
    }

    fn grouped_write<'a>(
        &'a self,
        collection: &'a str,
        ops: &'a [WriteOp],
    ) -> StoreFuture<'a, GroupedWriteResult> {
        Box::pin(async move {
            let mut total = GroupedWriteResult::default();
            let groups = split_groups(ops, MAX_GROUP_OPS, MAX_GROUP_BYTES)?;
            if groups.len() > 1 {
                debug!(
                    "Splitting {} writes to '{collection}' into {} commands",
                    ops.len(),
                    groups.len()
                );
            }
            for range in groups {
                let offset = range.start;
                let group = &ops[range];
                let part = match group.first() {
                    Some(WriteOp::Insert(_)) => self.write_inserts(collection, group).await?,
                    Some(WriteOp::Upsert { .. }) => self.write_upserts(collection, group).await?,
                    None => continue,
                };
                let stopped = !part.write_errors.is_empty();
                append_group(&mut total, part, offset);
                if stopped {
                    break;
                }
            }
            Ok(total)
        })
    }

    fn find<'a>(
        &'a self,
        collection: &'a str,
        filter: Document,
    ) -> StoreFuture<'a, Vec<Document>> {
        Box::pin(async move {
            let cursor = self
                .database
                .collection::<Document>(collection)
                .find(filter)
                .await?;
            Ok(cursor.try_collect().await?)
        })
    }

    fn count_documents<'a>(
        &'a self,
        collection: &'a str,
        filter: Document,
    ) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            Ok(self
                .database
                .collection::<Document>(collection)
                .count_documents(filter)
                .await?)
        })
    }

    fn create_role<'a>(&'a self, role: &'a RoleSpec) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let privileges: Vec<Document> = role
                .privileges
                .iter()
                .map(|p| {
                    doc! {
                        "resource": {
                            "db": p.database.as_str(),
                            "collection": p.collection.as_str(),
                        },
                        "actions": p.actions.clone(),
                    }
                })
                .collect();
            let admin = self.client.database(ADMIN_DB);
            self.command(
                &admin,
                doc! { "createRole": role.name.as_str(), "privileges": privileges, "roles": [] },
            )
            .await?;
            Ok(())
        })
    }

    fn create_user<'a>(&'a self, user: &'a UserSpec) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let roles: Vec<Document> = user
                .roles
                .iter()
                .map(|r| doc! { "role": r.role.as_str(), "db": r.db.as_str() })
                .collect();
            let database = self.client.database(&user.database);
            self.command(
                &database,
                doc! {
                    "createUser": user.name.as_str(),
                    "pwd": user.password.as_str(),
                    "roles": roles,
                },
            )
            .await?;
            Ok(())
        })
    }

    fn close(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.client.clone().shutdown().await;
            debug!("Database connection closed");
            Ok(())
        })
    }
}
