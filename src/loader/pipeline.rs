//! The chunked load-and-reconcile pipeline.
//!
//! Each chunk is cleaned, validated and split into parent and child
//! documents. Patients are upserted first; their ids are then resolved and
//! stamped onto the child documents, which are inserted collection by
//! collection. Chunks run strictly one after another.

use std::path::Path;

use arrow::record_batch::RecordBatch;
use log::{debug, info, warn};
use mongodb::bson::{Bson, Document, doc, oid::ObjectId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::clean::clean_batch;
use crate::config::LoaderConfig;
use crate::error::Result;
use crate::loader::rows::{SourceRow, extract_rows};
use crate::loader::source::CsvChunkSource;
use crate::loader::summary::{RunContext, RunSummary};
use crate::loader::writer::{WriteReport, ordered_write_with_replay};
use crate::models::Patient;
use crate::schema::{ADMISSIONS, BILLING, ClinicalSchemas, MEDICAL_RECORDS, PATIENTS};
use crate::store::{DocumentStore, WriteOp};
use crate::utils::arrow::filter_record_batch;
use crate::utils::logging::{
    chunk_progress, finish_progress_bar, log_operation_complete, log_operation_start,
};
use crate::validate::validate_rows;

/// Loads chunks into a document store
pub struct ChunkLoader<'a> {
    store: &'a dyn DocumentStore,
    schemas: &'a ClinicalSchemas,
    config: &'a LoaderConfig,
}

/// Child documents of one collection with the source row each came from
struct ChildBatch {
    collection: &'static str,
    ops: Vec<WriteOp>,
    rows: Vec<usize>,
}

impl ChildBatch {
    const fn new(collection: &'static str) -> Self {
        Self {
            collection,
            ops: Vec::new(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: usize, document: Document) {
        self.ops.push(WriteOp::Insert(document));
        self.rows.push(row);
    }
}

impl<'a> ChunkLoader<'a> {
    #[must_use]
    pub const fn new(
        store: &'a dyn DocumentStore,
        schemas: &'a ClinicalSchemas,
        config: &'a LoaderConfig,
    ) -> Self {
        Self {
            store,
            schemas,
            config,
        }
    }

    /// Load a delimited file chunk by chunk
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, its header lacks a
    /// required column, or the store becomes unreachable.
    pub async fn load_file(&self, path: &Path) -> Result<RunSummary> {
        log_operation_start("Loading", &path.display().to_string());
        let source =
            CsvChunkSource::open(path, self.config.delimiter, self.config.chunk_size)?;
        let target = source.path().display().to_string();
        let summary = self.load_batches(source).await?;
        log_operation_complete("loaded", &target, summary.rows_read, Some(summary.elapsed));
        Ok(summary)
    }

    /// Load pre-chunked raw batches
    ///
    /// # Errors
    /// Returns the first reading or store-level error.
    pub async fn load_batches<I>(&self, batches: I) -> Result<RunSummary>
    where
        I: IntoIterator<Item = Result<RecordBatch>>,
    {
        let mut ctx = RunContext::new(self.schemas);
        let progress = chunk_progress(self.config.show_progress, "loading");

        for batch in batches {
            let batch = batch?;
            if batch.num_rows() == 0 {
                continue;
            }
            self.process_chunk(&batch, &mut ctx).await?;
            progress.inc(1);
        }

        finish_progress_bar(&progress, Some("done"));
        let summary = ctx.finish();
        if summary.rows_read == 0 {
            warn!("Input contained no rows; nothing was written");
        }
        Ok(summary)
    }

    /// Process one raw chunk end to end
    ///
    /// # Errors
    /// Returns an error only for store-level or structural failures;
    /// individual bad rows and documents are counted in `ctx`.
    pub async fn process_chunk(&self, raw: &RecordBatch, ctx: &mut RunContext) -> Result<()> {
        let chunk = ctx.chunks() + 1;
        let cleaned = clean_batch(raw, &self.config.date_formats)?;
        let report = validate_rows(&cleaned.batch, self.schemas, &cleaned.coercion_ok)?;
        if report.invalid_rows > 0 {
            warn!(
                "Chunk {chunk}: {} rows rejected by local validation ({})",
                report.invalid_rows,
                report.describe()
            );
        }

        let valid = filter_record_batch(&cleaned.batch, &report.mask)?;
        let rows = extract_rows(&valid)?;

        let patient_ops: Vec<WriteOp> = rows.iter().map(|r| r.patient.upsert_op()).collect();
        let patients = ordered_write_with_replay(self.store, PATIENTS, &patient_ops, |i| {
            rows[i].patient.to_string()
        })
        .await?;
        ctx.record_write(PATIENTS, &patients);

        let ids = self.resolve_patient_ids(&rows, &patients).await?;
        let orphans = ids.iter().filter(|id| id.is_none()).count();
        if orphans > 0 {
            warn!("Chunk {chunk}: {orphans} rows have no patient id; their children were skipped");
        }
        ctx.record_orphans(orphans);

        let mut counts = Vec::with_capacity(3);
        for children in build_children(&rows, &ids) {
            let written = ordered_write_with_replay(
                self.store,
                children.collection,
                &children.ops,
                |i| rows[children.rows[i]].patient.to_string(),
            )
            .await?;
            ctx.record_write(children.collection, &written);
            counts.push(format!(
                "{} {}/{}",
                children.collection,
                written.written(),
                children.ops.len()
            ));
        }

        ctx.record_chunk(raw.num_rows(), report.valid_rows, report.invalid_rows);
        info!(
            "Chunk {chunk}: read {}, valid {}, rejected {}, {} {}/{} ({} new), {}",
            raw.num_rows(),
            report.valid_rows,
            report.invalid_rows,
            PATIENTS,
            patients.written(),
            patient_ops.len(),
            patients.created(),
            counts.join(", ")
        );
        Ok(())
    }

    /// Map every row to the `_id` of its patient, or `None` if the write failed
    async fn resolve_patient_ids(
        &self,
        rows: &[SourceRow],
        report: &WriteReport,
    ) -> Result<Vec<Option<ObjectId>>> {
        let mut known: FxHashMap<&Patient, ObjectId> = FxHashMap::default();
        for (i, row) in rows.iter().enumerate() {
            if let Some(Bson::ObjectId(id)) = report.created_id(i) {
                known.insert(&row.patient, *id);
            }
        }

        let unresolved: FxHashSet<&Patient> = rows
            .iter()
            .enumerate()
            .filter(|(i, row)| report.is_written(*i) && !known.contains_key(&row.patient))
            .map(|(_, row)| &row.patient)
            .collect();

        if !unresolved.is_empty() {
            let branches: Vec<Document> = unresolved.iter().map(|p| p.key_filter()).collect();
            let found = self
                .store
                .find(PATIENTS, doc! { "$or": branches })
                .await?;
            debug!("Resolved {} of {} matched patients", found.len(), unresolved.len());
            for document in &found {
                let (Some(patient), Ok(id)) = (
                    Patient::from_document(document),
                    document.get_object_id("_id"),
                ) else {
                    continue;
                };
                if let Some(key) = unresolved.get(&patient) {
                    known.insert(*key, id);
                }
            }
        }

        Ok(rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                if report.is_written(i) {
                    known.get(&row.patient).copied()
                } else {
                    None
                }
            })
            .collect())
    }
}

fn build_children(rows: &[SourceRow], ids: &[Option<ObjectId>]) -> [ChildBatch; 3] {
    let mut admissions = ChildBatch::new(ADMISSIONS);
    let mut medical_records = ChildBatch::new(MEDICAL_RECORDS);
    let mut billing = ChildBatch::new(BILLING);

    for (i, (row, id)) in rows.iter().zip(ids).enumerate() {
        let Some(id) = *id else {
            continue;
        };
        if let Some(admission) = &row.admission {
            admissions.push(i, admission.to_document(id));
        }
        if let Some(medical) = &row.medical {
            medical_records.push(i, medical.to_document(id));
        }
        if let Some(entry) = &row.billing {
            billing.push(i, entry.to_document(id));
        }
    }

    [admissions, medical_records, billing]
}
