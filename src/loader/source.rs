//! Chunked CSV source.
//!
//! The header is read once to build an all-text schema; the file is then
//! streamed in fixed-size record batches so memory stays bounded by the
//! chunk size rather than the file size.

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::csv::reader::{Format, Reader, ReaderBuilder};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use log::{debug, warn};

use crate::error::util::safe_open_file;
use crate::error::{LoaderError, Result};
use crate::schema::columns::{SOURCE_COLUMNS, required_columns};

/// Iterator over raw, all-text chunks of a delimited file
pub struct CsvChunkSource {
    path: PathBuf,
    schema: SchemaRef,
    reader: Option<Reader<File>>,
}

impl std::fmt::Debug for CsvChunkSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvChunkSource")
            .field("path", &self.path)
            .field("columns", &self.schema.fields().len())
            .field("exhausted", &self.reader.is_none())
            .finish()
    }
}

impl CsvChunkSource {
    /// Open a file and validate its header
    ///
    /// # Arguments
    /// * `path` - Path to the delimited file
    /// * `delimiter` - Field separator byte
    /// * `chunk_size` - Maximum number of rows per chunk
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or the header lacks a
    /// required column. A zero-byte file yields an empty source.
    pub fn open(path: &Path, delimiter: u8, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(LoaderError::Config("Chunk size must be positive".to_string()));
        }

        let mut file = safe_open_file(path, "CSV input")?;
        let format = Format::default()
            .with_header(true)
            .with_delimiter(delimiter);
        let (inferred, _) = format.infer_schema(&mut file, Some(0))?;
        file.seek(SeekFrom::Start(0))?;

        let schema = Arc::new(text_schema(&inferred));
        if schema.fields().is_empty() {
            warn!("Input file {} is empty", path.display());
            return Ok(Self {
                path: path.to_path_buf(),
                schema,
                reader: None,
            });
        }

        check_header(&schema)?;

        let reader = ReaderBuilder::new(schema.clone())
            .with_header(true)
            .with_delimiter(delimiter)
            .with_batch_size(chunk_size)
            .with_truncated_rows(true)
            .build(file)?;

        debug!(
            "Opened {} with {} columns and chunk size {chunk_size}",
            path.display(),
            schema.fields().len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            schema,
            reader: Some(reader),
        })
    }

    /// The all-text schema derived from the header
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for CsvChunkSource {
    type Item = Result<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.reader.as_mut()?.next();
        if next.is_none() {
            self.reader = None;
        }
        next.map(|batch| batch.map_err(LoaderError::from))
    }
}

/// Header names, trimmed, each typed as nullable text
fn text_schema(inferred: &Schema) -> Schema {
    let fields: Vec<Field> = inferred
        .fields()
        .iter()
        .map(|f| Field::new(f.name().trim(), DataType::Utf8, true))
        .collect();
    Schema::new(fields)
}

fn check_header(schema: &Schema) -> Result<()> {
    let missing: Vec<&str> = required_columns()
        .filter(|name| schema.field_with_name(name).is_err())
        .collect();
    if !missing.is_empty() {
        return Err(LoaderError::Header(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )));
    }

    let unknown: Vec<&str> = schema
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .filter(|name| SOURCE_COLUMNS.iter().all(|c| c.name != *name))
        .collect();
    if !unknown.is_empty() {
        debug!("Ignoring unrecognised columns: {}", unknown.join(", "));
    }
    Ok(())
}
