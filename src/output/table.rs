//! Table write and read-back
//!
//! A table is written as one data file per partition directory plus a
//! `_SUCCESS` marker, then published through a [`TableSink`].

use super::partition::{data_schema, parse_segments, partition_batch, partition_column};
use super::sink::{TableFile, TableSink};
use super::writer::{encode, ParquetWriterConfig};
use crate::error::{Error, Result};
use crate::schema::table_schema;
use crate::types::{StorageFormat, TableName, WriteMode};
use arrow::array::ArrayRef;
use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::json::ReaderBuilder;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Serialize;
use std::io::Cursor;
use tracing::{debug, info};

/// Marker file written last into every published table
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Directory, schema and partitioning of a table
#[derive(Debug, Clone)]
pub struct TableLayout {
    /// Directory name under the output root
    pub dir: String,
    /// Full table schema, partition columns included
    pub schema: SchemaRef,
    /// Ordered partition columns
    pub partition_columns: Vec<String>,
}

impl TableLayout {
    /// Create a layout
    pub fn new(dir: impl Into<String>, schema: SchemaRef, partition_columns: &[&str]) -> Self {
        Self {
            dir: dir.into(),
            schema,
            partition_columns: partition_columns.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    /// Layout of one of the derived tables
    pub fn for_table(table: TableName) -> Self {
        Self::new(table.dir_name(), table_schema(table), table.partition_columns())
    }

    fn partition_refs(&self) -> Vec<&str> {
        self.partition_columns.iter().map(String::as_str).collect()
    }
}

/// How tables are encoded and published
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub format: StorageFormat,
    pub mode: WriteMode,
    pub parquet: ParquetWriterConfig,
}

/// Outcome of a table write
#[derive(Debug, Clone, Serialize)]
pub struct TableWriteReport {
    /// Published location
    pub location: String,
    /// Rows written
    pub rows: usize,
    /// Data files written
    pub files: usize,
    /// Partition directories written (0 when unpartitioned)
    pub partitions: usize,
}

/// Write a table through a sink
///
/// The batches must match the layout's schema. The table is staged and
/// published as a whole; on error nothing is published.
pub async fn write_table(
    sink: &dyn TableSink,
    layout: &TableLayout,
    batches: &[RecordBatch],
    options: &WriteOptions,
) -> Result<TableWriteReport> {
    let write_err = |e: Error| Error::write(&layout.dir, e.to_string());

    let batch = concat_batches(&layout.schema, batches).map_err(|e| write_err(e.into()))?;
    let partition_columns = layout.partition_refs();
    let extension = options.format.extension();

    let groups = if partition_columns.is_empty() || batch.num_rows() > 0 {
        partition_batch(&batch, &partition_columns).map_err(write_err)?
    } else {
        Vec::new()
    };

    let mut files = Vec::with_capacity(groups.len() + 1);
    for group in &groups {
        let path = if group.dir.is_empty() {
            format!("part-00000.{extension}")
        } else {
            format!("{}/part-00000.{extension}", group.dir)
        };
        let data = encode(
            options.format,
            &group.batch.schema(),
            std::slice::from_ref(&group.batch),
            &options.parquet,
        )
        .map_err(write_err)?;
        debug!("Encoded {} rows into {}/{path}", group.batch.num_rows(), layout.dir);
        files.push(TableFile::new(path, data));
    }
    files.push(TableFile::new(SUCCESS_MARKER, Bytes::new()));

    let data_files = files.len() - 1;
    let location = sink.publish(&layout.dir, files, options.mode).await?;

    info!(
        table = %layout.dir,
        rows = batch.num_rows(),
        files = data_files,
        "Created {} at {location}",
        layout.dir
    );

    Ok(TableWriteReport {
        location,
        rows: batch.num_rows(),
        files: data_files,
        partitions: if partition_columns.is_empty() { 0 } else { groups.len() },
    })
}

/// Read a table back, restoring partition columns from the directory layout
pub async fn read_table(
    sink: &dyn TableSink,
    layout: &TableLayout,
    format: StorageFormat,
) -> Result<RecordBatch> {
    let partition_columns = layout.partition_refs();
    let file_schema = data_schema(&layout.schema, &partition_columns);

    let mut batches = Vec::new();
    for relative in sink.list(&layout.dir).await? {
        let name = relative.rsplit('/').next().unwrap_or(&relative);
        if name.starts_with('_') || name.starts_with('.') {
            continue;
        }

        let data = sink.read(&layout.dir, &relative).await?;
        let segments = parse_segments(&relative)?;

        for file_batch in decode(format, &file_schema, data)? {
            let rows = file_batch.num_rows();
            let columns: Vec<ArrayRef> = layout
                .schema
                .fields()
                .iter()
                .map(|field| {
                    if partition_columns.contains(&field.name().as_str()) {
                        let value = segments.get(field.name()).ok_or_else(|| {
                            Error::output(format!(
                                "'{relative}' has no '{}' partition segment",
                                field.name()
                            ))
                        })?;
                        partition_column(field, value.as_deref(), rows)
                    } else {
                        file_batch.column_by_name(field.name()).cloned().ok_or_else(|| {
                            Error::output(format!("'{relative}' has no '{}' column", field.name()))
                        })
                    }
                })
                .collect::<Result<_>>()?;
            batches.push(RecordBatch::try_new(layout.schema.clone(), columns)?);
        }
    }

    Ok(concat_batches(&layout.schema, &batches)?)
}

fn decode(format: StorageFormat, schema: &SchemaRef, data: Bytes) -> Result<Vec<RecordBatch>> {
    let batches = match format {
        StorageFormat::Parquet => ParquetRecordBatchReaderBuilder::try_new(data)?
            .build()?
            .collect::<std::result::Result<Vec<_>, _>>()?,
        StorageFormat::Json => ReaderBuilder::new(schema.clone())
            .build(Cursor::new(data))?
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };

    // Re-attach the declared schema so field metadata does not leak through
    batches
        .into_iter()
        .map(|b| Ok(RecordBatch::try_new(schema.clone(), b.columns().to_vec())?))
        .collect()
}
