//! Source batch types

use crate::error::Result;
use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use std::path::PathBuf;

/// Records decoded from one input file
#[derive(Debug, Clone)]
pub struct SourcePartition {
    /// File the records came from
    pub path: PathBuf,
    /// Validated records
    pub batch: RecordBatch,
}

/// All partitions read for one source pattern
#[derive(Debug, Clone)]
pub struct SourceBatches {
    /// Shared schema of every partition
    pub schema: SchemaRef,
    /// One partition per matched file, in path order
    pub partitions: Vec<SourcePartition>,
}

impl SourceBatches {
    /// Create an empty set of partitions
    pub fn new(schema: SchemaRef) -> Self {
        Self {
            schema,
            partitions: Vec::new(),
        }
    }

    /// Add a partition
    pub fn push(&mut self, path: impl Into<PathBuf>, batch: RecordBatch) {
        self.partitions.push(SourcePartition {
            path: path.into(),
            batch,
        });
    }

    /// Number of input files
    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Total records across all files
    pub fn num_rows(&self) -> usize {
        self.partitions.iter().map(|p| p.batch.num_rows()).sum()
    }

    /// Iterate over partition batches
    pub fn batches(&self) -> impl Iterator<Item = &RecordBatch> {
        self.partitions.iter().map(|p| &p.batch)
    }

    /// Concatenate all partitions into a single batch
    pub fn concat(&self) -> Result<RecordBatch> {
        Ok(concat_batches(&self.schema, self.batches())?)
    }
}
