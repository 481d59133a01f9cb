//! Engine types
//!
//! Reports returned by a pipeline run and by source validation.

use crate::output::TableWriteReport;
use crate::transform::JoinStats;
use crate::types::{StorageFormat, TableName};
use serde::Serialize;

/// Outcome of one published table
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    /// Which table
    pub table: TableName,
    /// Published location
    pub location: String,
    /// Rows written
    pub rows: usize,
    /// Data files written
    pub files: usize,
    /// Partition directories written
    pub partitions: usize,
}

impl TableReport {
    /// Build from a table write
    pub fn new(table: TableName, write: TableWriteReport) -> Self {
        Self {
            table,
            location: write.location,
            rows: write.rows,
            files: write.files,
            partitions: write.partitions,
        }
    }
}

/// Outcome of a full pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique id of this run
    pub run_id: String,
    pub input_root: String,
    pub output_root: String,
    pub format: StorageFormat,
    /// Tables in the order they were published
    pub tables: Vec<TableReport>,
    /// Catalog/session join counters
    pub join: JoinStats,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl RunReport {
    /// Report of one table, if it was published
    pub fn table(&self, table: TableName) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == table)
    }

    /// Rows written to a table
    pub fn rows(&self, table: TableName) -> Option<usize> {
        self.table(table).map(|t| t.rows)
    }
}

/// Record count of one validated source file
#[derive(Debug, Clone, Serialize)]
pub struct SourceFileReport {
    /// `song_data` or `log_data`
    pub source: String,
    pub path: String,
    pub records: usize,
}

/// Outcome of validating both sources without writing anything
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub files: Vec<SourceFileReport>,
    pub catalog_records: usize,
    pub session_records: usize,
    /// Session records with `page = NextSong`
    pub plays: usize,
}
