//! Globbed file source
//!
//! Resolves a pattern such as `log_data/*/*/*.json` under an input root and
//! loads every match as one partition.

use super::batch::records_to_batch;
use super::decoder::decode_records;
use super::types::SourceBatches;
use crate::error::{Error, Result};
use crate::schema::SourceSchema;
use arrow::record_batch::RecordBatch;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Resolve a glob pattern under a root into a sorted list of files
///
/// The root may be a plain path or a `file://` URL. No matches is an error:
/// a run over an empty source would silently publish empty tables.
pub fn resolve_paths(root: &str, pattern: &str) -> Result<Vec<PathBuf>> {
    let root = root.strip_prefix("file://").unwrap_or(root);
    let full = Path::new(root).join(pattern);
    let full = full.to_string_lossy();

    let entries = glob::glob(&full)
        .map_err(|e| Error::source_read(full.as_ref(), format!("Invalid pattern: {e}")))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            Error::source_read(e.path().display().to_string(), e.error().to_string())
        })?;
        if path.is_file() {
            paths.push(path);
        }
    }

    if paths.is_empty() {
        return Err(Error::source_read(full.as_ref(), "Pattern matched no files"));
    }

    paths.sort();
    Ok(paths)
}

/// Read and validate a single source file
pub fn read_file(path: &Path, source: &SourceSchema) -> Result<RecordBatch> {
    let location = path.display().to_string();
    let body = fs::read_to_string(path)
        .map_err(|e| Error::source_read(&location, format!("Failed to read file: {e}")))?;

    let records = decode_records(&location, &body)?;
    let batch = records_to_batch(&records, source, &location)?;

    debug!("Read {} {} records from {location}", batch.num_rows(), source.name);
    Ok(batch)
}

/// Open a source: one validated partition per file matching `pattern`
pub fn open_source(root: &str, pattern: &str, source: &SourceSchema) -> Result<SourceBatches> {
    let paths = resolve_paths(root, pattern)?;
    let mut batches = SourceBatches::new(source.arrow_schema());

    for path in paths {
        let batch = read_file(&path, source)?;
        batches.push(path, batch);
    }

    info!(
        "Loaded {} {} records from {} files ({pattern})",
        batches.num_rows(),
        source.name,
        batches.num_partitions()
    );
    Ok(batches)
}
