//! Record source module
//!
//! Reads raw catalog and session records from globbed JSON files into
//! Arrow RecordBatches.
//!
//! # Overview
//!
//! This module provides:
//! - Glob expansion of a source pattern under an input root
//! - Decoding of JSON Lines, JSON arrays and concatenated JSON objects
//! - Explicit schema validation that names the offending file and record
//! - One RecordBatch per input file, the unit of partitioning for the run

mod batch;
mod decoder;
mod reader;
mod types;

pub use batch::records_to_batch;
pub use decoder::decode_records;
pub use reader::{open_source, read_file, resolve_paths};
pub use types::{SourceBatches, SourcePartition};
