//! Output module
//!
//! Persists derived tables in a Hive-style partitioned layout.
//!
//! # Overview
//!
//! - [`partition`]: splits batches into `col=value` directories
//! - [`writer`]: Parquet and JSON Lines encoders
//! - [`sink`]: staged publish to a local directory or an object store
//! - [`table`]: `write_table` / `read_table` tying the above together

pub mod partition;
mod sink;
mod table;
mod writer;

pub use partition::{escape_path_value, unescape_path_value, EMPTY_PARTITION, NULL_PARTITION};
pub use sink::{open_sink, LocalSink, ObjectStoreSink, TableFile, TableSink};
pub use table::{
    read_table, write_table, TableLayout, TableWriteReport, WriteOptions, SUCCESS_MARKER,
};
pub use writer::{encode, encode_json, encode_parquet, ParquetWriterConfig};
