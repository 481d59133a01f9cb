//! Transform module
//!
//! Typed RecordBatch transforms that turn raw records into the star schema.
//!
//! # Overview
//!
//! - Catalog transformer: `songs_table`, `artists_table`
//! - Session transformer: `prepare_plays`, `users_table`, `time_table`
//! - Play-event resolver: `resolve_songplays`
//!
//! Every transform is a pure function over batches. Row selection is done
//! with index vectors and Arrow's `take`/`filter` kernels.

mod catalog;
mod session;
mod songplay;
mod time;
mod types;

pub use catalog::{artists_table, distinct_by_key, songs_table};
pub use session::{enrich, filter_plays, prepare_plays, time_table, users_table};
pub use songplay::{resolve_songplays, songplay_id, CatalogIndex};
pub use time::{
    parse_date, parse_timestamp, year_month, TimeParts, TimePolicy, DATE_FORMAT,
    TIMESTAMP_FORMAT,
};
pub use types::{JoinStats, ResolverConfig, SongplayOutput};

use crate::error::{Error, Result};
use arrow::array::{Array, ArrayRef};
use arrow::record_batch::RecordBatch;

/// Fetch a column by name and downcast it
pub(crate) fn typed_column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| Error::Other(format!("Column '{name}' not found")))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::Other(format!("Column '{name}' has unexpected type")))
}

/// Fetch a column by name
pub(crate) fn named_column(batch: &RecordBatch, name: &str) -> Result<ArrayRef> {
    batch
        .column_by_name(name)
        .cloned()
        .ok_or_else(|| Error::Other(format!("Column '{name}' not found")))
}

#[cfg(test)]
mod tests;
