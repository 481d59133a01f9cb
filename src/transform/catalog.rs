//! Catalog transformer
//!
//! Projects catalog records into the song and artist dimensions.

use super::{named_column, typed_column};
use crate::error::Result;
use crate::schema::{artists_schema, catalog, songs_schema};
use arrow::array::{Array, StringArray, UInt32Array};
use arrow::compute::take_record_batch;
use arrow::record_batch::RecordBatch;
use std::collections::HashSet;
use tracing::warn;

/// Project the songs table
///
/// Duplicate song ids pass through unless `deduplicate` is set, in which case
/// the first occurrence wins.
pub fn songs_table(catalog_batch: &RecordBatch, deduplicate: bool) -> Result<RecordBatch> {
    let songs = RecordBatch::try_new(
        songs_schema(),
        vec![
            named_column(catalog_batch, catalog::SONG_ID)?,
            named_column(catalog_batch, catalog::TITLE)?,
            named_column(catalog_batch, catalog::ARTIST_ID)?,
            named_column(catalog_batch, catalog::YEAR)?,
            named_column(catalog_batch, catalog::DURATION)?,
        ],
    )?;

    finish(songs, "song_id", deduplicate)
}

/// Project the artists table
///
/// One row per catalog record; repeated artists pass through unless
/// `deduplicate` is set.
pub fn artists_table(catalog_batch: &RecordBatch, deduplicate: bool) -> Result<RecordBatch> {
    let artists = RecordBatch::try_new(
        artists_schema(),
        vec![
            named_column(catalog_batch, catalog::ARTIST_ID)?,
            named_column(catalog_batch, catalog::ARTIST_NAME)?,
            named_column(catalog_batch, catalog::ARTIST_LOCATION)?,
            named_column(catalog_batch, catalog::ARTIST_LATITUDE)?,
            named_column(catalog_batch, catalog::ARTIST_LONGITUDE)?,
        ],
    )?;

    finish(artists, "artist_id", deduplicate)
}

fn finish(batch: RecordBatch, key: &str, deduplicate: bool) -> Result<RecordBatch> {
    let (distinct, duplicates) = distinct_by_key(&batch, key)?;
    if duplicates == 0 {
        return Ok(batch);
    }

    if deduplicate {
        Ok(distinct)
    } else {
        warn!("{duplicates} rows repeat an existing {key}; passing them through");
        Ok(batch)
    }
}

/// Keep the first row for every value of a string key column
///
/// Returns the reduced batch and the number of rows removed.
pub fn distinct_by_key(batch: &RecordBatch, key: &str) -> Result<(RecordBatch, usize)> {
    let keys = typed_column::<StringArray>(batch, key)?;
    let mut seen = HashSet::with_capacity(keys.len());
    let mut keep = Vec::with_capacity(keys.len());

    for (idx, value) in keys.iter().enumerate() {
        if seen.insert(value) {
            keep.push(idx as u32);
        }
    }

    let removed = batch.num_rows() - keep.len();
    if removed == 0 {
        return Ok((batch.clone(), 0));
    }

    let indices = UInt32Array::from(keep);
    Ok((take_record_batch(batch, &indices)?, removed))
}
