//! Play-event resolver
//!
//! Reconstructs individual plays by equi-joining enriched session rows with
//! catalog records on (artist name, song title, duration).

use super::time::year_month;
use super::types::{JoinStats, ResolverConfig, SongplayOutput};
use super::{named_column, typed_column};
use crate::error::{Error, Result};
use crate::schema::{catalog, session, songplays_schema};
use crate::types::{MultipleMatchPolicy, NoMatchPolicy};
use arrow::array::{Array, ArrayRef, Float64Array, Int32Array, Int64Array, StringArray, UInt32Array};
use arrow::compute::{concat_batches, take};
use arrow::record_batch::RecordBatch;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Bits reserved for the row number inside a partition
const ROW_BITS: u32 = 33;

/// Surrogate id of the `row`-th songplay emitted from session partition `partition`
///
/// Partitions own disjoint id ranges, so ids are unique within a run without
/// any coordination and increase in emission order.
pub fn songplay_id(partition: usize, row: usize) -> i64 {
    ((partition as i64) << ROW_BITS) + row as i64
}

/// Join key; durations compare by bit pattern with -0.0 folded into 0.0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct JoinKey<'a> {
    artist: &'a str,
    title: &'a str,
    duration: u64,
}

impl<'a> JoinKey<'a> {
    fn new(artist: &'a str, title: &'a str, duration: f64) -> Option<Self> {
        if duration.is_nan() {
            return None;
        }
        let duration = if duration == 0.0 { 0.0_f64 } else { duration };
        Some(Self {
            artist,
            title,
            duration: duration.to_bits(),
        })
    }
}

/// Hash index of catalog rows by join key
pub struct CatalogIndex<'a> {
    batch: &'a RecordBatch,
    rows: HashMap<JoinKey<'a>, Vec<u32>>,
}

impl<'a> CatalogIndex<'a> {
    /// Index a catalog batch
    pub fn build(batch: &'a RecordBatch) -> Result<Self> {
        let artists = typed_column::<StringArray>(batch, catalog::ARTIST_NAME)?;
        let titles = typed_column::<StringArray>(batch, catalog::TITLE)?;
        let durations = typed_column::<Float64Array>(batch, catalog::DURATION)?;

        let mut rows: HashMap<JoinKey<'a>, Vec<u32>> = HashMap::new();
        for idx in 0..batch.num_rows() {
            if artists.is_null(idx) || titles.is_null(idx) || durations.is_null(idx) {
                continue;
            }
            if let Some(key) =
                JoinKey::new(artists.value(idx), titles.value(idx), durations.value(idx))
            {
                rows.entry(key).or_default().push(idx as u32);
            }
        }

        Ok(Self { batch, rows })
    }

    /// Catalog rows matching a play, in catalog order
    pub fn lookup<'s>(&'s self, artist: &'s str, title: &'s str, duration: f64) -> &'s [u32] {
        JoinKey::new(artist, title, duration)
            .and_then(|key| self.rows.get(&key))
            .map_or(&[], Vec::as_slice)
    }

    /// Number of distinct join keys
    pub fn num_keys(&self) -> usize {
        self.rows.len()
    }
}

/// Resolve enriched play partitions against the catalog
pub fn resolve_songplays(
    catalog_batch: &RecordBatch,
    plays: &[RecordBatch],
    config: &ResolverConfig,
) -> Result<SongplayOutput> {
    let index = CatalogIndex::build(catalog_batch)?;
    let mut stats = JoinStats::new();
    let mut parts = Vec::with_capacity(plays.len());

    for (partition, batch) in plays.iter().enumerate() {
        let (session_rows, catalog_rows) = match_partition(&index, batch, config, &mut stats)?;
        parts.push(build_partition(
            partition,
            batch,
            index.batch,
            &session_rows,
            &catalog_rows,
        )?);
    }

    stats.songplays = parts.iter().map(RecordBatch::num_rows).sum();

    if stats.dropped_plays > 0 {
        if config.on_no_match == NoMatchPolicy::Error {
            return Err(Error::JoinMismatch {
                dropped: stats.dropped_plays,
                total: stats.total_plays,
            });
        }
        warn!(
            "{} of {} plays have no catalog match and were dropped",
            stats.dropped_plays, stats.total_plays
        );
    }
    if stats.fanned_out_plays > 0 && config.on_multiple_match == MultipleMatchPolicy::KeepAll {
        warn!(
            "{} plays matched more than one catalog record; emitting one songplay per match",
            stats.fanned_out_plays
        );
    }
    info!(
        "Resolved {} songplays from {} plays ({} matched, {} dropped)",
        stats.songplays, stats.total_plays, stats.matched_plays, stats.dropped_plays
    );

    let batch = concat_batches(&songplays_schema(), &parts)?;
    Ok(SongplayOutput { batch, stats })
}

/// Pair session rows with catalog rows for one partition
fn match_partition(
    index: &CatalogIndex<'_>,
    batch: &RecordBatch,
    config: &ResolverConfig,
    stats: &mut JoinStats,
) -> Result<(Vec<u32>, Vec<u32>)> {
    let artists = typed_column::<StringArray>(batch, session::ARTIST)?;
    let songs = typed_column::<StringArray>(batch, session::SONG)?;
    let lengths = typed_column::<Float64Array>(batch, session::LENGTH)?;

    let mut session_rows = Vec::new();
    let mut catalog_rows = Vec::new();

    for idx in 0..batch.num_rows() {
        stats.total_plays += 1;

        let matches = if artists.is_null(idx) || songs.is_null(idx) || lengths.is_null(idx) {
            &[][..]
        } else {
            index.lookup(artists.value(idx), songs.value(idx), lengths.value(idx))
        };

        if matches.is_empty() {
            stats.dropped_plays += 1;
            continue;
        }
        stats.matched_plays += 1;

        let selected = if matches.len() > 1 {
            stats.fanned_out_plays += 1;
            match config.on_multiple_match {
                MultipleMatchPolicy::KeepAll => matches,
                MultipleMatchPolicy::KeepFirst => &matches[..1],
                MultipleMatchPolicy::Error => {
                    return Err(Error::MultipleMatch {
                        artist: artists.value(idx).to_string(),
                        title: songs.value(idx).to_string(),
                        duration: lengths.value(idx),
                        matches: matches.len(),
                    });
                }
            }
        } else {
            matches
        };

        for catalog_row in selected {
            session_rows.push(idx as u32);
            catalog_rows.push(*catalog_row);
        }
    }

    Ok((session_rows, catalog_rows))
}

/// Materialize songplay rows for one partition from index pairs
fn build_partition(
    partition: usize,
    plays: &RecordBatch,
    catalog_batch: &RecordBatch,
    session_rows: &[u32],
    catalog_rows: &[u32],
) -> Result<RecordBatch> {
    let session_idx = UInt32Array::from(session_rows.to_vec());
    let catalog_idx = UInt32Array::from(catalog_rows.to_vec());

    let pick = |batch: &RecordBatch, name: &str, idx: &UInt32Array| -> Result<ArrayRef> {
        Ok(take(named_column(batch, name)?.as_ref(), idx, None)?)
    };

    let ids: Int64Array = (0..session_rows.len())
        .map(|row| songplay_id(partition, row))
        .collect();

    let dates = pick(plays, session::DATETIME, &session_idx)?;
    let dates = dates
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::Other("datetime column is not a string column".to_string()))?;
    let mut years = Vec::with_capacity(dates.len());
    let mut months = Vec::with_capacity(dates.len());
    for date in dates.iter().flatten() {
        let (year, month) = year_month(date)?;
        years.push(year);
        months.push(month);
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(ids),
        pick(plays, session::TIMESTAMP, &session_idx)?,
        pick(plays, session::USER_ID, &session_idx)?,
        pick(plays, session::LEVEL, &session_idx)?,
        pick(catalog_batch, catalog::SONG_ID, &catalog_idx)?,
        pick(catalog_batch, catalog::ARTIST_ID, &catalog_idx)?,
        pick(plays, session::SESSION_ID, &session_idx)?,
        pick(plays, session::LOCATION, &session_idx)?,
        pick(plays, session::USER_AGENT, &session_idx)?,
        Arc::new(Int32Array::from(years)),
        Arc::new(Int32Array::from(months)),
    ];

    Ok(RecordBatch::try_new(songplays_schema(), columns)?)
}
