//! Session transformer
//!
//! Filters the listening log down to plays, derives local times, and builds
//! the user and time dimensions.

use super::time::{TimeParts, TimePolicy};
use super::{named_column, typed_column};
use crate::error::Result;
use crate::schema::{session, time_schema, users_schema};
use crate::source::SourceBatches;
use crate::types::UserDedupPolicy;
use arrow::array::{Array, ArrayRef, Int32Array, Int64Array, StringArray, UInt32Array};
use arrow::compute::kernels::cmp::eq;
use arrow::compute::{concat_batches, filter_record_batch, take_record_batch};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Keep only `page = "NextSong"` rows
pub fn filter_plays(batch: &RecordBatch) -> Result<RecordBatch> {
    let page = typed_column::<StringArray>(batch, session::PAGE)?;
    let mask = eq(page, &StringArray::new_scalar(session::NEXT_SONG))?;
    Ok(filter_record_batch(batch, &mask)?)
}

/// Append the derived `timestamp` and `datetime` columns
pub fn enrich(batch: &RecordBatch, policy: &TimePolicy) -> Result<RecordBatch> {
    let ts = typed_column::<Int64Array>(batch, session::TS)?;

    let mut timestamps = Vec::with_capacity(ts.len());
    let mut dates = Vec::with_capacity(ts.len());
    for millis in ts.values().iter() {
        let (timestamp, date) = policy.derive(*millis)?;
        timestamps.push(timestamp);
        dates.push(date);
    }

    let mut fields: Vec<Field> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    fields.push(Field::new(session::TIMESTAMP, DataType::Utf8, false));
    fields.push(Field::new(session::DATETIME, DataType::Utf8, false));

    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
    columns.push(Arc::new(StringArray::from(timestamps)));
    columns.push(Arc::new(StringArray::from(dates)));

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Filter and enrich every session partition
///
/// Partition order is preserved; it determines surrogate ids downstream.
pub fn prepare_plays(sessions: &SourceBatches, policy: &TimePolicy) -> Result<Vec<RecordBatch>> {
    let mut plays = Vec::with_capacity(sessions.num_partitions());
    for partition in &sessions.partitions {
        let filtered = filter_plays(&partition.batch)?;
        debug!(
            "{}: {} of {} events are plays",
            partition.path.display(),
            filtered.num_rows(),
            partition.batch.num_rows()
        );
        plays.push(enrich(&filtered, policy)?);
    }
    Ok(plays)
}

/// Build the users table from enriched plays
pub fn users_table(plays: &[RecordBatch], policy: UserDedupPolicy) -> Result<RecordBatch> {
    let schema = users_schema();
    let mut parts = Vec::with_capacity(plays.len());
    for batch in plays {
        parts.push(RecordBatch::try_new(
            schema.clone(),
            vec![
                named_column(batch, session::USER_ID)?,
                named_column(batch, session::FIRST_NAME)?,
                named_column(batch, session::LAST_NAME)?,
                named_column(batch, session::GENDER)?,
                named_column(batch, session::LEVEL)?,
            ],
        )?);
    }
    let users = concat_batches(&schema, &parts)?;

    match policy {
        UserDedupPolicy::KeepAll => Ok(users),
        UserDedupPolicy::LastWins => {
            let ts: Vec<&Int64Array> = plays
                .iter()
                .map(|b| typed_column::<Int64Array>(b, session::TS))
                .collect::<Result<_>>()?;
            let ts: Vec<i64> = ts.iter().flat_map(|a| a.values().iter().copied()).collect();
            latest_per_user(&users, &ts)
        }
    }
}

/// Keep each user's row with the greatest event time (later rows win ties)
fn latest_per_user(users: &RecordBatch, ts: &[i64]) -> Result<RecordBatch> {
    let ids = typed_column::<StringArray>(users, "user_id")?;
    let mut latest: HashMap<&str, (i64, usize)> = HashMap::new();

    for (idx, id) in ids.iter().enumerate() {
        let Some(id) = id else { continue };
        let time = ts[idx];
        latest
            .entry(id)
            .and_modify(|entry| {
                if time >= entry.0 {
                    *entry = (time, idx);
                }
            })
            .or_insert((time, idx));
    }

    let mut keep: Vec<u32> = latest.values().map(|(_, idx)| *idx as u32).collect();
    keep.sort_unstable();
    Ok(take_record_batch(users, &UInt32Array::from(keep))?)
}

/// Build the time table: one row per distinct derived timestamp, ascending
pub fn time_table(plays: &[RecordBatch]) -> Result<RecordBatch> {
    let mut distinct: BTreeMap<String, String> = BTreeMap::new();
    for batch in plays {
        let timestamps = typed_column::<StringArray>(batch, session::TIMESTAMP)?;
        let dates = typed_column::<StringArray>(batch, session::DATETIME)?;
        for idx in 0..batch.num_rows() {
            distinct
                .entry(timestamps.value(idx).to_string())
                .or_insert_with(|| dates.value(idx).to_string());
        }
    }

    let len = distinct.len();
    let mut timestamps = Vec::with_capacity(len);
    let mut hours = Vec::with_capacity(len);
    let mut days = Vec::with_capacity(len);
    let mut weeks = Vec::with_capacity(len);
    let mut months = Vec::with_capacity(len);
    let mut years = Vec::with_capacity(len);
    let mut weekdays = Vec::with_capacity(len);

    for (timestamp, date) in distinct {
        let parts = TimeParts::from_derived(&timestamp, &date)?;
        hours.push(parts.hour);
        days.push(parts.day_of_month);
        weeks.push(parts.week_of_year);
        months.push(parts.month);
        years.push(parts.year);
        weekdays.push(parts.day_of_week);
        timestamps.push(timestamp);
    }

    Ok(RecordBatch::try_new(
        time_schema(),
        vec![
            Arc::new(StringArray::from(timestamps)),
            Arc::new(Int32Array::from(hours)),
            Arc::new(Int32Array::from(days)),
            Arc::new(Int32Array::from(weeks)),
            Arc::new(Int32Array::from(months)),
            Arc::new(Int32Array::from(years)),
            Arc::new(Int32Array::from(weekdays)),
        ],
    )?)
}
