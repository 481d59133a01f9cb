//! Tests for transform module

use super::*;
use crate::error::Error;
use crate::schema::{catalog_source, session_source};
use crate::source::{records_to_batch, SourceBatches};
use crate::types::{MultipleMatchPolicy, NoMatchPolicy, UserDedupPolicy};
use arrow::array::{Int32Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_case::test_case;

// 2018-11-15 07:19:18.796 UTC (a Thursday)
const TS_NOV_15: i64 = 1_542_266_358_796;

fn song(song_id: &str, artist: &str, title: &str, duration: f64) -> Value {
    json!({
        "song_id": song_id,
        "title": title,
        "artist_id": format!("AR{song_id}"),
        "artist_name": artist,
        "artist_location": null,
        "artist_latitude": null,
        "artist_longitude": null,
        "duration": duration,
        "year": 2004
    })
}

fn event(user: &str, page: &str, artist: &str, title: &str, length: f64, ts: i64) -> Value {
    json!({
        "userId": user,
        "firstName": "Lily",
        "lastName": "Koch",
        "gender": "F",
        "level": "paid",
        "page": page,
        "song": title,
        "artist": artist,
        "length": length,
        "sessionId": 818,
        "location": "Chicago-Naperville-Elgin, IL-IN-WI",
        "userAgent": "Mozilla/5.0",
        "ts": ts
    })
}

fn catalog_batch(records: &[Value]) -> RecordBatch {
    records_to_batch(records, &catalog_source(), "song.json").unwrap()
}

fn sessions(partitions: &[&[Value]]) -> SourceBatches {
    let source = session_source();
    let mut batches = SourceBatches::new(source.arrow_schema());
    for (idx, records) in partitions.iter().enumerate() {
        let batch = records_to_batch(records, &source, "log.json").unwrap();
        batches.push(format!("log-{idx}.json"), batch);
    }
    batches
}

fn strings(batch: &RecordBatch, name: &str) -> Vec<String> {
    batch
        .column_by_name(name)
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap()
        .iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect()
}

fn ints(batch: &RecordBatch, name: &str) -> Vec<i32> {
    batch
        .column_by_name(name)
        .unwrap()
        .as_any()
        .downcast_ref::<Int32Array>()
        .unwrap()
        .values()
        .to_vec()
}

fn longs(batch: &RecordBatch, name: &str) -> Vec<i64> {
    batch
        .column_by_name(name)
        .unwrap()
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap()
        .values()
        .to_vec()
}

// ============================================================================
// Time Policy Tests
// ============================================================================

#[test_case("UTC", 0 ; "utc")]
#[test_case("utc", 0 ; "lowercase utc")]
#[test_case("Z", 0 ; "zulu")]
#[test_case("+05:30", 19_800 ; "positive with colon")]
#[test_case("-0800", -28_800 ; "negative without colon")]
#[test_case("+02", 7_200 ; "hours only")]
fn test_time_policy_parse(value: &str, seconds: i32) {
    let policy = TimePolicy::parse(value).unwrap();
    assert_eq!(policy.offset().local_minus_utc(), seconds);
}

#[test_case("" ; "empty")]
#[test_case("Europe/Berlin" ; "named zone")]
#[test_case("+5:3" ; "short digits")]
#[test_case("+05:75" ; "minutes out of range")]
#[test_case("+99:00" ; "hours out of range")]
fn test_time_policy_rejects(value: &str) {
    let err = TimePolicy::parse(value).unwrap_err();
    assert!(matches!(err, Error::TimezoneConfig { .. }));
}

#[test]
fn test_derive_utc() {
    let (timestamp, date) = TimePolicy::utc().derive(TS_NOV_15).unwrap();
    assert_eq!(timestamp, "2018-11-15 07:19:18");
    assert_eq!(date, "2018-11-15");
}

#[test]
fn test_derive_with_offset_crosses_midnight() {
    let policy = TimePolicy::parse("-08:00").unwrap();
    let (timestamp, date) = policy.derive(TS_NOV_15).unwrap();
    assert_eq!(timestamp, "2018-11-14 23:19:18");
    assert_eq!(date, "2018-11-14");
}

#[test]
fn test_derive_truncates_sub_second() {
    let policy = TimePolicy::utc();
    assert_eq!(policy.derive(999).unwrap().0, "1970-01-01 00:00:00");
    assert_eq!(policy.derive(-1).unwrap().0, "1969-12-31 23:59:59");
}

#[test]
fn test_derive_is_unambiguous_across_dst_transition() {
    // 2018-11-04 01:30 occurs twice in US zones that observe DST. A fixed
    // offset maps the two instants an hour apart to two distinct values.
    let policy = TimePolicy::parse("-05:00").unwrap();
    let first = 1_541_313_000_000; // 2018-11-04 06:30:00 UTC
    let second = first + 3_600_000;

    let (a, a_date) = policy.derive(first).unwrap();
    let (b, b_date) = policy.derive(second).unwrap();
    assert_eq!(a, "2018-11-04 01:30:00");
    assert_eq!(b, "2018-11-04 02:30:00");
    assert_eq!(a_date, b_date);
    assert_eq!(policy.derive(first).unwrap().0, a);
}

#[test]
fn test_time_parts() {
    let parts = TimeParts::from_derived("2018-11-15 07:19:18", "2018-11-15").unwrap();
    assert_eq!(
        parts,
        TimeParts {
            hour: 7,
            day_of_month: 15,
            week_of_year: 46,
            month: 11,
            year: 2018,
            day_of_week: 5,
        }
    );

    // Sunday is day 1, and ISO week 1 of 2019 starts on 2018-12-31
    let sunday = TimeParts::from_derived("2018-12-30 23:59:59", "2018-12-30").unwrap();
    assert_eq!(sunday.day_of_week, 1);
    assert_eq!(sunday.week_of_year, 52);
    let monday = TimeParts::from_derived("2018-12-31 00:00:00", "2018-12-31").unwrap();
    assert_eq!(monday.week_of_year, 1);
    assert_eq!(monday.year, 2018);
}

// ============================================================================
// Catalog Transformer Tests
// ============================================================================

#[test]
fn test_songs_table_projection() {
    let batch = catalog_batch(&[song("SOA", "X", "Y", 200.0), song("SOB", "X", "Z", 100.0)]);
    let songs = songs_table(&batch, false).unwrap();

    let schema = songs.schema();
    let names: Vec<&str> = schema
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .collect();
    assert_eq!(names, vec!["song_id", "title", "artist_id", "year", "duration"]);
    assert_eq!(strings(&songs, "song_id"), vec!["SOA", "SOB"]);
    assert_eq!(longs(&songs, "year"), vec![2004, 2004]);
}

#[test]
fn test_songs_table_row_count_equals_distinct_ids() {
    let batch = catalog_batch(&[
        song("SOA", "X", "Y", 200.0),
        song("SOB", "X", "Z", 100.0),
        song("SOC", "W", "V", 50.5),
    ]);
    let songs = songs_table(&batch, false).unwrap();
    assert_eq!(songs.num_rows(), 3);
}

#[test]
fn test_songs_table_duplicates() {
    let batch = catalog_batch(&[
        song("SOA", "X", "Y", 200.0),
        song("SOA", "X", "Y", 200.0),
        song("SOB", "X", "Z", 100.0),
    ]);

    // Pass-through by default
    assert_eq!(songs_table(&batch, false).unwrap().num_rows(), 3);

    let deduped = songs_table(&batch, true).unwrap();
    assert_eq!(strings(&deduped, "song_id"), vec!["SOA", "SOB"]);
}

#[test]
fn test_artists_table_projection() {
    let mut record = song("SOA", "Line Renaud", "Y", 200.0);
    record["artist_location"] = json!("Paris");
    record["artist_latitude"] = json!(48.85);
    let batch = catalog_batch(&[record, song("SOB", "Line Renaud", "Z", 1.0)]);

    let artists = artists_table(&batch, false).unwrap();
    assert_eq!(artists.num_rows(), 2);
    assert_eq!(strings(&artists, "name"), vec!["Line Renaud", "Line Renaud"]);
    assert_eq!(strings(&artists, "location"), vec!["Paris", ""]);

    let distinct = artists_table(&batch, true).unwrap();
    assert_eq!(distinct.num_rows(), 2); // artist ids differ per song in this fixture
}

#[test]
fn test_distinct_by_key_keeps_first() {
    let mut first = song("SOA", "X", "first", 1.0);
    first["artist_id"] = json!("AR1");
    let mut second = song("SOB", "X", "second", 2.0);
    second["artist_id"] = json!("AR1");
    let batch = catalog_batch(&[first, second]);

    let (distinct, removed) = distinct_by_key(&batch, "artist_id").unwrap();
    assert_eq!(removed, 1);
    assert_eq!(strings(&distinct, "title"), vec!["first"]);
}

// ============================================================================
// Session Transformer Tests
// ============================================================================

#[test]
fn test_filter_plays_drops_other_pages() {
    let s = sessions(&[&[
        event("1", "NextSong", "X", "Y", 200.0, TS_NOV_15),
        event("2", "Login", "X", "Y", 200.0, TS_NOV_15),
        event("3", "Home", "X", "Y", 200.0, TS_NOV_15),
    ]]);
    let plays = filter_plays(&s.partitions[0].batch).unwrap();
    assert_eq!(strings(&plays, "userId"), vec!["1"]);
}

#[test]
fn test_enrich_appends_derived_columns() {
    let s = sessions(&[&[event("1", "NextSong", "X", "Y", 200.0, TS_NOV_15)]]);
    let enriched = enrich(&s.partitions[0].batch, &TimePolicy::utc()).unwrap();
    assert_eq!(enriched.num_columns(), s.partitions[0].batch.num_columns() + 2);
    assert_eq!(strings(&enriched, "timestamp"), vec!["2018-11-15 07:19:18"]);
    assert_eq!(strings(&enriched, "datetime"), vec!["2018-11-15"]);
}

#[test]
fn test_login_rows_never_reach_users_or_time() {
    let s = sessions(&[&[
        event("1", "NextSong", "X", "Y", 200.0, TS_NOV_15),
        event("99", "Login", "X", "Y", 200.0, TS_NOV_15 + 60_000),
    ]]);
    let plays = prepare_plays(&s, &TimePolicy::utc()).unwrap();

    let users = users_table(&plays, UserDedupPolicy::KeepAll).unwrap();
    assert_eq!(strings(&users, "user_id"), vec!["1"]);

    let time = time_table(&plays).unwrap();
    assert_eq!(strings(&time, "timestamp"), vec!["2018-11-15 07:19:18"]);
}

#[test]
fn test_users_table_keep_all_passes_duplicates() {
    let mut upgraded = event("7", "NextSong", "X", "Y", 1.0, TS_NOV_15 + 1_000);
    upgraded["level"] = json!("paid");
    let mut free = event("7", "NextSong", "X", "Y", 1.0, TS_NOV_15);
    free["level"] = json!("free");
    let s = sessions(&[&[upgraded, free]]);
    let plays = prepare_plays(&s, &TimePolicy::utc()).unwrap();

    let all = users_table(&plays, UserDedupPolicy::KeepAll).unwrap();
    assert_eq!(all.num_rows(), 2);

    let latest = users_table(&plays, UserDedupPolicy::LastWins).unwrap();
    assert_eq!(strings(&latest, "user_id"), vec!["7"]);
    assert_eq!(strings(&latest, "level"), vec!["paid"]);
}

#[test]
fn test_users_table_last_wins_across_partitions() {
    let mut early = event("7", "NextSong", "X", "Y", 1.0, TS_NOV_15);
    early["level"] = json!("free");
    let mut late = event("7", "NextSong", "X", "Y", 1.0, TS_NOV_15 + 5_000);
    late["level"] = json!("paid");
    let other = event("8", "NextSong", "X", "Y", 1.0, TS_NOV_15);
    let s = sessions(&[&[late, other], &[early]]);
    let plays = prepare_plays(&s, &TimePolicy::utc()).unwrap();

    let users = users_table(&plays, UserDedupPolicy::LastWins).unwrap();
    assert_eq!(strings(&users, "user_id"), vec!["7", "8"]);
    assert_eq!(strings(&users, "level"), vec!["paid", "paid"]);
}

#[test]
fn test_time_table_distinct_and_sorted() {
    let s = sessions(&[
        &[
            event("1", "NextSong", "X", "Y", 1.0, TS_NOV_15 + 3_600_000),
            event("2", "NextSong", "X", "Y", 1.0, TS_NOV_15),
        ],
        &[
            // Same second as the second row above
            event("3", "NextSong", "X", "Y", 1.0, TS_NOV_15 + 100),
            event("4", "Logout", "X", "Y", 1.0, TS_NOV_15 - 3_600_000),
        ],
    ]);
    let plays = prepare_plays(&s, &TimePolicy::utc()).unwrap();
    let time = time_table(&plays).unwrap();

    assert_eq!(
        strings(&time, "timestamp"),
        vec!["2018-11-15 07:19:18", "2018-11-15 08:19:18"]
    );
    assert_eq!(ints(&time, "hour"), vec![7, 8]);
    assert_eq!(ints(&time, "day_of_month"), vec![15, 15]);
    assert_eq!(ints(&time, "week_of_year"), vec![46, 46]);
    assert_eq!(ints(&time, "month"), vec![11, 11]);
    assert_eq!(ints(&time, "year"), vec![2018, 2018]);
    assert_eq!(ints(&time, "day_of_week"), vec![5, 5]);
}

#[test]
fn test_time_table_empty() {
    let s = sessions(&[&[event("1", "Home", "X", "Y", 1.0, TS_NOV_15)]]);
    let plays = prepare_plays(&s, &TimePolicy::utc()).unwrap();
    assert_eq!(time_table(&plays).unwrap().num_rows(), 0);
}

// ============================================================================
// Play-Event Resolver Tests
// ============================================================================

#[test]
fn test_resolver_single_match() {
    let catalog = catalog_batch(&[song("SOX", "X", "Y", 200.0)]);
    let s = sessions(&[&[event("42", "NextSong", "X", "Y", 200.0, TS_NOV_15)]]);
    let plays = prepare_plays(&s, &TimePolicy::utc()).unwrap();

    let output = resolve_songplays(&catalog, &plays, &ResolverConfig::new()).unwrap();
    let batch = output.batch;

    assert_eq!(batch.num_rows(), 1);
    assert_eq!(strings(&batch, "song_id"), vec!["SOX"]);
    assert_eq!(strings(&batch, "artist_id"), vec!["ARSOX"]);
    assert_eq!(strings(&batch, "start_time"), vec!["2018-11-15 07:19:18"]);
    assert_eq!(strings(&batch, "user_id"), vec!["42"]);
    assert_eq!(strings(&batch, "level"), vec!["paid"]);
    assert_eq!(longs(&batch, "session_id"), vec![818]);
    assert_eq!(ints(&batch, "year"), vec![2018]);
    assert_eq!(ints(&batch, "month"), vec![11]);
    assert_eq!(
        output.stats,
        JoinStats {
            total_plays: 1,
            matched_plays: 1,
            dropped_plays: 0,
            fanned_out_plays: 0,
            songplays: 1,
        }
    );
}

#[test]
fn test_resolver_requires_all_three_keys() {
    let catalog = catalog_batch(&[song("SOX", "X", "Y", 200.0)]);
    let s = sessions(&[&[
        event("1", "NextSong", "X", "Y", 200.5, TS_NOV_15),
        event("2", "NextSong", "x", "Y", 200.0, TS_NOV_15),
        event("3", "NextSong", "X", "y", 200.0, TS_NOV_15),
    ]]);
    let plays = prepare_plays(&s, &TimePolicy::utc()).unwrap();

    let output = resolve_songplays(&catalog, &plays, &ResolverConfig::new()).unwrap();
    assert_eq!(output.batch.num_rows(), 0);
    assert_eq!(output.stats.dropped_plays, 3);
    assert!((output.stats.drop_ratio() - 1.0).abs() < f64::EPSILON);
}

#[test]
fn test_resolver_null_session_fields_do_not_match() {
    let catalog = catalog_batch(&[song("SOX", "X", "Y", 200.0)]);
    let mut record = event("1", "NextSong", "X", "Y", 200.0, TS_NOV_15);
    record["length"] = json!(null);
    let s = sessions(&[&[record]]);
    let plays = prepare_plays(&s, &TimePolicy::utc()).unwrap();

    let output = resolve_songplays(&catalog, &plays, &ResolverConfig::new()).unwrap();
    assert_eq!(output.stats.dropped_plays, 1);
}

#[test]
fn test_resolver_no_match_error_policy() {
    let catalog = catalog_batch(&[song("SOX", "X", "Y", 200.0)]);
    let s = sessions(&[&[
        event("1", "NextSong", "X", "Y", 200.0, TS_NOV_15),
        event("2", "NextSong", "Q", "R", 1.0, TS_NOV_15),
    ]]);
    let plays = prepare_plays(&s, &TimePolicy::utc()).unwrap();
    let config = ResolverConfig::new().with_no_match(NoMatchPolicy::Error);

    let err = resolve_songplays(&catalog, &plays, &config).unwrap_err();
    assert!(matches!(
        err,
        Error::JoinMismatch {
            dropped: 1,
            total: 2
        }
    ));
}

#[test_case(MultipleMatchPolicy::KeepAll, 2 ; "keep all fans out")]
#[test_case(MultipleMatchPolicy::KeepFirst, 1 ; "keep first")]
fn test_resolver_multiple_match_policies(policy: MultipleMatchPolicy, expected: usize) {
    let catalog = catalog_batch(&[song("SO1", "X", "Y", 200.0), song("SO2", "X", "Y", 200.0)]);
    let s = sessions(&[&[event("1", "NextSong", "X", "Y", 200.0, TS_NOV_15)]]);
    let plays = prepare_plays(&s, &TimePolicy::utc()).unwrap();
    let config = ResolverConfig::new().with_multiple_match(policy);

    let output = resolve_songplays(&catalog, &plays, &config).unwrap();
    assert_eq!(output.batch.num_rows(), expected);
    assert_eq!(output.stats.fanned_out_plays, 1);
    assert_eq!(strings(&output.batch, "song_id")[0], "SO1");
}

#[test]
fn test_resolver_multiple_match_error_policy() {
    let catalog = catalog_batch(&[song("SO1", "X", "Y", 200.0), song("SO2", "X", "Y", 200.0)]);
    let s = sessions(&[&[event("1", "NextSong", "X", "Y", 200.0, TS_NOV_15)]]);
    let plays = prepare_plays(&s, &TimePolicy::utc()).unwrap();
    let config = ResolverConfig::new().with_multiple_match(MultipleMatchPolicy::Error);

    let err = resolve_songplays(&catalog, &plays, &config).unwrap_err();
    assert!(matches!(err, Error::MultipleMatch { matches: 2, .. }));
}

#[test]
fn test_resolver_login_never_produces_songplay() {
    let catalog = catalog_batch(&[song("SOX", "X", "Y", 200.0)]);
    let s = sessions(&[&[event("1", "Login", "X", "Y", 200.0, TS_NOV_15)]]);
    let plays = prepare_plays(&s, &TimePolicy::utc()).unwrap();

    let output = resolve_songplays(&catalog, &plays, &ResolverConfig::new()).unwrap();
    assert_eq!(output.batch.num_rows(), 0);
    assert_eq!(output.stats.total_plays, 0);
}

#[test]
fn test_songplay_ids_unique_and_increasing_across_partitions() {
    let catalog = catalog_batch(&[song("SOX", "X", "Y", 200.0)]);
    let play = event("1", "NextSong", "X", "Y", 200.0, TS_NOV_15);
    let s = sessions(&[&[play.clone(), play.clone()], &[play.clone()], &[play]]);
    let plays = prepare_plays(&s, &TimePolicy::utc()).unwrap();

    let output = resolve_songplays(&catalog, &plays, &ResolverConfig::new()).unwrap();
    let ids = longs(&output.batch, "songplay_id");
    assert_eq!(
        ids,
        vec![0, 1, songplay_id(1, 0), songplay_id(2, 0)]
    );
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_catalog_index_folds_negative_zero() {
    let catalog = catalog_batch(&[song("SO0", "X", "Y", -0.0)]);
    let index = CatalogIndex::build(&catalog).unwrap();
    assert_eq!(index.num_keys(), 1);
    assert_eq!(index.lookup("X", "Y", 0.0), &[0u32][..]);
    assert!(index.lookup("X", "Y", f64::NAN).is_empty());
}
