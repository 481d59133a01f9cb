//! Source and table schema definitions

use super::types::{FieldKind, SourceField, SourceSchema};
use super::{catalog, session};
use crate::types::TableName;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use std::sync::Arc;

// ============================================================================
// Source Schemas
// ============================================================================

/// Fields of one catalog (song metadata) record
pub const CATALOG_FIELDS: &[SourceField] = &[
    SourceField::required(catalog::SONG_ID, FieldKind::Utf8),
    SourceField::required(catalog::TITLE, FieldKind::Utf8),
    SourceField::required(catalog::ARTIST_ID, FieldKind::Utf8),
    SourceField::required(catalog::ARTIST_NAME, FieldKind::Utf8),
    SourceField::nullable(catalog::ARTIST_LOCATION, FieldKind::Utf8),
    SourceField::nullable(catalog::ARTIST_LATITUDE, FieldKind::Float64),
    SourceField::nullable(catalog::ARTIST_LONGITUDE, FieldKind::Float64),
    SourceField::required(catalog::DURATION, FieldKind::Float64),
    SourceField::required(catalog::YEAR, FieldKind::Int64),
];

/// Fields of one session (listening log) record
pub const SESSION_FIELDS: &[SourceField] = &[
    SourceField::required(session::USER_ID, FieldKind::Utf8),
    SourceField::nullable(session::FIRST_NAME, FieldKind::Utf8),
    SourceField::nullable(session::LAST_NAME, FieldKind::Utf8),
    SourceField::nullable(session::GENDER, FieldKind::Utf8),
    SourceField::nullable(session::LEVEL, FieldKind::Utf8),
    SourceField::required(session::PAGE, FieldKind::Utf8),
    SourceField::nullable(session::SONG, FieldKind::Utf8),
    SourceField::nullable(session::ARTIST, FieldKind::Utf8),
    SourceField::nullable(session::LENGTH, FieldKind::Float64),
    SourceField::nullable(session::SESSION_ID, FieldKind::Int64),
    SourceField::nullable(session::LOCATION, FieldKind::Utf8),
    SourceField::nullable(session::USER_AGENT, FieldKind::Utf8),
    SourceField::required(session::TS, FieldKind::Int64),
];

/// Catalog source schema
pub fn catalog_source() -> SourceSchema {
    SourceSchema {
        name: "catalog",
        fields: CATALOG_FIELDS,
    }
}

/// Session source schema
pub fn session_source() -> SourceSchema {
    SourceSchema {
        name: "session",
        fields: SESSION_FIELDS,
    }
}

// ============================================================================
// Derived Table Schemas
// ============================================================================

/// songs: partitioned by (year, artist_id)
pub fn songs_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("song_id", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("artist_id", DataType::Utf8, false),
        Field::new("year", DataType::Int64, false),
        Field::new("duration", DataType::Float64, false),
    ]))
}

/// artists: unpartitioned
pub fn artists_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("artist_id", DataType::Utf8, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("location", DataType::Utf8, true),
        Field::new("latitude", DataType::Float64, true),
        Field::new("longitude", DataType::Float64, true),
    ]))
}

/// users: unpartitioned
pub fn users_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("user_id", DataType::Utf8, false),
        Field::new("first_name", DataType::Utf8, true),
        Field::new("last_name", DataType::Utf8, true),
        Field::new("gender", DataType::Utf8, true),
        Field::new("level", DataType::Utf8, true),
    ]))
}

/// time: partitioned by (year, month)
pub fn time_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("timestamp", DataType::Utf8, false),
        Field::new("hour", DataType::Int32, false),
        Field::new("day_of_month", DataType::Int32, false),
        Field::new("week_of_year", DataType::Int32, false),
        Field::new("month", DataType::Int32, false),
        Field::new("year", DataType::Int32, false),
        Field::new("day_of_week", DataType::Int32, false),
    ]))
}

/// songplays: partitioned by (year, month)
pub fn songplays_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("songplay_id", DataType::Int64, false),
        Field::new("start_time", DataType::Utf8, false),
        Field::new("user_id", DataType::Utf8, false),
        Field::new("level", DataType::Utf8, true),
        Field::new("song_id", DataType::Utf8, false),
        Field::new("artist_id", DataType::Utf8, false),
        Field::new("session_id", DataType::Int64, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("user_agent", DataType::Utf8, true),
        Field::new("year", DataType::Int32, false),
        Field::new("month", DataType::Int32, false),
    ]))
}

/// Schema of a derived table
pub fn table_schema(table: TableName) -> SchemaRef {
    match table {
        TableName::Songs => songs_schema(),
        TableName::Artists => artists_schema(),
        TableName::Users => users_schema(),
        TableName::Time => time_schema(),
        TableName::Songplays => songplays_schema(),
    }
}
