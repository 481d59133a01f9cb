//! Schema tests

use super::*;
use crate::types::TableName;
use arrow::datatypes::DataType;
use serde_json::json;

#[test]
fn test_catalog_source_arrow_schema() {
    let schema = catalog_source().arrow_schema();
    assert_eq!(schema.fields().len(), CATALOG_FIELDS.len());

    let duration = schema.field_with_name("duration").unwrap();
    assert_eq!(duration.data_type(), &DataType::Float64);
    assert!(!duration.is_nullable());

    let latitude = schema.field_with_name("artist_latitude").unwrap();
    assert!(latitude.is_nullable());
}

#[test]
fn test_session_source_lookup() {
    let source = session_source();
    let ts = source.field(session::TS).unwrap();
    assert_eq!(ts.kind, FieldKind::Int64);
    assert!(!ts.nullable);
    assert!(source.field("itemInSession").is_none());
}

#[test]
fn test_field_kind_accepts() {
    assert!(FieldKind::Utf8.accepts(&json!("39")));
    assert!(FieldKind::Utf8.accepts(&json!(39)));
    assert!(!FieldKind::Utf8.accepts(&json!(true)));

    assert!(FieldKind::Int64.accepts(&json!(1_541_903_636_796_i64)));
    assert!(!FieldKind::Int64.accepts(&json!(1.5)));
    assert!(!FieldKind::Int64.accepts(&json!("1")));

    assert!(FieldKind::Float64.accepts(&json!(218)));
    assert!(FieldKind::Float64.accepts(&json!(218.93342)));
    assert!(!FieldKind::Float64.accepts(&json!(null)));
}

#[test]
fn test_partition_columns_exist_in_table_schemas() {
    for table in TableName::ALL {
        let schema = table_schema(table);
        for column in table.partition_columns() {
            assert!(
                schema.field_with_name(column).is_ok(),
                "{table} lacks partition column {column}"
            );
        }
    }
}

#[test]
fn test_songplays_schema_shape() {
    let schema = songplays_schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(
        names,
        vec![
            "songplay_id",
            "start_time",
            "user_id",
            "level",
            "song_id",
            "artist_id",
            "session_id",
            "location",
            "user_agent",
            "year",
            "month"
        ]
    );
}
