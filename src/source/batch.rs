//! Validated JSON to Arrow conversion

use crate::error::{Error, Result};
use crate::schema::{FieldKind, SourceField, SourceSchema};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use serde_json::Value;
use std::sync::Arc;

/// Validate records against a source schema and build a RecordBatch
///
/// Every declared field must be present in every record. Undeclared fields
/// are ignored. `record` numbers in errors are 1-based.
pub fn records_to_batch(
    records: &[Value],
    source: &SourceSchema,
    path: &str,
) -> Result<RecordBatch> {
    for (idx, record) in records.iter().enumerate() {
        validate_record(record, source, path, idx + 1)?;
    }

    let columns: Vec<ArrayRef> = source
        .fields
        .iter()
        .map(|field| build_column(records, field))
        .collect();

    RecordBatch::try_new(source.arrow_schema(), columns).map_err(|e| {
        Error::source_read(path, format!("Failed to create RecordBatch: {e}"))
    })
}

fn validate_record(record: &Value, source: &SourceSchema, path: &str, number: usize) -> Result<()> {
    let Value::Object(obj) = record else {
        return Err(Error::schema(
            path,
            number,
            "<record>",
            format!("expected a JSON object, found {}", json_type_name(record)),
        ));
    };

    for field in source.fields {
        match obj.get(field.name) {
            None => {
                return Err(Error::schema(
                    path,
                    number,
                    field.name,
                    format!("missing field in {} record", source.name),
                ));
            }
            Some(Value::Null) if !field.nullable => {
                return Err(Error::schema(path, number, field.name, "null in non-nullable field"));
            }
            Some(Value::Null) => {}
            Some(value) if !field.kind.accepts(value) => {
                return Err(Error::schema(
                    path,
                    number,
                    field.name,
                    format!("expected {}, found {}", field.kind, json_type_name(value)),
                ));
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// Build an Arrow column for one declared field
fn build_column(records: &[Value], field: &SourceField) -> ArrayRef {
    let values = records.iter().map(|r| r.get(field.name).filter(|v| !v.is_null()));

    match field.kind {
        FieldKind::Utf8 => {
            let arr: StringArray = values
                .map(|v| {
                    v.map(|v| match v {
                        Value::String(s) => s.clone(),
                        _ => v.to_string(),
                    })
                })
                .collect();
            Arc::new(arr)
        }
        FieldKind::Int64 => {
            let arr: Int64Array = values.map(|v| v.and_then(Value::as_i64)).collect();
            Arc::new(arr)
        }
        FieldKind::Float64 => {
            let arr: Float64Array = values.map(|v| v.and_then(Value::as_f64)).collect();
            Arc::new(arr)
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
