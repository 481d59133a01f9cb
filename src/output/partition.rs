//! Hive-style partition layout
//!
//! Splits a batch into `col=value/...` directory groups and maps path
//! segments back to typed column values.

use crate::error::{Error, Result};
use arrow::array::{
    new_null_array, Array, ArrayRef, Int32Array, Int64Array, StringArray, UInt32Array,
};
use arrow::compute::take_record_batch;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Directory value used for null partition values
pub const NULL_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// Directory value used for empty-string partition values
pub const EMPTY_PARTITION: &str = "__HIVE_EMPTY_STRING__";

/// Rows of one partition directory
#[derive(Debug, Clone)]
pub struct PartitionGroup {
    /// Relative directory, e.g. `year=2018/month=11`; empty when unpartitioned
    pub dir: String,
    /// Rows without the partition columns
    pub batch: RecordBatch,
}

/// Schema of the data files: the table schema minus partition columns
pub fn data_schema(schema: &Schema, partition_columns: &[&str]) -> SchemaRef {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .filter(|f| !partition_columns.contains(&f.name().as_str()))
        .map(|f| f.as_ref().clone())
        .collect();
    Arc::new(Schema::new(fields))
}

/// Split a batch into partition groups
///
/// Groups are ordered by their directory path; rows keep their input order
/// inside a group. With no partition columns the whole batch is one group.
pub fn partition_batch(
    batch: &RecordBatch,
    partition_columns: &[&str],
) -> Result<Vec<PartitionGroup>> {
    let schema = batch.schema();
    let data = data_schema(&schema, partition_columns);
    let data_indices: Vec<usize> = data
        .fields()
        .iter()
        .map(|f| schema.index_of(f.name()))
        .collect::<std::result::Result<_, _>>()?;

    if partition_columns.is_empty() {
        return Ok(vec![PartitionGroup {
            dir: String::new(),
            batch: batch.project(&data_indices)?,
        }]);
    }

    let keys: Vec<ArrayRef> = partition_columns
        .iter()
        .map(|name| {
            batch
                .column_by_name(name)
                .cloned()
                .ok_or_else(|| Error::output(format!("Partition column '{name}' not found")))
        })
        .collect::<Result<_>>()?;

    let mut groups: BTreeMap<String, Vec<u32>> = BTreeMap::new();
    for row in 0..batch.num_rows() {
        let mut segments = Vec::with_capacity(keys.len());
        for (name, column) in partition_columns.iter().zip(&keys) {
            let value = path_value(column.as_ref(), row)?;
            segments.push(format!("{name}={value}"));
        }
        groups.entry(segments.join("/")).or_default().push(row as u32);
    }

    let projected = batch.project(&data_indices)?;
    groups
        .into_iter()
        .map(|(dir, rows)| {
            let batch = take_record_batch(&projected, &UInt32Array::from(rows))?;
            Ok(PartitionGroup { dir, batch })
        })
        .collect()
}

/// Render one partition value as an escaped path segment value
fn path_value(column: &dyn Array, row: usize) -> Result<String> {
    if column.is_null(row) {
        return Ok(NULL_PARTITION.to_string());
    }

    let raw = match column.data_type() {
        DataType::Utf8 => downcast::<StringArray>(column)?.value(row).to_string(),
        DataType::Int32 => downcast::<Int32Array>(column)?.value(row).to_string(),
        DataType::Int64 => downcast::<Int64Array>(column)?.value(row).to_string(),
        other => {
            return Err(Error::output(format!(
                "Unsupported partition column type: {other}"
            )))
        }
    };

    Ok(escape_path_value(&raw))
}

fn downcast<T: Array + 'static>(column: &dyn Array) -> Result<&T> {
    column
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::output("Partition column type mismatch"))
}

fn needs_escape(c: char) -> bool {
    c.is_control()
        || matches!(
            c,
            '"' | '#' | '%' | '\'' | '*' | '/' | ':' | '=' | '?' | '\\' | '{' | '[' | ']' | '^'
        )
}

/// Percent-escape characters that cannot appear in a path segment
///
/// The empty string gets its own marker. A literal value equal to either
/// marker has its first character escaped so it never reads back as one.
pub fn escape_path_value(value: &str) -> String {
    if value.is_empty() {
        return EMPTY_PARTITION.to_string();
    }
    let is_marker = value == NULL_PARTITION || value == EMPTY_PARTITION;

    let mut escaped = String::with_capacity(value.len() + 2);
    for (idx, c) in value.chars().enumerate() {
        if needs_escape(c) || (is_marker && idx == 0) {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                escaped.push_str(&format!("%{byte:02X}"));
            }
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Reverse `escape_path_value`; `None` for the null marker
pub fn unescape_path_value(value: &str) -> Result<Option<String>> {
    if value == NULL_PARTITION {
        return Ok(None);
    }
    if value == EMPTY_PARTITION {
        return Ok(Some(String::new()));
    }

    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' {
            let hex = value
                .get(idx + 1..idx + 3)
                .ok_or_else(|| Error::output(format!("Truncated escape in '{value}'")))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|_| Error::output(format!("Invalid escape in '{value}'")))?;
            out.push(byte);
            idx += 3;
        } else {
            out.push(bytes[idx]);
            idx += 1;
        }
    }

    String::from_utf8(out)
        .map(Some)
        .map_err(|e| Error::output(format!("Invalid UTF-8 in '{value}': {e}")))
}

/// Parse `col=value` segments of a relative file path
pub fn parse_segments(relative: &str) -> Result<BTreeMap<String, Option<String>>> {
    let mut values = BTreeMap::new();
    let mut parts: Vec<&str> = relative.split('/').collect();
    parts.pop(); // file name

    for part in parts {
        let (name, value) = part
            .split_once('=')
            .ok_or_else(|| Error::output(format!("Not a partition directory: '{part}'")))?;
        values.insert(name.to_string(), unescape_path_value(value)?);
    }
    Ok(values)
}

/// Build a constant column from a partition path value
pub fn partition_column(field: &Field, value: Option<&str>, len: usize) -> Result<ArrayRef> {
    let Some(value) = value else {
        return Ok(new_null_array(field.data_type(), len));
    };

    let parse_err = |e: std::num::ParseIntError| {
        Error::output(format!("Bad value '{value}' for '{}': {e}", field.name()))
    };

    let array: ArrayRef = match field.data_type() {
        DataType::Utf8 => Arc::new(StringArray::from(vec![value; len])),
        DataType::Int32 => {
            let parsed = value.parse::<i32>().map_err(parse_err)?;
            Arc::new(Int32Array::from(vec![parsed; len]))
        }
        DataType::Int64 => {
            let parsed = value.parse::<i64>().map_err(parse_err)?;
            Arc::new(Int64Array::from(vec![parsed; len]))
        }
        other => {
            return Err(Error::output(format!(
                "Unsupported partition column type: {other}"
            )))
        }
    };
    Ok(array)
}
