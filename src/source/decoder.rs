//! JSON record decoding
//!
//! Accepts the layouts the raw datasets come in: one object per line,
//! a top-level array of objects, or a single object.

use crate::error::{Error, Result};
use serde_json::{Deserializer, Value};

/// Decode a file body into records
///
/// Top-level arrays are flattened so that `[{..}, {..}]` and two JSON lines
/// yield the same records. Blank input yields no records.
pub fn decode_records(path: &str, body: &str) -> Result<Vec<Value>> {
    let mut records = Vec::new();

    for value in Deserializer::from_str(body).into_iter::<Value>() {
        let value = value.map_err(|e| {
            Error::source_read(
                path,
                format!(
                    "Failed to parse JSON at line {}, column {}: {e}",
                    e.line(),
                    e.column()
                ),
            )
        })?;

        match value {
            Value::Array(items) => records.extend(items),
            other => records.push(other),
        }
    }

    Ok(records)
}
