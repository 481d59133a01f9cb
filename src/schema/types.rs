//! Source schema types

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use serde_json::Value;
use std::sync::Arc;

/// JSON type a source field must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// String (numbers are accepted and stringified)
    Utf8,
    /// Integer
    Int64,
    /// Any JSON number
    Float64,
}

impl FieldKind {
    /// Arrow type this kind is loaded as
    pub fn data_type(self) -> DataType {
        match self {
            FieldKind::Utf8 => DataType::Utf8,
            FieldKind::Int64 => DataType::Int64,
            FieldKind::Float64 => DataType::Float64,
        }
    }

    /// Check if a non-null JSON value is acceptable for this kind
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::Utf8 => value.is_string() || value.is_number(),
            FieldKind::Int64 => value.is_i64(),
            FieldKind::Float64 => value.is_number(),
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Utf8 => write!(f, "string"),
            FieldKind::Int64 => write!(f, "integer"),
            FieldKind::Float64 => write!(f, "number"),
        }
    }
}

/// A declared field of a raw source record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceField {
    /// Field name as it appears in the JSON
    pub name: &'static str,
    /// Expected JSON type
    pub kind: FieldKind,
    /// Whether `null` is allowed
    pub nullable: bool,
}

impl SourceField {
    pub(crate) const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
        }
    }

    pub(crate) const fn nullable(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: true,
        }
    }
}

/// Declared schema of a raw record source
#[derive(Debug, Clone, Copy)]
pub struct SourceSchema {
    /// Source name for diagnostics ("catalog", "session")
    pub name: &'static str,
    /// Declared fields, in column order
    pub fields: &'static [SourceField],
}

impl SourceSchema {
    /// Look up a declared field
    pub fn field(&self, name: &str) -> Option<&SourceField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Arrow schema the source is loaded into
    pub fn arrow_schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .fields
            .iter()
            .map(|f| Field::new(f.name, f.kind.data_type(), f.nullable))
            .collect();
        Arc::new(Schema::new(fields))
    }
}
