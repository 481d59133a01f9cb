//! Error types for Sparkify Lake
//!
//! This module defines the error hierarchy for the whole pipeline.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use crate::types::TableName;
use thiserror::Error;

/// The main error type for Sparkify Lake
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid time zone policy '{value}': {message}")]
    TimezoneConfig { value: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Source Errors
    // ============================================================================
    #[error("Failed to read source '{path}': {message}")]
    SourceRead { path: String, message: String },

    #[error("Schema violation in '{path}' (record {record}, field '{field}'): {message}")]
    Schema {
        path: String,
        record: usize,
        field: String,
        message: String,
    },

    // ============================================================================
    // Join Errors
    // ============================================================================
    #[error("{dropped} of {total} plays have no catalog match")]
    JoinMismatch { dropped: usize, total: usize },

    #[error("Play ('{artist}', '{title}', {duration}) matches {matches} catalog records")]
    MultipleMatch {
        artist: String,
        title: String,
        duration: f64,
        matches: usize,
    },

    // ============================================================================
    // Arrow/Parquet/Storage Errors
    // ============================================================================
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Output error: {message}")]
    Output { message: String },

    #[error("Failed to write table '{table}': {message}")]
    Write { table: String, message: String },

    #[error("Table '{table}' failed: {source}")]
    Table {
        table: TableName,
        #[source]
        source: Box<Error>,
    },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create a time zone policy error
    pub fn timezone(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TimezoneConfig {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Create a source read error
    pub fn source_read(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceRead {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a schema violation error
    pub fn schema(
        path: impl Into<String>,
        record: usize,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Schema {
            path: path.into(),
            record,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Create a write error
    pub fn write(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Write {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Attribute this error to a derived table
    pub fn for_table(self, table: TableName) -> Self {
        match self {
            // Already attributed
            Error::Table { .. } => self,
            other => Self::Table {
                table,
                source: Box::new(other),
            },
        }
    }

    /// The table this error is attributed to, if any
    pub fn table(&self) -> Option<TableName> {
        match self {
            Error::Table { table, .. } => Some(*table),
            _ => None,
        }
    }

    /// Check if this error was caused by bad input data rather than the sink
    pub fn is_source_error(&self) -> bool {
        match self {
            Error::SourceRead { .. } | Error::Schema { .. } => true,
            Error::Table { source, .. } => source.is_source_error(),
            _ => false,
        }
    }
}

/// Result type alias for Sparkify Lake
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;

    /// Attribute an error to a derived table
    fn for_table(self, table: TableName) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }

    fn for_table(self, table: TableName) -> Result<T> {
        self.map_err(|e| {
            let inner: Error = e.into();
            inner.for_table(table)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("input_root");
        assert_eq!(err.to_string(), "Missing required config field: input_root");

        let err = Error::schema("log_data/a.json", 3, "ts", "expected integer");
        assert_eq!(
            err.to_string(),
            "Schema violation in 'log_data/a.json' (record 3, field 'ts'): expected integer"
        );
    }

    #[test]
    fn test_for_table_wraps_once() {
        let err = Error::write("songs_table", "disk full").for_table(TableName::Songs);
        assert_eq!(err.table(), Some(TableName::Songs));

        let rewrapped = err.for_table(TableName::Time);
        assert_eq!(rewrapped.table(), Some(TableName::Songs));
        assert!(rewrapped.to_string().contains("disk full"));
    }

    #[test]
    fn test_is_source_error() {
        assert!(Error::source_read("a.json", "missing").is_source_error());
        assert!(Error::schema("a.json", 1, "x", "y")
            .for_table(TableName::Users)
            .is_source_error());
        assert!(!Error::write("users_table", "nope").is_source_error());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
