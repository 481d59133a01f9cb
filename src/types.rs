//! Common types used throughout Sparkify Lake
//!
//! This module contains shared type definitions and the policy enums
//! that configure the pipeline.

use serde::{Deserialize, Serialize};

// ============================================================================
// Derived Tables
// ============================================================================

/// The five tables of the star schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    /// Song dimension
    Songs,
    /// Artist dimension
    Artists,
    /// User dimension
    Users,
    /// Time dimension
    Time,
    /// Play-event fact table
    Songplays,
}

impl TableName {
    /// All tables in the order the pipeline writes them
    pub const ALL: [TableName; 5] = [
        TableName::Songs,
        TableName::Artists,
        TableName::Users,
        TableName::Time,
        TableName::Songplays,
    ];

    /// Directory name under the output root
    pub fn dir_name(self) -> &'static str {
        match self {
            TableName::Songs => "songs_table",
            TableName::Artists => "artists_table",
            TableName::Users => "users_table",
            TableName::Time => "time_table",
            TableName::Songplays => "songplays_table",
        }
    }

    /// Ordered partition columns of this table's layout
    pub fn partition_columns(self) -> &'static [&'static str] {
        match self {
            TableName::Songs => &["year", "artist_id"],
            TableName::Time | TableName::Songplays => &["year", "month"],
            TableName::Artists | TableName::Users => &[],
        }
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

// ============================================================================
// Storage
// ============================================================================

/// File format of the derived tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StorageFormat {
    /// Apache Parquet (default)
    #[default]
    Parquet,
    /// JSON Lines
    Json,
}

impl StorageFormat {
    /// File extension for data files
    pub fn extension(self) -> &'static str {
        match self {
            StorageFormat::Parquet => "parquet",
            StorageFormat::Json => "json",
        }
    }
}

/// What to do when a table already exists at the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Replace the existing table
    #[default]
    Overwrite,
    /// Fail the table write
    ErrorIfExists,
}

/// Parquet compression codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    #[default]
    Snappy,
    Zstd,
    Gzip,
    #[serde(rename = "none")]
    Uncompressed,
}

// ============================================================================
// Join and Dedup Policies
// ============================================================================

/// Behavior when one play matches several catalog records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultipleMatchPolicy {
    /// Emit one songplay per matching pair, warn about the fan-out
    #[default]
    KeepAll,
    /// Emit a songplay for the first matching catalog record only
    KeepFirst,
    /// Fail the songplays table
    Error,
}

/// Behavior when a play matches no catalog record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoMatchPolicy {
    /// Drop the play and count it
    #[default]
    Drop,
    /// Fail the songplays table
    Error,
}

/// How repeated user ids are handled in the users table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserDedupPolicy {
    /// Every play row passes through
    #[default]
    KeepAll,
    /// One row per user, taken from their latest play
    LastWins,
}
