// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Sparkify Lake
//!
//! Batch ETL that turns a song catalog and user listening logs into a
//! star schema of five partitioned tables.
//!
//! ## Features
//!
//! - **Validated Sources**: globbed JSON Lines inputs checked against declared schemas
//! - **Typed Transforms**: Arrow RecordBatch selections instead of a dataframe engine
//! - **Pinned Local Time**: an explicit fixed-offset zone for every derived timestamp
//! - **Join Policies**: configurable fan-out and no-match handling with counters
//! - **Partitioned Output**: Hive-style Parquet or JSON tables, staged then published
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sparkify_lake::{Pipeline, PipelineConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = PipelineConfig::from_file("pipeline.yaml")?;
//!     let report = Pipeline::new(config)?
//!         .run("./data", "s3://lake/sparkify/")
//!         .await?;
//!
//!     println!("{} songplays", report.join.songplays);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 Pipeline::run(input, output)                 │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//! ┌──────────────┬──────────────┴──────────────┬─────────────────┐
//! │    Source    │          Transform          │     Output      │
//! ├──────────────┼─────────────────────────────┼─────────────────┤
//! │ Glob         │ Catalog  → songs, artists   │ Hive partitions │
//! │ JSON Lines   │ Session  → users, time      │ Parquet / JSON  │
//! │ Validation   │ Resolver → songplays        │ Staged publish  │
//! └──────────────┴─────────────────────────────┴─────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the pipeline
pub mod error;

/// Common types and type aliases
pub mod types;

/// Pipeline configuration
pub mod config;

/// Source and table schemas
pub mod schema;

/// Globbed JSON record sources
pub mod source;

/// Catalog, session and songplay transforms
pub mod transform;

/// Partitioned table output
pub mod output;

/// Pipeline orchestration
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use engine::{run_pipeline, Pipeline, RunReport, TableReport};
pub use transform::{JoinStats, TimePolicy};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
