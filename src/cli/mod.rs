//! CLI module
//!
//! Command-line interface for running the pipeline.
//!
//! # Commands
//!
//! - `run` - Derive and publish all five tables
//! - `validate` - Check both sources against their schemas
//! - `tables` - List table directories and partition columns

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
