//! CLI commands and argument parsing

use crate::types::StorageFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sparkify data lake ETL
#[derive(Parser, Debug)]
#[command(name = "sparkify-lake")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline and publish all tables
    Run {
        /// Input root holding song_data/ and log_data/
        #[arg(short, long)]
        input: Option<String>,

        /// Output root (local path or cloud URL)
        /// Supports: /path, s3://bucket/path, r2://bucket/path, gs://bucket/path, az://container/path
        #[arg(short, long)]
        output: Option<String>,

        /// Fixed-offset time zone for derived times (UTC, +HH:MM, -HH:MM)
        #[arg(long)]
        timezone: Option<String>,

        /// Storage format of the tables
        #[arg(long)]
        table_format: Option<StorageFormat>,
    },

    /// Read and validate both sources without writing
    Validate {
        /// Input root holding song_data/ and log_data/
        #[arg(short, long)]
        input: Option<String>,
    },

    /// List the derived tables and their layouts
    Tables,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
