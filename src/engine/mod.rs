//! Execution engine module
//!
//! Runs the four pipeline stages and publishes the five tables.
//!
//! # Overview
//!
//! The engine module provides:
//! - `Pipeline` - Reads both sources, derives and writes every table
//! - `run_pipeline` - One-call entry point with the default configuration
//! - `RunReport` - Rows per table, join counters and timing of a run
//!
//! Tables are written in a fixed order: songs, artists, users, time,
//! songplays. A failing stage stops the run with an error attributed to its
//! table; tables published before it stay published.

mod types;

pub use types::{RunReport, SourceFileReport, TableReport, ValidationReport};

use crate::config::PipelineConfig;
use crate::error::{Result, ResultExt};
use crate::output::{open_sink, write_table, TableLayout, TableSink, WriteOptions};
use crate::schema::{catalog_source, session_source};
use crate::source::{open_source, SourceBatches};
use crate::transform::{
    artists_table, filter_plays, prepare_plays, resolve_songplays, songs_table, time_table,
    users_table, ResolverConfig, TimePolicy,
};
use crate::types::TableName;
use arrow::record_batch::RecordBatch;
use std::time::Instant;
use tracing::{info, info_span, Instrument};

/// Batch ETL pipeline from raw JSON records to the star schema
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    time_policy: TimePolicy,
    resolver: ResolverConfig,
    write_options: WriteOptions,
}

impl Pipeline {
    /// Create a pipeline from a validated configuration
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            time_policy: config.time_policy()?,
            resolver: config.resolver_config(),
            write_options: config.write_options(),
            config,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run against the configured input and output roots
    pub async fn run_configured(&self) -> Result<RunReport> {
        let input_root = self.config.require_input_root()?;
        let output_root = self.config.require_output_root()?;
        self.run(input_root, output_root).await
    }

    /// Run the pipeline, publishing all five tables under `output_root`
    pub async fn run(&self, input_root: &str, output_root: &str) -> Result<RunReport> {
        let sink = open_sink(output_root)?;
        self.run_with_sink(input_root, output_root, sink.as_ref()).await
    }

    /// Run the pipeline against an already opened sink
    pub async fn run_with_sink(
        &self,
        input_root: &str,
        output_root: &str,
        sink: &dyn TableSink,
    ) -> Result<RunReport> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("run", run_id = %run_id);
        self.execute(run_id.clone(), input_root, output_root, sink)
            .instrument(span)
            .await
    }

    async fn execute(
        &self,
        run_id: String,
        input_root: &str,
        output_root: &str,
        sink: &dyn TableSink,
    ) -> Result<RunReport> {
        let start = Instant::now();
        info!(
            "Starting run: {input_root} -> {output_root} (time zone {})",
            self.time_policy
        );
        let mut tables = Vec::with_capacity(TableName::ALL.len());

        // Catalog: songs and artists
        info!("Reading song data from {}", self.config.song_data);
        let catalog =
            read_catalog(input_root, &self.config.song_data).for_table(TableName::Songs)?;

        let songs =
            songs_table(&catalog, self.config.deduplicate_songs).for_table(TableName::Songs)?;
        tables.push(self.write(sink, TableName::Songs, songs).await?);

        let artists = artists_table(&catalog, self.config.deduplicate_artists)
            .for_table(TableName::Artists)?;
        tables.push(self.write(sink, TableName::Artists, artists).await?);

        // Sessions: users and time
        info!("Reading log data from {}", self.config.log_data);
        let plays = open_source(input_root, &self.config.log_data, &session_source())
            .and_then(|sessions| prepare_plays(&sessions, &self.time_policy))
            .for_table(TableName::Users)?;

        let users = users_table(&plays, self.config.user_dedup).for_table(TableName::Users)?;
        tables.push(self.write(sink, TableName::Users, users).await?);

        let time = time_table(&plays).for_table(TableName::Time)?;
        tables.push(self.write(sink, TableName::Time, time).await?);

        // Songplays
        let join_catalog = match &self.config.songplay_song_data {
            Some(pattern) => {
                info!("Reading songplay catalog from {pattern}");
                read_catalog(input_root, pattern).for_table(TableName::Songplays)?
            }
            None => catalog,
        };
        let songplays = resolve_songplays(&join_catalog, &plays, &self.resolver)
            .for_table(TableName::Songplays)?;
        tables.push(self.write(sink, TableName::Songplays, songplays.batch).await?);

        let report = RunReport {
            run_id,
            input_root: input_root.to_string(),
            output_root: output_root.to_string(),
            format: self.write_options.format,
            tables,
            join: songplays.stats,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "Run complete in {}ms: {} songplays from {} plays",
            report.duration_ms, report.join.songplays, report.join.total_plays
        );
        Ok(report)
    }

    async fn write(
        &self,
        sink: &dyn TableSink,
        table: TableName,
        batch: RecordBatch,
    ) -> Result<TableReport> {
        let layout = TableLayout::for_table(table);
        let written = write_table(sink, &layout, &[batch], &self.write_options)
            .await
            .for_table(table)?;
        Ok(TableReport::new(table, written))
    }

    /// Read and validate both sources without writing anything
    pub fn validate_sources(&self, input_root: &str) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();

        let catalog = open_source(input_root, &self.config.song_data, &catalog_source())?;
        report.catalog_records = catalog.num_rows();
        push_files(&mut report, "song_data", &catalog);

        let sessions = open_source(input_root, &self.config.log_data, &session_source())?;
        report.session_records = sessions.num_rows();
        push_files(&mut report, "log_data", &sessions);

        for batch in sessions.batches() {
            report.plays += filter_plays(batch)?.num_rows();
        }

        info!(
            "Validated {} catalog records and {} session records in {} files",
            report.catalog_records,
            report.session_records,
            report.files.len()
        );
        Ok(report)
    }
}

fn read_catalog(input_root: &str, pattern: &str) -> Result<RecordBatch> {
    open_source(input_root, pattern, &catalog_source())?.concat()
}

fn push_files(report: &mut ValidationReport, source: &str, batches: &SourceBatches) {
    for partition in &batches.partitions {
        report.files.push(SourceFileReport {
            source: source.to_string(),
            path: partition.path.display().to_string(),
            records: partition.batch.num_rows(),
        });
    }
}

/// Run the pipeline with the default configuration
///
/// Times are derived in UTC, unmatched plays are dropped and fan-out is kept.
pub async fn run_pipeline(input_root: &str, output_root: &str) -> Result<RunReport> {
    Pipeline::new(PipelineConfig::default())?
        .run(input_root, output_root)
        .await
}
