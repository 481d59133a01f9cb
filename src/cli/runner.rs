//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::PipelineConfig;
use crate::engine::Pipeline;
use crate::error::Result;
use crate::schema::table_schema;
use crate::types::{StorageFormat, TableName};
use serde_json::{json, Value};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run {
                input,
                output,
                timezone,
                table_format,
            } => {
                self.run_pipeline(
                    input.as_deref(),
                    output.as_deref(),
                    timezone.as_deref(),
                    *table_format,
                )
                .await
            }
            Commands::Validate { input } => self.validate(input.as_deref()),
            Commands::Tables => self.tables(),
        }
    }

    /// Load the config file, or defaults when none is given
    fn load_config(&self) -> Result<PipelineConfig> {
        match &self.cli.config {
            Some(path) => PipelineConfig::from_file(path),
            None => Ok(PipelineConfig::default()),
        }
    }

    /// Run the pipeline
    async fn run_pipeline(
        &self,
        input: Option<&str>,
        output: Option<&str>,
        timezone: Option<&str>,
        table_format: Option<StorageFormat>,
    ) -> Result<()> {
        let mut config = self.load_config()?;

        // Flags override the file
        if let Some(input) = input {
            config.input_root = Some(input.to_string());
        }
        if let Some(output) = output {
            config.output_root = Some(output.to_string());
        }
        if let Some(timezone) = timezone {
            config.timezone = timezone.to_string();
        }
        if let Some(format) = table_format {
            config.format = format;
        }

        let pipeline = Pipeline::new(config)?;
        let report = pipeline.run_configured().await?;

        self.output_message(&json!({
            "type": "RUN_REPORT",
            "report": report
        }));
        Ok(())
    }

    /// Validate sources
    fn validate(&self, input: Option<&str>) -> Result<()> {
        let config = self.load_config()?;
        let input_root = match input {
            Some(input) => input.to_string(),
            None => config.require_input_root()?.to_string(),
        };

        let report = Pipeline::new(config)?.validate_sources(&input_root)?;

        self.output_message(&json!({
            "type": "VALIDATION",
            "status": "SUCCEEDED",
            "report": report
        }));
        Ok(())
    }

    /// List tables
    fn tables(&self) -> Result<()> {
        let tables: Vec<Value> = TableName::ALL
            .iter()
            .map(|table| {
                let columns: Vec<Value> = table_schema(*table)
                    .fields()
                    .iter()
                    .map(|field| {
                        json!({
                            "name": field.name(),
                            "type": field.data_type().to_string(),
                            "nullable": field.is_nullable()
                        })
                    })
                    .collect();

                json!({
                    "name": table,
                    "directory": table.dir_name(),
                    "partition_columns": table.partition_columns(),
                    "columns": columns
                })
            })
            .collect();

        self.output_message(&json!({
            "type": "TABLES",
            "tables": tables
        }));
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
