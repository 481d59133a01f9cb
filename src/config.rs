//! Pipeline configuration
//!
//! A run is configured by a YAML or JSON file. Every field has a default
//! except the input and output roots, which may also come from the CLI.

use crate::error::{Error, Result};
use crate::output::{ParquetWriterConfig, WriteOptions};
use crate::transform::{ResolverConfig, TimePolicy};
use crate::types::{
    MultipleMatchPolicy, NoMatchPolicy, StorageFormat, UserDedupPolicy, WriteMode,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default glob of catalog files under the input root
pub const DEFAULT_SONG_DATA: &str = "song_data/*/*/*/*.json";

/// Default glob of session log files under the input root
pub const DEFAULT_LOG_DATA: &str = "log_data/*/*/*.json";

// ============================================================================
// Pipeline Config
// ============================================================================

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Root holding `song_data/` and `log_data/`
    #[serde(default)]
    pub input_root: Option<String>,

    /// Root the five tables are written under
    #[serde(default)]
    pub output_root: Option<String>,

    /// Catalog glob, relative to the input root
    #[serde(default = "default_song_data")]
    pub song_data: String,

    /// Session log glob, relative to the input root
    #[serde(default = "default_log_data")]
    pub log_data: String,

    /// Catalog subset used for the songplay join; the full catalog when unset
    #[serde(default)]
    pub songplay_song_data: Option<String>,

    /// Fixed-offset zone for derived local times
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default)]
    pub on_multiple_match: MultipleMatchPolicy,

    #[serde(default)]
    pub on_no_match: NoMatchPolicy,

    /// Drop repeated `song_id`s from the songs table
    #[serde(default)]
    pub deduplicate_songs: bool,

    /// Drop repeated `artist_id`s from the artists table
    #[serde(default)]
    pub deduplicate_artists: bool,

    #[serde(default)]
    pub user_dedup: UserDedupPolicy,

    /// Storage format of the tables
    #[serde(default)]
    pub format: StorageFormat,

    #[serde(default)]
    pub write_mode: WriteMode,

    /// Parquet encoder settings
    #[serde(default)]
    pub parquet: ParquetWriterConfig,
}

fn default_song_data() -> String {
    DEFAULT_SONG_DATA.to_string()
}

fn default_log_data() -> String {
    DEFAULT_LOG_DATA.to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_root: None,
            output_root: None,
            song_data: default_song_data(),
            log_data: default_log_data(),
            songplay_song_data: None,
            timezone: default_timezone(),
            on_multiple_match: MultipleMatchPolicy::default(),
            on_no_match: NoMatchPolicy::default(),
            deduplicate_songs: false,
            deduplicate_artists: false,
            user_dedup: UserDedupPolicy::default(),
            format: StorageFormat::default(),
            write_mode: WriteMode::default(),
            parquet: ParquetWriterConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a config file; `.json` is parsed as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Parse and validate a YAML config
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.song_data.trim().is_empty() {
            return Err(Error::config("song_data glob cannot be empty"));
        }
        if self.log_data.trim().is_empty() {
            return Err(Error::config("log_data glob cannot be empty"));
        }
        if matches!(&self.songplay_song_data, Some(glob) if glob.trim().is_empty()) {
            return Err(Error::config("songplay_song_data glob cannot be empty"));
        }
        if self.parquet.row_group_size() == 0 {
            return Err(Error::config("parquet.row_group_size must be positive"));
        }
        self.time_policy()?;
        Ok(())
    }

    /// Parsed time zone policy
    pub fn time_policy(&self) -> Result<TimePolicy> {
        TimePolicy::parse(&self.timezone)
    }

    /// Join policies for the play-event resolver
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig::new()
            .with_multiple_match(self.on_multiple_match)
            .with_no_match(self.on_no_match)
    }

    /// How tables are encoded and published
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            format: self.format,
            mode: self.write_mode,
            parquet: self.parquet.clone(),
        }
    }

    /// Input root, or an error naming the missing field
    pub fn require_input_root(&self) -> Result<&str> {
        self.input_root
            .as_deref()
            .ok_or_else(|| Error::missing_field("input_root"))
    }

    /// Output root, or an error naming the missing field
    pub fn require_output_root(&self) -> Result<&str> {
        self.output_root
            .as_deref()
            .ok_or_else(|| Error::missing_field("output_root"))
    }
}
