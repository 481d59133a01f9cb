//! Table file encoders
//!
//! Encodes Arrow RecordBatches into Parquet or JSON Lines bytes.

use crate::error::{Error, Result};
use crate::types::{Compression as CompressionKind, StorageFormat};
use arrow::datatypes::SchemaRef;
use arrow::json::LineDelimitedWriter;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::{Deserialize, Serialize};

/// Configuration for Parquet writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParquetWriterConfig {
    compression: CompressionKind,
    row_group_size: usize,
    dictionary_enabled: bool,
    statistics_enabled: bool,
}

impl ParquetWriterConfig {
    /// Get dictionary encoding enabled
    #[must_use]
    pub fn is_dictionary_enabled(&self) -> bool {
        self.dictionary_enabled
    }

    /// Get statistics enabled
    #[must_use]
    pub fn is_statistics_enabled(&self) -> bool {
        self.statistics_enabled
    }

    /// Get row group size
    #[must_use]
    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    /// Get compression codec
    #[must_use]
    pub fn compression(&self) -> CompressionKind {
        self.compression
    }
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: CompressionKind::Snappy,
            row_group_size: 1024 * 1024, // 1M rows
            dictionary_enabled: true,
            statistics_enabled: true,
        }
    }
}

impl ParquetWriterConfig {
    /// Create a new config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compression codec
    #[must_use]
    pub fn with_compression(mut self, compression: CompressionKind) -> Self {
        self.compression = compression;
        self
    }

    /// Set row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Enable or disable dictionary encoding
    #[must_use]
    pub fn with_dictionary(mut self, enabled: bool) -> Self {
        self.dictionary_enabled = enabled;
        self
    }

    /// Enable or disable statistics
    #[must_use]
    pub fn with_statistics(mut self, enabled: bool) -> Self {
        self.statistics_enabled = enabled;
        self
    }

    /// Build writer properties
    fn build_properties(&self) -> WriterProperties {
        let compression = match self.compression {
            CompressionKind::Snappy => Compression::SNAPPY,
            CompressionKind::Zstd => Compression::ZSTD(parquet::basic::ZstdLevel::default()),
            CompressionKind::Gzip => Compression::GZIP(parquet::basic::GzipLevel::default()),
            CompressionKind::Uncompressed => Compression::UNCOMPRESSED,
        };

        let mut builder = WriterProperties::builder()
            .set_compression(compression)
            .set_max_row_group_size(self.row_group_size.max(1));

        if !self.dictionary_enabled {
            builder = builder.set_dictionary_enabled(false);
        }

        if !self.statistics_enabled {
            builder =
                builder.set_statistics_enabled(parquet::file::properties::EnabledStatistics::None);
        }

        builder.build()
    }
}

/// Encode batches into an in-memory Parquet file
pub fn encode_parquet(
    schema: &SchemaRef,
    batches: &[RecordBatch],
    config: &ParquetWriterConfig,
) -> Result<Bytes> {
    let mut buffer = Vec::new();
    let properties = config.build_properties();
    let mut writer = ArrowWriter::try_new(&mut buffer, schema.clone(), Some(properties))
        .map_err(|e| Error::output(format!("Failed to create Parquet writer: {e}")))?;

    for batch in batches {
        writer
            .write(batch)
            .map_err(|e| Error::output(format!("Failed to write batch: {e}")))?;
    }

    writer
        .close()
        .map_err(|e| Error::output(format!("Failed to close Parquet writer: {e}")))?;
    Ok(Bytes::from(buffer))
}

/// Encode batches as JSON Lines
pub fn encode_json(batches: &[RecordBatch]) -> Result<Bytes> {
    let mut writer = LineDelimitedWriter::new(Vec::new());
    let refs: Vec<&RecordBatch> = batches.iter().collect();
    writer
        .write_batches(&refs)
        .map_err(|e| Error::output(format!("Failed to write JSON: {e}")))?;
    writer
        .finish()
        .map_err(|e| Error::output(format!("Failed to finish JSON: {e}")))?;
    Ok(Bytes::from(writer.into_inner()))
}

/// Encode batches in the given storage format
pub fn encode(
    format: StorageFormat,
    schema: &SchemaRef,
    batches: &[RecordBatch],
    config: &ParquetWriterConfig,
) -> Result<Bytes> {
    match format {
        StorageFormat::Parquet => encode_parquet(schema, batches, config),
        StorageFormat::Json => encode_json(batches),
    }
}
