//! Table sinks: local filesystem and cloud object stores (S3, R2, GCS, Azure)
//!
//! A sink publishes a complete table directory at once. Files are staged
//! first and only moved into place after every file was written.

use crate::error::{Error, Result, ResultExt};
use crate::types::WriteMode;
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// A data file of a table, relative to the table directory
#[derive(Debug, Clone)]
pub struct TableFile {
    /// Relative path, `/`-separated
    pub path: String,
    /// File contents
    pub data: Bytes,
}

impl TableFile {
    /// Create a table file
    pub fn new(path: impl Into<String>, data: Bytes) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }
}

/// Destination that stores table directories
#[async_trait]
pub trait TableSink: Send + Sync {
    /// Scheme of the destination (file, s3, r2, gs, az)
    fn scheme(&self) -> &str;

    /// Check whether a table directory exists
    async fn exists(&self, table_dir: &str) -> Result<bool>;

    /// Replace `table_dir` with exactly `files`
    ///
    /// Returns the full location of the published table.
    async fn publish(
        &self,
        table_dir: &str,
        files: Vec<TableFile>,
        mode: WriteMode,
    ) -> Result<String>;

    /// List files of a table, relative to the table directory, sorted
    async fn list(&self, table_dir: &str) -> Result<Vec<String>>;

    /// Read one file of a table
    async fn read(&self, table_dir: &str, relative: &str) -> Result<Bytes>;
}

/// Open a sink for an output root
///
/// Supported formats:
/// - `s3://bucket/path/` - AWS S3
/// - `r2://bucket/path/` - Cloudflare R2 (S3-compatible)
/// - `gs://bucket/path/` - Google Cloud Storage
/// - `az://container/path/` - Azure Blob Storage
/// - `/local/path/`, `./path/` or `file:///path` - Local filesystem
pub fn open_sink(url: &str) -> Result<Arc<dyn TableSink>> {
    if url.starts_with("s3://") {
        Ok(Arc::new(ObjectStoreSink::parse_s3(url, false)?))
    } else if url.starts_with("r2://") {
        Ok(Arc::new(ObjectStoreSink::parse_s3(url, true)?))
    } else if url.starts_with("gs://") {
        Ok(Arc::new(ObjectStoreSink::parse_gcs(url)?))
    } else if url.starts_with("az://") {
        Ok(Arc::new(ObjectStoreSink::parse_azure(url)?))
    } else {
        Ok(Arc::new(LocalSink::new(url)?))
    }
}

// ============================================================================
// Local filesystem
// ============================================================================

/// Local directory sink with atomic directory publish
#[derive(Debug, Clone)]
pub struct LocalSink {
    root: PathBuf,
}

impl LocalSink {
    /// Create a sink rooted at `path`, creating the directory if needed
    pub fn new(path: &str) -> Result<Self> {
        let path = path.strip_prefix("file://").unwrap_or(path);
        std::fs::create_dir_all(path)
            .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;
        Ok(Self {
            root: PathBuf::from(path),
        })
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn write_staged(&self, staging: &Path, files: &[TableFile]) -> Result<()> {
        tokio::fs::create_dir_all(staging).await?;
        for file in files {
            let target = staging.join(&file.path);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, &file.data).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl TableSink for LocalSink {
    fn scheme(&self) -> &str {
        "file"
    }

    async fn exists(&self, table_dir: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.root.join(table_dir)).await?)
    }

    async fn publish(
        &self,
        table_dir: &str,
        files: Vec<TableFile>,
        mode: WriteMode,
    ) -> Result<String> {
        let target = self.root.join(table_dir);
        if mode == WriteMode::ErrorIfExists && self.exists(table_dir).await? {
            return Err(Error::write(
                table_dir,
                format!("{} already exists", target.display()),
            ));
        }

        let run = uuid::Uuid::new_v4().simple().to_string();
        let staging = self.root.join(format!(".{table_dir}.staging-{run}"));

        if let Err(e) = self.write_staged(&staging, &files).await {
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(Error::write(table_dir, format!("Failed to stage files: {e}")));
        }

        // Swap: move the old table aside, move staging in, then drop the old one
        let backup = self.root.join(format!(".{table_dir}.old-{run}"));
        let had_previous = self.exists(table_dir).await?;
        if had_previous {
            tokio::fs::rename(&target, &backup).await.map_err(|e| {
                Error::write(table_dir, format!("Failed to move previous table aside: {e}"))
            })?;
        }

        if let Err(e) = tokio::fs::rename(&staging, &target).await {
            if had_previous {
                let _ = tokio::fs::rename(&backup, &target).await;
            }
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(Error::write(table_dir, format!("Failed to publish table: {e}")));
        }

        if had_previous {
            if let Err(e) = tokio::fs::remove_dir_all(&backup).await {
                warn!("Failed to remove previous {table_dir} at {}: {e}", backup.display());
            }
        }

        debug!("Published {} files to {}", files.len(), target.display());
        Ok(format!("file://{}", target.display()))
    }

    async fn list(&self, table_dir: &str) -> Result<Vec<String>> {
        let base = self.root.join(table_dir);
        let mut files = Vec::new();
        let mut pending = vec![base.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .with_context(|| format!("Failed to list {}", dir.display()))?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&base) {
                    let parts: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    files.push(parts.join("/"));
                }
            }
        }

        files.sort();
        Ok(files)
    }

    async fn read(&self, table_dir: &str, relative: &str) -> Result<Bytes> {
        let path = self.root.join(table_dir).join(relative);
        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Bytes::from(data))
    }
}

// ============================================================================
// Object stores
// ============================================================================

/// Cloud object store sink
///
/// Object stores have no directory rename, so publish is best effort: files
/// are staged under `_staging/`, the previous table is deleted, then staged
/// objects are renamed into place.
#[derive(Debug, Clone)]
pub struct ObjectStoreSink {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Base path prefix within the bucket/container
    prefix: String,
    /// Original URL scheme for logging
    scheme: String,
}

fn split_bucket(without_scheme: &str) -> (&str, String) {
    match without_scheme.find('/') {
        Some(idx) => (
            &without_scheme[..idx],
            without_scheme[idx + 1..].trim_end_matches('/').to_string(),
        ),
        None => (without_scheme, String::new()),
    }
}

impl ObjectStoreSink {
    /// Wrap an existing store
    pub fn new(
        store: Arc<dyn ObjectStore>,
        prefix: impl Into<String>,
        scheme: impl Into<String>,
    ) -> Self {
        Self {
            store,
            prefix: prefix.into().trim_matches('/').to_string(),
            scheme: scheme.into(),
        }
    }

    /// Parse S3 or R2 URL
    fn parse_s3(url: &str, is_r2: bool) -> Result<Self> {
        let scheme = if is_r2 { "r2" } else { "s3" };
        let without_scheme = url
            .strip_prefix(&format!("{scheme}://"))
            .ok_or_else(|| Error::config(format!("Invalid {scheme} URL: {url}")))?;
        let (bucket, prefix) = split_bucket(without_scheme);

        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

        // R2 endpoint: https://<account_id>.r2.cloudflarestorage.com
        if is_r2 {
            if let Ok(endpoint) = std::env::var("R2_ENDPOINT_URL") {
                builder = builder.with_endpoint(endpoint);
            }
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create {scheme} client: {e}")))?;

        Ok(Self::new(Arc::new(store), prefix, scheme))
    }

    /// Parse GCS URL
    fn parse_gcs(url: &str) -> Result<Self> {
        let without_scheme = url
            .strip_prefix("gs://")
            .ok_or_else(|| Error::config(format!("Invalid GCS URL: {url}")))?;
        let (bucket, prefix) = split_bucket(without_scheme);

        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;

        Ok(Self::new(Arc::new(store), prefix, "gs"))
    }

    /// Parse Azure Blob URL
    fn parse_azure(url: &str) -> Result<Self> {
        let without_scheme = url
            .strip_prefix("az://")
            .ok_or_else(|| Error::config(format!("Invalid Azure URL: {url}")))?;
        let (container, prefix) = split_bucket(without_scheme);

        let store = MicrosoftAzureBuilder::from_env()
            .with_container_name(container)
            .build()
            .map_err(|e| Error::config(format!("Failed to create Azure client: {e}")))?;

        Ok(Self::new(Arc::new(store), prefix, "az"))
    }

    fn path(&self, relative: &str) -> ObjectPath {
        if self.prefix.is_empty() {
            ObjectPath::from(relative)
        } else {
            ObjectPath::from(format!("{}/{relative}", self.prefix))
        }
    }

    async fn list_paths(&self, dir: &ObjectPath) -> Result<Vec<ObjectPath>> {
        let objects: Vec<_> = self.store.list(Some(dir)).try_collect().await?;
        Ok(objects.into_iter().map(|meta| meta.location).collect())
    }
}

#[async_trait]
impl TableSink for ObjectStoreSink {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    async fn exists(&self, table_dir: &str) -> Result<bool> {
        Ok(!self.list_paths(&self.path(table_dir)).await?.is_empty())
    }

    async fn publish(
        &self,
        table_dir: &str,
        files: Vec<TableFile>,
        mode: WriteMode,
    ) -> Result<String> {
        let target = self.path(table_dir);
        let existing = self.list_paths(&target).await?;
        if mode == WriteMode::ErrorIfExists && !existing.is_empty() {
            return Err(Error::write(
                table_dir,
                format!("{}://{target} already exists", self.scheme),
            ));
        }

        let run = uuid::Uuid::new_v4().simple().to_string();
        let staging_dir = format!("_staging/{run}/{table_dir}");

        let mut staged = Vec::with_capacity(files.len());
        for file in &files {
            let from = self.path(&format!("{staging_dir}/{}", file.path));
            if let Err(e) = self.store.put(&from, file.data.clone().into()).await {
                for path in &staged {
                    let _ = self.store.delete(path).await;
                }
                return Err(Error::write(table_dir, format!("Failed to stage {from}: {e}")));
            }
            staged.push(from);
        }

        for path in existing {
            self.store
                .delete(&path)
                .await
                .map_err(|e| Error::write(table_dir, format!("Failed to delete {path}: {e}")))?;
        }

        for (file, from) in files.iter().zip(&staged) {
            let to = self.path(&format!("{table_dir}/{}", file.path));
            self.store
                .rename(from, &to)
                .await
                .map_err(|e| Error::write(table_dir, format!("Failed to publish {to}: {e}")))?;
        }

        debug!("Published {} files to {}://{target}", files.len(), self.scheme);
        Ok(format!("{}://{target}", self.scheme))
    }

    async fn list(&self, table_dir: &str) -> Result<Vec<String>> {
        let base = format!("{}/", self.path(table_dir));
        let mut files: Vec<String> = self
            .list_paths(&self.path(table_dir))
            .await?
            .into_iter()
            .filter_map(|p| p.as_ref().strip_prefix(&base).map(str::to_string))
            .collect();
        files.sort();
        Ok(files)
    }

    async fn read(&self, table_dir: &str, relative: &str) -> Result<Bytes> {
        let path = self.path(&format!("{table_dir}/{relative}"));
        let object = self.store.get(&path).await.context(format!("Failed to read {path}"))?;
        Ok(object.bytes().await?)
    }
}
