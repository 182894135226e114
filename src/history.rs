//! Per-dataset ingestion history: signature cache and mtime watermark.
//!
//! [`IngestionHistoryCache`] tracks, for one dataset, which granule files
//! have already been ingested (by content signature) and the latest
//! file-modification time seen across them. Callers ask
//! [`has_valid_cache`](IngestionHistoryCache::has_valid_cache) before
//! ingesting a file and [`push`](IngestionHistoryCache::push) after, then
//! [`close`](IngestionHistoryCache::close) the cache to persist the
//! watermark.
//!
//! Persistence goes through the [`HistoryStore`] trait so the cache logic is
//! independent of the backing index; [`MemoryHistoryStore`] serves tests and
//! offline runs, `SolrHistoryStore` the real deployment.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::errors::PipelineError;
use crate::signature::SignatureScheme;

/// Derive the history-document id for a `(dataset, file)` pair.
///
/// First 8 bytes of SHA-256 over the concatenation, as a u64. The key is a
/// lookup shortcut, not a semantic identifier: different file names can
/// collide, so stores verify the stored file name on read.
pub fn doc_key(dataset_id: &str, file_name: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(dataset_id.as_bytes());
    hasher.update(file_name.as_bytes());
    let digest = hasher.finalize();
    u64::from_be_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ])
}

/// Persistence backend for ingestion history.
///
/// Mirrors the two logical collections: per-granule signature records and a
/// single watermark document per dataset.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Cached signature for `(dataset, file_name)`, if any.
    async fn cached_signature(
        &self,
        dataset_id: &str,
        file_name: &str,
    ) -> Result<Option<String>, PipelineError>;

    /// Replace the signature record for `(dataset, file_name)`.
    async fn push_record(
        &self,
        dataset_id: &str,
        file_name: &str,
        signature: &str,
    ) -> Result<(), PipelineError>;

    /// Load the dataset's persisted watermark.
    async fn latest_update(&self, dataset_id: &str) -> Result<Option<i64>, PipelineError>;

    /// Persist the dataset's watermark.
    async fn push_latest_update(
        &self,
        dataset_id: &str,
        timestamp: i64,
    ) -> Result<(), PipelineError>;
}

/// Ingestion history for a single dataset.
///
/// One instance per dataset, one logical caller at a time: the watermark
/// lives in local memory between [`push`](IngestionHistoryCache::push) and
/// [`close`](IngestionHistoryCache::close), so concurrent pushes for the
/// same dataset can lose updates.
pub struct IngestionHistoryCache {
    store: Arc<dyn HistoryStore>,
    dataset_id: String,
    signature: Box<dyn SignatureScheme>,
    latest_ingested_file_update: Option<i64>,
}

impl IngestionHistoryCache {
    /// Open the history cache for one dataset, loading its persisted
    /// watermark from the store.
    pub async fn new(
        store: Arc<dyn HistoryStore>,
        dataset_id: impl Into<String>,
        signature: Box<dyn SignatureScheme>,
    ) -> Result<Self, PipelineError> {
        let dataset_id = dataset_id.into();
        let latest_ingested_file_update = store.latest_update(&dataset_id).await?;
        Ok(Self {
            store,
            dataset_id,
            signature,
            latest_ingested_file_update,
        })
    }

    /// Whether the file's current signature matches the cached one.
    ///
    /// A missing record is a plain `Ok(false)`; only signature computation
    /// and store communication can fail.
    pub async fn has_valid_cache(&self, file_path: &str) -> Result<bool, PipelineError> {
        let file_path = file_path.trim();
        let file_name = base_name(file_path);
        let signature = self.signature.signature(Path::new(file_path))?;
        let cached = self
            .store
            .cached_signature(&self.dataset_id, &file_name)
            .await?;
        debug!(
            %signature,
            cached = cached.as_deref().unwrap_or("<none>"),
            "comparing granule signatures"
        );
        Ok(cached.as_deref() == Some(signature.as_str()))
    }

    /// Record a granule as ingested and raise the in-memory watermark to
    /// its modification time.
    pub async fn push(&mut self, file_path: &str) -> Result<(), PipelineError> {
        let file_path = file_path.trim();
        let file_name = base_name(file_path);
        let signature = self.signature.signature(Path::new(file_path))?;
        self.store
            .push_record(&self.dataset_id, &file_name, &signature)
            .await?;

        let mtime = file_mtime(Path::new(file_path))?;
        self.latest_ingested_file_update = Some(match self.latest_ingested_file_update {
            Some(current) => current.max(mtime),
            None => mtime,
        });
        Ok(())
    }

    /// The latest file-modification time ingested for this dataset, epoch
    /// seconds, if any file has been recorded.
    pub fn latest_ingested_file_update(&self) -> Option<i64> {
        self.latest_ingested_file_update
    }

    /// Flush the watermark and release the store.
    ///
    /// Callers must invoke this on every exit path, including error paths.
    /// Watermark updates since the last successful `close` are lost if the
    /// process dies first, so the next startup may reprocess files whose
    /// mtimes are at or before the persisted watermark.
    pub async fn close(self) -> Result<(), PipelineError> {
        if let Some(timestamp) = self.latest_ingested_file_update {
            self.store
                .push_latest_update(&self.dataset_id, timestamp)
                .await?;
        }
        Ok(())
    }
}

fn base_name(file_path: &str) -> String {
    Path::new(file_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.to_string())
}

fn file_mtime(path: &Path) -> Result<i64, PipelineError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        PipelineError::PipelineRunning(format!("cannot stat {}: {}", path.display(), e))
    })?;
    let modified = metadata.modified().map_err(|e| {
        PipelineError::PipelineRunning(format!("no mtime for {}: {}", path.display(), e))
    })?;
    Ok(modified
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64)
}

struct GranuleRecord {
    dataset: String,
    granule: String,
    signature: String,
}

/// In-memory [`HistoryStore`] for tests and offline runs.
///
/// Keyed the same way as the Solr store — by [`doc_key`] — including the
/// collision guard on read.
#[derive(Default)]
pub struct MemoryHistoryStore {
    records: RwLock<HashMap<u64, GranuleRecord>>,
    watermarks: RwLock<HashMap<String, i64>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn cached_signature(
        &self,
        dataset_id: &str,
        file_name: &str,
    ) -> Result<Option<String>, PipelineError> {
        let records = self.records.read().unwrap();
        Ok(records
            .get(&doc_key(dataset_id, file_name))
            .filter(|record| record.dataset == dataset_id && record.granule == file_name)
            .map(|record| record.signature.clone()))
    }

    async fn push_record(
        &self,
        dataset_id: &str,
        file_name: &str,
        signature: &str,
    ) -> Result<(), PipelineError> {
        let mut records = self.records.write().unwrap();
        records.insert(
            doc_key(dataset_id, file_name),
            GranuleRecord {
                dataset: dataset_id.to_string(),
                granule: file_name.to_string(),
                signature: signature.to_string(),
            },
        );
        Ok(())
    }

    async fn latest_update(&self, dataset_id: &str) -> Result<Option<i64>, PipelineError> {
        let watermarks = self.watermarks.read().unwrap();
        Ok(watermarks.get(dataset_id).copied())
    }

    async fn push_latest_update(
        &self,
        dataset_id: &str,
        timestamp: i64,
    ) -> Result<(), PipelineError> {
        let mut watermarks = self.watermarks.write().unwrap();
        watermarks.insert(dataset_id.to_string(), timestamp);
        Ok(())
    }
}
