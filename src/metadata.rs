//! Metadata store abstraction and the Solr-backed implementation.
//!
//! [`SolrStore`] converts tile summaries into flat documents (via
//! [`TileDocumentBuilder`]) and upserts them into the tile collection.
//!
//! # Retry Strategy
//!
//! The save path retries on any failure — Solr answers every upsert, so a
//! failed attempt carries no partial state — with exponential backoff:
//! 1s, 2s, 4s, 8s between attempts, bounded by `max_retries` attempts in
//! total (5 by default). The history components deliberately do NOT retry;
//! their callers own that decision.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, warn};

use crate::config::SolrConfig;
use crate::document::TileDocumentBuilder;
use crate::errors::{Backend, PipelineError};
use crate::models::TileSummary;
use crate::solr::SolrClient;

/// Sink for tile metadata documents.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Probe the backend.
    ///
    /// `Ok(false)` means reachable but unhealthy; an unreachable backend
    /// raises [`PipelineError::FailedHealthCheck`] so orchestration can tell
    /// the two apart.
    async fn health_check(&self) -> Result<bool, PipelineError>;

    /// Convert and persist one tile summary.
    async fn save_metadata(&self, tile: &TileSummary) -> Result<(), PipelineError>;
}

/// Solr-backed [`MetadataStore`].
pub struct SolrStore {
    client: SolrClient,
    collection: String,
    builder: TileDocumentBuilder,
    max_retries: u32,
}

impl SolrStore {
    pub fn new(config: &SolrConfig) -> Result<Self, PipelineError> {
        let client = SolrClient::new(&config.url, Duration::from_secs(config.timeout_secs))?;
        Ok(Self {
            client,
            collection: config.collection.clone(),
            builder: TileDocumentBuilder::new(config.table_name.clone()),
            max_retries: config.max_retries.max(1),
        })
    }

    async fn save_document(&self, doc: &Value) -> Result<(), PipelineError> {
        let mut last_err = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            match self.client.add_and_commit(&self.collection, doc).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "saving tile document failed");
                    last_err = Some(e);
                }
            }
        }

        let cause = last_err
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt was made".to_string());
        error!(
            collection = %self.collection,
            attempts = self.max_retries,
            "giving up on tile document"
        );
        Err(PipelineError::TileProcessing(format!(
            "saving tile document failed after {} attempts: {}",
            self.max_retries, cause
        )))
    }
}

#[async_trait]
impl MetadataStore for SolrStore {
    async fn health_check(&self) -> Result<bool, PipelineError> {
        match self.client.ping(&self.collection).await {
            Ok(200) => Ok(true),
            Ok(status) => {
                error!(status, "solr health check returned non-OK status");
                Ok(false)
            }
            Err(PipelineError::LostConnection { message, .. }) => {
                Err(PipelineError::failed_health_check(Backend::Solr, message))
            }
            Err(other) => Err(other),
        }
    }

    async fn save_metadata(&self, tile: &TileSummary) -> Result<(), PipelineError> {
        let doc = Value::Object(self.builder.build(tile));
        self.save_document(&doc).await
    }
}
