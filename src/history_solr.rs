//! Solr-backed ingestion history store.
//!
//! Records live in two collections: one signature document per
//! `(dataset, granule)` pair and one watermark document per dataset.
//! [`SolrHistoryStore::connect`] provisions both collections idempotently
//! before the store is handed out.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::PipelineError;
use crate::history::{doc_key, HistoryStore};
use crate::solr::{ClusterStatus, SolrClient};

const GRANULE_FIELDS: &[(&str, &str)] = &[
    ("dataset_s", "StrField"),
    ("granule_s", "StrField"),
    ("granule_signature_s", "StrField"),
];

const DATASET_FIELDS: &[(&str, &str)] = &[
    ("dataset_s", "StrField"),
    ("latest_update_l", "TrieLongField"),
];

/// [`HistoryStore`] backed by two Solr collections.
pub struct SolrHistoryStore {
    client: SolrClient,
    granule_collection: String,
    dataset_collection: String,
}

impl SolrHistoryStore {
    /// Connect to Solr and provision the history collections.
    ///
    /// Provisioning queries the cluster state, creates each missing
    /// collection sharded by live-node count, then adds the schema fields,
    /// tolerating fields that already exist. Any failure is fatal for
    /// construction: a collection created without its schema fields needs
    /// manual repair, so callers should not continue past an error here.
    pub async fn connect(config: &Config) -> Result<Self, PipelineError> {
        let client = SolrClient::new(
            &config.solr.url,
            Duration::from_secs(config.solr.timeout_secs),
        )?;
        let store = Self {
            client,
            granule_collection: config.history.granule_collection.clone(),
            dataset_collection: config.history.dataset_collection.clone(),
        };
        store.ensure_collections().await?;
        Ok(store)
    }

    async fn ensure_collections(&self) -> Result<(), PipelineError> {
        let status = self.client.cluster_status().await?;
        self.ensure_collection(&status, &self.granule_collection, GRANULE_FIELDS)
            .await?;
        self.ensure_collection(&status, &self.dataset_collection, DATASET_FIELDS)
            .await?;
        Ok(())
    }

    async fn ensure_collection(
        &self,
        status: &ClusterStatus,
        name: &str,
        fields: &[(&str, &str)],
    ) -> Result<(), PipelineError> {
        if status.collections.iter().any(|existing| existing == name) {
            info!(collection = name, "collection already exists");
        } else {
            // Shard by live-node count so one dataset's granules spread
            // across nodes.
            self.client
                .create_collection(name, status.live_nodes)
                .await?;
            info!(collection = name, "created solr collection");
        }

        for (field, field_type) in fields {
            self.client.add_schema_field(name, field, field_type).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SolrHistoryStore {
    async fn cached_signature(
        &self,
        dataset_id: &str,
        file_name: &str,
    ) -> Result<Option<String>, PipelineError> {
        let key = doc_key(dataset_id, file_name);
        let doc = match self
            .client
            .query_by_id(&self.granule_collection, &key.to_string())
            .await?
        {
            Some(doc) => doc,
            None => return Ok(None),
        };

        // Derived keys can collide across file names; a record for a
        // different granule is a miss, not a hit.
        if doc.get("granule_s").and_then(Value::as_str) != Some(file_name) {
            warn!(key, file_name, "history key collision, treating as cache miss");
            return Ok(None);
        }

        Ok(doc
            .get("granule_signature_s")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    async fn push_record(
        &self,
        dataset_id: &str,
        file_name: &str,
        signature: &str,
    ) -> Result<(), PipelineError> {
        let key = doc_key(dataset_id, file_name);
        // Delete, add, and commit are separate calls; a crash in between can
        // transiently lose the record.
        self.client
            .delete_by_query(&self.granule_collection, &format!("id:{}", key))
            .await?;
        self.client
            .add(
                &self.granule_collection,
                &[json!({
                    "id": key.to_string(),
                    "dataset_s": dataset_id,
                    "granule_s": file_name,
                    "granule_signature_s": signature,
                })],
            )
            .await?;
        self.client.commit(&self.granule_collection).await
    }

    async fn latest_update(&self, dataset_id: &str) -> Result<Option<i64>, PipelineError> {
        let doc = self
            .client
            .query_by_id(&self.dataset_collection, dataset_id)
            .await?;
        Ok(doc
            .as_ref()
            .and_then(|doc| doc.get("latest_update_l"))
            .and_then(Value::as_i64))
    }

    async fn push_latest_update(
        &self,
        dataset_id: &str,
        timestamp: i64,
    ) -> Result<(), PipelineError> {
        self.client
            .delete_by_query(&self.dataset_collection, &format!("id:{}", dataset_id))
            .await?;
        self.client
            .add(
                &self.dataset_collection,
                &[json!({
                    "id": dataset_id,
                    "dataset_s": dataset_id,
                    "latest_update_l": timestamp,
                })],
            )
            .await?;
        self.client.commit(&self.dataset_collection).await
    }
}
