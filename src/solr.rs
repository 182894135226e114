//! Low-level Solr HTTP client.
//!
//! A thin `reqwest` wrapper over the handful of Solr endpoints the metadata
//! and history stores need: collection administration, schema mutation, `id`
//! lookups, and document updates. Retry policy lives with the callers; this
//! client reports each failure exactly once.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use crate::errors::{Backend, PipelineError};

/// Cluster topology snapshot from a CLUSTERSTATUS call.
#[derive(Debug, Clone)]
pub struct ClusterStatus {
    pub live_nodes: usize,
    pub collections: Vec<String>,
}

pub struct SolrClient {
    base_url: String,
    http: reqwest::Client,
}

impl SolrClient {
    /// Build a client for a Solr base URL (e.g. `http://localhost:8983`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                PipelineError::PipelineBuilding(format!("cannot build HTTP client: {}", e))
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Live-node count and existing collection names.
    pub async fn cluster_status(&self) -> Result<ClusterStatus, PipelineError> {
        let url = format!("{}/solr/admin/collections", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("action", "CLUSTERSTATUS"), ("wt", "json")])
            .send()
            .await
            .map_err(transport_error)?;
        let body: Value = response.json().await.map_err(transport_error)?;

        let live_nodes = body["cluster"]["live_nodes"]
            .as_array()
            .map(|nodes| nodes.len())
            .unwrap_or(0);
        let collections = body["cluster"]["collections"]
            .as_object()
            .map(|collections| collections.keys().cloned().collect())
            .unwrap_or_default();

        Ok(ClusterStatus {
            live_nodes,
            collections,
        })
    }

    /// Create a collection sharded across `num_shards` nodes.
    pub async fn create_collection(
        &self,
        name: &str,
        num_shards: usize,
    ) -> Result<(), PipelineError> {
        let url = format!("{}/solr/admin/collections", self.base_url);
        let shards = num_shards.max(1).to_string();
        let response = self
            .http
            .get(&url)
            .query(&[
                ("action", "CREATE"),
                ("name", name),
                ("numShards", shards.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::PipelineBuilding(format!(
                "creating collection {} failed with HTTP status {}: {}",
                name, status, body
            )));
        }
        Ok(())
    }

    /// Add a non-stored field to a collection's schema.
    ///
    /// Repeat provisioning is expected; a "field already exists" response
    /// counts as success.
    pub async fn add_schema_field(
        &self,
        collection: &str,
        name: &str,
        field_type: &str,
    ) -> Result<(), PipelineError> {
        let url = format!("{}/solr/{}/schema", self.base_url, collection);
        let payload = json!({
            "add-field": {
                "name": name,
                "type": field_type,
                "stored": false,
            }
        });
        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;
        if response.status().is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        if body.contains("already exists") {
            debug!(collection, field = name, "schema field already present");
            return Ok(());
        }
        Err(PipelineError::PipelineBuilding(format!(
            "adding field {} to {} schema failed: {}",
            name, collection, body
        )))
    }

    /// Fetch the zero-or-one document whose `id` equals `id`.
    pub async fn query_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Value>, PipelineError> {
        let url = format!("{}/solr/{}/select", self.base_url, collection);
        let query = format!("id:{}", id);
        let response = self
            .http
            .get(&url)
            .query(&[("q", query.as_str()), ("rows", "1"), ("wt", "json")])
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::PipelineRunning(format!(
                "query on {} failed with HTTP status {}",
                collection, status
            )));
        }
        let body: Value = response.json().await.map_err(transport_error)?;
        let doc = body["response"]["docs"]
            .as_array()
            .and_then(|docs| docs.first())
            .cloned();
        Ok(doc)
    }

    /// Add documents without committing.
    pub async fn add(&self, collection: &str, docs: &[Value]) -> Result<(), PipelineError> {
        self.update(collection, &Value::from(docs.to_vec())).await
    }

    /// Delete every document matching the query, without committing.
    pub async fn delete_by_query(
        &self,
        collection: &str,
        query: &str,
    ) -> Result<(), PipelineError> {
        self.update(collection, &json!({ "delete": { "query": query } }))
            .await
    }

    /// Issue a hard commit.
    pub async fn commit(&self, collection: &str) -> Result<(), PipelineError> {
        self.update(collection, &json!({ "commit": {} })).await
    }

    /// Add a single document through the JSON-docs handler, committing in
    /// the same request.
    pub async fn add_and_commit(&self, collection: &str, doc: &Value) -> Result<(), PipelineError> {
        let url = format!("{}/solr/{}/update/json/docs", self.base_url, collection);
        let response = self
            .http
            .post(&url)
            .query(&[("commit", "true")])
            .json(doc)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status().as_u16();
        if !(200..400).contains(&status) {
            return Err(PipelineError::PipelineRunning(format!(
                "saving document to solr failed with HTTP status {}",
                status
            )));
        }
        Ok(())
    }

    /// Ping a collection, returning the HTTP status code.
    pub async fn ping(&self, collection: &str) -> Result<u16, PipelineError> {
        let url = format!("{}/solr/{}/admin/ping", self.base_url, collection);
        let response = self.http.get(&url).send().await.map_err(transport_error)?;
        Ok(response.status().as_u16())
    }

    async fn update(&self, collection: &str, body: &Value) -> Result<(), PipelineError> {
        let url = format!("{}/solr/{}/update", self.base_url, collection);
        let response = self
            .http
            .post(&url)
            .query(&[("wt", "json")])
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::PipelineRunning(format!(
                "update on {} failed with HTTP status {}: {}",
                collection, status, text
            )));
        }
        Ok(())
    }
}

/// Map a transport failure: a refused/dropped connection is a lost
/// connection, everything else is a failed request.
fn transport_error(err: reqwest::Error) -> PipelineError {
    if err.is_connect() {
        PipelineError::lost_connection(Backend::Solr, err.to_string())
    } else {
        PipelineError::PipelineRunning(format!("solr request failed: {}", err))
    }
}
