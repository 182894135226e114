use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub solr: SolrConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SolrConfig {
    #[serde(default = "default_solr_url")]
    pub url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_table_name")]
    pub table_name: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for SolrConfig {
    fn default() -> Self {
        Self {
            url: default_solr_url(),
            collection: default_collection(),
            table_name: default_table_name(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_solr_url() -> String {
    "http://localhost:8983".to_string()
}
fn default_collection() -> String {
    "nexustiles".to_string()
}
fn default_table_name() -> String {
    "sea_surface_temp".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_granule_collection")]
    pub granule_collection: String,
    #[serde(default = "default_dataset_collection")]
    pub dataset_collection: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            granule_collection: default_granule_collection(),
            dataset_collection: default_dataset_collection(),
        }
    }
}

fn default_granule_collection() -> String {
    "nexusgranules".to_string()
}
fn default_dataset_collection() -> String {
    "nexusdatasets".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_service_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.solr.url, "http://localhost:8983");
        assert_eq!(config.solr.collection, "nexustiles");
        assert_eq!(config.solr.table_name, "sea_surface_temp");
        assert_eq!(config.solr.max_retries, 5);
        assert_eq!(config.history.granule_collection, "nexusgranules");
        assert_eq!(config.history.dataset_collection, "nexusdatasets");
    }

    #[test]
    fn test_partial_override() {
        let config: Config = toml::from_str(
            r#"
[solr]
url = "http://solr:8983"
max_retries = 3

[history]
granule_collection = "granules"
"#,
        )
        .unwrap();
        assert_eq!(config.solr.url, "http://solr:8983");
        assert_eq!(config.solr.max_retries, 3);
        assert_eq!(config.solr.collection, "nexustiles");
        assert_eq!(config.history.granule_collection, "granules");
        assert_eq!(config.history.dataset_collection, "nexusdatasets");
    }
}
