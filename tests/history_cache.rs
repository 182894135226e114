use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use tempfile::TempDir;

use tile_metastore::history::{HistoryStore, IngestionHistoryCache, MemoryHistoryStore};
use tile_metastore::signature::Sha256Signature;

fn write_granule(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

fn mtime_secs(path: &str) -> i64 {
    fs::metadata(Path::new(path))
        .unwrap()
        .modified()
        .unwrap()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

async fn open_cache(store: Arc<MemoryHistoryStore>, dataset: &str) -> IngestionHistoryCache {
    IngestionHistoryCache::new(store, dataset, Box::new(Sha256Signature))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_push_then_check_roundtrip() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryHistoryStore::new());
    let path = write_granule(&dir, "sst_20260101.nc", "original content");

    let mut cache = open_cache(store, "avhrr").await;
    assert!(!cache.has_valid_cache(&path).await.unwrap());

    cache.push(&path).await.unwrap();
    assert!(cache.has_valid_cache(&path).await.unwrap());

    // Rewriting the granule invalidates the cached signature until the next
    // push.
    write_granule(&dir, "sst_20260101.nc", "reprocessed content");
    assert!(!cache.has_valid_cache(&path).await.unwrap());

    cache.push(&path).await.unwrap();
    assert!(cache.has_valid_cache(&path).await.unwrap());
}

#[tokio::test]
async fn test_paths_are_trimmed_and_keyed_by_base_name() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryHistoryStore::new());
    let path = write_granule(&dir, "sst_20260102.nc", "content");

    let mut cache = open_cache(store, "avhrr").await;
    cache.push(&format!("  {}  ", path)).await.unwrap();
    assert!(cache.has_valid_cache(&path).await.unwrap());
}

#[tokio::test]
async fn test_watermark_tracks_max_mtime_and_survives_close() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryHistoryStore::new());
    let paths = vec![
        write_granule(&dir, "sst_a.nc", "a"),
        write_granule(&dir, "sst_b.nc", "b"),
        write_granule(&dir, "sst_c.nc", "c"),
    ];

    let mut cache = open_cache(store.clone(), "avhrr").await;
    assert_eq!(cache.latest_ingested_file_update(), None);

    for path in &paths {
        cache.push(path).await.unwrap();
    }
    let expected = paths.iter().map(|p| mtime_secs(p)).max().unwrap();
    assert_eq!(cache.latest_ingested_file_update(), Some(expected));

    cache.close().await.unwrap();
    assert_eq!(store.latest_update("avhrr").await.unwrap(), Some(expected));

    // A fresh cache for the same dataset starts from the persisted
    // watermark.
    let cache = open_cache(store, "avhrr").await;
    assert_eq!(cache.latest_ingested_file_update(), Some(expected));
}

#[tokio::test]
async fn test_close_without_pushes_leaves_watermark_absent() {
    let store = Arc::new(MemoryHistoryStore::new());
    let cache = open_cache(store.clone(), "avhrr").await;
    cache.close().await.unwrap();
    assert_eq!(store.latest_update("avhrr").await.unwrap(), None);
}

#[tokio::test]
async fn test_datasets_do_not_share_history() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryHistoryStore::new());
    let path = write_granule(&dir, "sst_20260103.nc", "content");

    let mut avhrr = open_cache(store.clone(), "avhrr").await;
    avhrr.push(&path).await.unwrap();
    assert!(avhrr.has_valid_cache(&path).await.unwrap());

    let modis = open_cache(store, "modis").await;
    assert!(!modis.has_valid_cache(&path).await.unwrap());
}
