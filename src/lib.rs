//! # Tile Metastore
//!
//! A metadata-publishing adapter for satellite tile ingestion pipelines.
//!
//! Tile Metastore takes already-computed tile summaries (geospatial bounding
//! boxes, time ranges, statistics) and a per-file ingestion history, and
//! persists them into a Solr search index with basic retry and health-check
//! logic. It does no scheduling and no queue consumption — it is the
//! document-shaping and HTTP-call tail of a larger pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌───────────────┐
//! │ TileSummary  │──▶│ TileDocument     │──▶│ Solr          │
//! │ (upstream)   │   │ Builder          │   │ nexustiles    │
//! └──────────────┘   └──────────────────┘   └───────────────┘
//!
//! ┌──────────────┐   ┌──────────────────┐   ┌───────────────┐
//! │ granule file │──▶│ IngestionHistory │──▶│ Solr          │
//! │ (signature)  │   │ Cache            │   │ granules +    │
//! └──────────────┘   └──────────────────┘   │ datasets      │
//!                                           └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! tms provision                     # create history collections
//! tms publish tile.json             # index one tile summary
//! tms history check --dataset avhrr ./data/sst_20260101.nc
//! tms health                        # probe Solr
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Tile summary data types |
//! | [`errors`] | Pipeline error taxonomy |
//! | [`document`] | Tile summary → Solr document conversion |
//! | [`signature`] | Granule file signature schemes |
//! | [`solr`] | Low-level Solr HTTP client |
//! | [`metadata`] | Metadata store trait and Solr implementation |
//! | [`history`] | Per-dataset ingestion history cache |
//! | [`history_solr`] | Solr-backed history store with provisioning |

pub mod config;
pub mod document;
pub mod errors;
pub mod history;
pub mod history_solr;
pub mod metadata;
pub mod models;
pub mod signature;
pub mod solr;
