//! Core data models for tile metadata publishing.
//!
//! These types mirror the tile summary records the upstream processing
//! pipeline hands to this adapter. They derive `serde` so summaries can be
//! read from JSON by the CLI and by tests.

use serde::{Deserialize, Serialize};

/// Geospatial bounding box of a tile, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

/// Value statistics computed over a tile's data variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub count: i64,
    /// Earliest observation time, epoch seconds UTC.
    pub min_time: i64,
    /// Latest observation time, epoch seconds UTC.
    pub max_time: i64,
}

/// A named attribute carried through from the source granule.
///
/// Attributes with a single value are published as scalar fields; attributes
/// with multiple values are published as ordered lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileAttribute {
    pub name: String,
    pub values: Vec<String>,
}

/// Tile-variant payload.
///
/// Every variant carries a depth index; the ECCO grid additionally carries
/// its native tile number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TileVariant {
    Grid { depth: i64 },
    Swath { depth: i64 },
    TimeSeries { depth: i64 },
    Ecco { depth: i64, tile: i32 },
}

impl TileVariant {
    pub fn depth(&self) -> i64 {
        match *self {
            TileVariant::Grid { depth }
            | TileVariant::Swath { depth }
            | TileVariant::TimeSeries { depth }
            | TileVariant::Ecco { depth, .. } => depth,
        }
    }

    /// The ECCO tile number, when this variant carries one.
    pub fn ecco_tile(&self) -> Option<i32> {
        match *self {
            TileVariant::Ecco { tile, .. } => Some(tile),
            _ => None,
        }
    }
}

/// Summary record for a single tile, as produced upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileSummary {
    pub dataset_name: String,
    pub tile_id: String,
    pub section_spec: String,
    pub data_var_name: String,
    /// Path of the source granule; only the base file name is published.
    pub granule: String,
    pub bbox: BBox,
    pub stats: TileStats,
    #[serde(default)]
    pub global_attributes: Vec<TileAttribute>,
    pub tile: TileVariant,
}
