//! Tile summary → Solr document conversion.
//!
//! [`TileDocumentBuilder`] flattens a [`TileSummary`] into the document shape
//! the search index expects: fixed metadata fields, a WKT geometry derived
//! from the bounding box, ISO-8601 time range fields, and one dynamic field
//! per granule attribute.
//!
//! The builder is pure — no I/O, no side effects — and never fails for a
//! structurally valid summary, so it is trivially safe to share across tasks.

use std::path::Path;

use serde_json::{Map, Value};

use crate::models::{BBox, TileSummary};

/// ISO-8601 instant format used for the time-range fields.
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Builds flat Solr documents from tile summaries.
#[derive(Debug, Clone)]
pub struct TileDocumentBuilder {
    table_name: String,
}

impl TileDocumentBuilder {
    /// Create a builder stamping documents with the given table marker.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
        }
    }

    /// Convert one tile summary into a Solr document.
    ///
    /// Dynamic attribute fields are written after the fixed fields, in
    /// attribute order; on a duplicate name the last writer wins, including
    /// an attribute shadowing a fixed field.
    pub fn build(&self, tile: &TileSummary) -> Map<String, Value> {
        let bbox = &tile.bbox;
        let stats = &tile.stats;

        let min_time = format_time(stats.min_time);
        let max_time = format_time(stats.max_time);
        let geo = determine_geo(bbox);

        let granule_file_name = Path::new(&tile.granule)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| tile.granule.clone());

        let mut doc = Map::new();
        doc.insert("table_s".into(), Value::from(self.table_name.clone()));
        doc.insert("geo".into(), Value::from(geo));
        doc.insert("id".into(), Value::from(tile.tile_id.clone()));
        doc.insert(
            "solr_id_s".into(),
            Value::from(format!("{}!{}", tile.dataset_name, tile.tile_id)),
        );
        doc.insert(
            "sectionSpec_s".into(),
            Value::from(tile.section_spec.clone()),
        );
        doc.insert("dataset_s".into(), Value::from(tile.dataset_name.clone()));
        doc.insert("granule_s".into(), Value::from(granule_file_name));
        doc.insert(
            "tile_var_name_s".into(),
            Value::from(tile.data_var_name.clone()),
        );
        doc.insert("tile_min_lon".into(), Value::from(bbox.lon_min));
        doc.insert("tile_max_lon".into(), Value::from(bbox.lon_max));
        doc.insert("tile_min_lat".into(), Value::from(bbox.lat_min));
        doc.insert("tile_max_lat".into(), Value::from(bbox.lat_max));
        doc.insert("tile_depth".into(), Value::from(tile.tile.depth()));
        doc.insert("tile_min_time_dt".into(), Value::from(min_time));
        doc.insert("tile_max_time_dt".into(), Value::from(max_time));
        doc.insert("tile_min_val_d".into(), Value::from(stats.min));
        doc.insert("tile_max_val_d".into(), Value::from(stats.max));
        doc.insert("tile_avg_val_d".into(), Value::from(stats.mean));
        doc.insert("tile_count_i".into(), Value::from(stats.count));

        if let Some(ecco_tile) = tile.tile.ecco_tile() {
            doc.insert("ecco_tile".into(), Value::from(ecco_tile));
        }

        for attribute in &tile.global_attributes {
            let value = if attribute.values.len() == 1 {
                Value::from(attribute.values[0].clone())
            } else {
                Value::from(attribute.values.clone())
            };
            doc.insert(attribute.name.clone(), value);
        }

        doc
    }
}

/// Derive the WKT geometry for a tile's bounding box.
///
/// Solr cannot index a POLYGON whose corners collapse to a single point or
/// to a line, and it stores coordinates at 3-decimal precision, so
/// degeneracy is decided on the rounded values rather than the raw floats.
pub fn determine_geo(bbox: &BBox) -> String {
    let lat_min = format_latlon(bbox.lat_min);
    let lat_max = format_latlon(bbox.lat_max);
    let lon_min = format_latlon(bbox.lon_min);
    let lon_max = format_latlon(bbox.lon_max);

    let lat_collapsed = lat_min == lat_max;
    let lon_collapsed = lon_min == lon_max;

    if lat_collapsed && lon_collapsed {
        format!("POINT({lon_min} {lat_min})")
    } else if lat_collapsed || lon_collapsed {
        // Exactly one axis collapsed: the box is a segment between the two
        // rounded corners.
        format!("LINESTRING({lon_min} {lat_min}, {lon_max} {lat_max})")
    } else {
        format!(
            "POLYGON(({lon_min} {lat_min}, {lon_max} {lat_min}, {lon_max} {lat_max}, {lon_min} {lat_max}, {lon_min} {lat_min}))"
        )
    }
}

/// Render a coordinate rounded to the index's stored precision, with exactly
/// three decimal digits (e.g. `12.340`).
fn format_latlon(value: f64) -> String {
    format!("{value:.3}")
}

/// Render epoch seconds as an ISO-8601 UTC instant.
fn format_time(epoch_seconds: i64) -> String {
    chrono::DateTime::from_timestamp(epoch_seconds, 0)
        .map(|dt| dt.format(ISO_FORMAT).to_string())
        .unwrap_or_else(|| epoch_seconds.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TileAttribute, TileStats, TileVariant};

    fn sample_tile() -> TileSummary {
        TileSummary {
            dataset_name: "AVHRR_OI_L4_GHRSST_NCEI".to_string(),
            tile_id: "d9b5afe3-bd7f-4e8a-a5a9-bc5f6b8e7d01".to_string(),
            section_spec: "time:0:1,lat:0:30,lon:30:60".to_string(),
            data_var_name: "analysed_sst".to_string(),
            granule: "/data/granules/20260101090000-sst.nc".to_string(),
            bbox: BBox {
                lat_min: -10.5,
                lat_max: 5.25,
                lon_min: 100.0,
                lon_max: 120.75,
            },
            stats: TileStats {
                min: 271.5,
                max: 305.0,
                mean: 288.25,
                count: 1800,
                min_time: 1767258000,
                max_time: 1767261600,
            },
            global_attributes: vec![],
            tile: TileVariant::Grid { depth: 0 },
        }
    }

    fn bbox(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> BBox {
        BBox {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        }
    }

    #[test]
    fn test_point_when_both_axes_collapse() {
        let geo = determine_geo(&bbox(20.0, 20.0, 10.0, 10.0));
        assert_eq!(geo, "POINT(10.000 20.000)");
    }

    #[test]
    fn test_linestring_when_lat_collapses() {
        let geo = determine_geo(&bbox(20.0, 20.0, 10.0, 15.0));
        assert_eq!(geo, "LINESTRING(10.000 20.000, 15.000 20.000)");
    }

    #[test]
    fn test_linestring_when_lon_collapses() {
        let geo = determine_geo(&bbox(20.0, 25.0, 10.0, 10.0));
        assert_eq!(geo, "LINESTRING(10.000 20.000, 10.000 25.000)");
    }

    #[test]
    fn test_polygon_closed_ring_corner_order() {
        let geo = determine_geo(&bbox(20.0, 25.0, 10.0, 15.0));
        assert_eq!(
            geo,
            "POLYGON((10.000 20.000, 15.000 20.000, 15.000 25.000, 10.000 25.000, 10.000 20.000))"
        );
    }

    #[test]
    fn test_sub_precision_difference_rounds_to_degenerate_geometry() {
        // 1.0001 and 1.0004 both round to 1.000 at the index's stored
        // precision, so this box is a segment, not a sliver polygon.
        let geo = determine_geo(&bbox(1.0001, 1.0004, 10.0, 15.0));
        assert_eq!(geo, "LINESTRING(10.000 1.000, 15.000 1.000)");
    }

    #[test]
    fn test_latlon_rendered_with_three_decimal_digits() {
        assert_eq!(format_latlon(12.34), "12.340");
        assert_eq!(format_latlon(-0.5), "-0.500");
        assert_eq!(format_latlon(179.99951), "180.000");
    }

    #[test]
    fn test_epoch_zero_formats_as_unix_origin() {
        let mut tile = sample_tile();
        tile.stats.min_time = 0;
        let doc = TileDocumentBuilder::new("sea_surface_temp").build(&tile);
        assert_eq!(doc["tile_min_time_dt"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_fixed_fields() {
        let tile = sample_tile();
        let doc = TileDocumentBuilder::new("sea_surface_temp").build(&tile);

        assert_eq!(doc["table_s"], "sea_surface_temp");
        assert_eq!(doc["id"], "d9b5afe3-bd7f-4e8a-a5a9-bc5f6b8e7d01");
        assert_eq!(
            doc["solr_id_s"],
            "AVHRR_OI_L4_GHRSST_NCEI!d9b5afe3-bd7f-4e8a-a5a9-bc5f6b8e7d01"
        );
        assert_eq!(doc["sectionSpec_s"], "time:0:1,lat:0:30,lon:30:60");
        assert_eq!(doc["dataset_s"], "AVHRR_OI_L4_GHRSST_NCEI");
        assert_eq!(doc["granule_s"], "20260101090000-sst.nc");
        assert_eq!(doc["tile_var_name_s"], "analysed_sst");
        assert_eq!(doc["tile_min_lon"], 100.0);
        assert_eq!(doc["tile_max_lon"], 120.75);
        assert_eq!(doc["tile_min_lat"], -10.5);
        assert_eq!(doc["tile_max_lat"], 5.25);
        assert_eq!(doc["tile_depth"], 0);
        assert_eq!(doc["tile_min_val_d"], 271.5);
        assert_eq!(doc["tile_max_val_d"], 305.0);
        assert_eq!(doc["tile_avg_val_d"], 288.25);
        assert_eq!(doc["tile_count_i"], 1800);
        assert!(!doc.contains_key("ecco_tile"));
    }

    #[test]
    fn test_corner_fields_keep_full_precision() {
        let mut tile = sample_tile();
        tile.bbox.lat_min = -10.123456;
        let doc = TileDocumentBuilder::new("sea_surface_temp").build(&tile);
        // Geometry is rounded, the corner field is not.
        assert_eq!(doc["tile_min_lat"], -10.123456);
    }

    #[test]
    fn test_ecco_tile_present_only_for_ecco_variant() {
        let mut tile = sample_tile();
        tile.tile = TileVariant::Ecco { depth: 2, tile: 7 };
        let doc = TileDocumentBuilder::new("sea_surface_temp").build(&tile);
        assert_eq!(doc["ecco_tile"], 7);
        assert_eq!(doc["tile_depth"], 2);
    }

    #[test]
    fn test_single_value_attribute_becomes_scalar() {
        let mut tile = sample_tile();
        tile.global_attributes = vec![TileAttribute {
            name: "source".to_string(),
            values: vec!["podaac".to_string()],
        }];
        let doc = TileDocumentBuilder::new("sea_surface_temp").build(&tile);
        assert_eq!(doc["source"], "podaac");
    }

    #[test]
    fn test_multi_value_attribute_becomes_ordered_list() {
        let mut tile = sample_tile();
        tile.global_attributes = vec![TileAttribute {
            name: "processing_levels".to_string(),
            values: vec!["L2".to_string(), "L3".to_string(), "L4".to_string()],
        }];
        let doc = TileDocumentBuilder::new("sea_surface_temp").build(&tile);
        assert_eq!(
            doc["processing_levels"],
            serde_json::json!(["L2", "L3", "L4"])
        );
    }

    #[test]
    fn test_duplicate_attribute_last_writer_wins() {
        let mut tile = sample_tile();
        tile.global_attributes = vec![
            TileAttribute {
                name: "source".to_string(),
                values: vec!["first".to_string()],
            },
            TileAttribute {
                name: "source".to_string(),
                values: vec!["second".to_string()],
            },
        ];
        let doc = TileDocumentBuilder::new("sea_surface_temp").build(&tile);
        assert_eq!(doc["source"], "second");
    }
}
