use std::path::Path;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use geo::Point;
use geojson::{GeoJson, JsonObject, Value};
use serde_json::Value as JsonValue;

use crate::error::CollectError;
use crate::geo_core::WGS84_EPSG;

/// One sample site: a point geometry in its native reference system
/// and its index position within the source dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub index: usize,
    pub geometry: Point<f64>,
    pub epsg: i32,
}

/// Capability yielding sample points by index.
///
/// The total count is known up front so the collector can partition
/// the dataset into batch ranges before any point is read.
pub trait PointSource {
    /// Number of points in the dataset.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample point at `index`, in the dataset's native reference
    /// system.
    fn sample(&self, index: usize) -> Result<SamplePoint, CollectError>;
}

/// Materialized point dataset with a single native reference system.
#[derive(Debug)]
pub struct SamplePoints {
    points: Vec<Point<f64>>,
    epsg: i32,
}

impl SamplePoints {
    /// Assemble a source from already-loaded geometries, e.g. a grid
    /// generated programmatically.
    pub fn from_points(points: Vec<Point<f64>>, epsg: i32) -> Self {
        SamplePoints { points, epsg }
    }

    /// Parse a GeoJSON FeatureCollection of point features.
    ///
    /// The native reference system comes from the legacy `crs` member;
    /// a document without one is WGS 84 by definition (RFC 7946).
    /// Every feature must carry a point geometry so that index
    /// positions stay aligned with the dataset.
    pub fn from_geojson_str(data: &str) -> Result<Self, CollectError> {
        let geojson: GeoJson = data.parse().map_err(|e| {
            CollectError::Configuration(format!("failed to parse GeoJSON dataset: {}", e))
        })?;

        let fc = match geojson {
            GeoJson::FeatureCollection(fc) => fc,
            _ => {
                return Err(CollectError::Configuration(
                    "sample dataset must be a GeoJSON FeatureCollection".to_string(),
                ))
            }
        };

        let epsg = resolve_epsg(fc.foreign_members.as_ref())?;

        let mut points = Vec::with_capacity(fc.features.len());
        for (index, feature) in fc.features.iter().enumerate() {
            let geometry = feature.geometry.as_ref().ok_or_else(|| {
                CollectError::Configuration(format!("feature {} has no geometry", index))
            })?;
            match &geometry.value {
                Value::Point(position) if position.len() >= 2 => {
                    points.push(Point::new(position[0], position[1]));
                }
                _ => {
                    return Err(CollectError::Configuration(format!(
                        "feature {} is not a point geometry",
                        index
                    )))
                }
            }
        }

        Ok(SamplePoints { points, epsg })
    }

    /// Read and parse a GeoJSON file.
    pub fn from_geojson_file(path: impl AsRef<Path>) -> Result<Self, CollectError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            CollectError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_geojson_str(&data)
    }

    /// Load a point shapefile by converting it to GeoJSON with the
    /// `ogr2ogr` command-line tool.
    ///
    /// The conversion preserves the native reference system as a `crs`
    /// member, so a missing `.prj` sidecar fails up front instead of
    /// silently defaulting.
    pub fn from_shapefile(path: impl AsRef<Path>) -> Result<Self, CollectError> {
        let path = path.as_ref();

        let prj = path.with_extension("prj");
        if !prj.exists() {
            return Err(CollectError::Configuration(format!(
                "{} has no .prj sidecar, native reference system unknown",
                path.display()
            )));
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let temp_geojson =
            std::env::temp_dir().join(format!("sample_points_{}.geojson", timestamp));

        let status = Command::new("ogr2ogr")
            .arg("-f")
            .arg("GeoJSON")
            .arg(&temp_geojson)
            .arg(path)
            .status()
            .map_err(|e| {
                CollectError::Configuration(format!(
                    "failed to execute ogr2ogr (is GDAL installed and on PATH?): {}",
                    e
                ))
            })?;
        if !status.success() {
            let _ = std::fs::remove_file(&temp_geojson);
            return Err(CollectError::Configuration(format!(
                "ogr2ogr failed to convert {}",
                path.display()
            )));
        }

        let result = Self::from_geojson_file(&temp_geojson);
        let _ = std::fs::remove_file(&temp_geojson);
        result
    }

    /// EPSG code of the native reference system.
    pub fn epsg(&self) -> i32 {
        self.epsg
    }
}

impl PointSource for SamplePoints {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn sample(&self, index: usize) -> Result<SamplePoint, CollectError> {
        let geometry = self.points.get(index).copied().ok_or_else(|| {
            CollectError::Configuration(format!(
                "point index {} out of range (dataset has {} points)",
                index,
                self.points.len()
            ))
        })?;
        Ok(SamplePoint {
            index,
            geometry,
            epsg: self.epsg,
        })
    }
}

/// Resolve the EPSG code from a FeatureCollection's legacy `crs`
/// member, or default to WGS 84 when the member is absent.
fn resolve_epsg(foreign_members: Option<&JsonObject>) -> Result<i32, CollectError> {
    let crs = match foreign_members.and_then(|members| members.get("crs")) {
        Some(value) => value,
        None => return Ok(WGS84_EPSG),
    };
    crs_code(crs).ok_or_else(|| {
        CollectError::Configuration(format!("unsupported crs member in GeoJSON: {}", crs))
    })
}

/// Extract an EPSG code from the `name` or `code` forms of the legacy
/// crs object.
fn crs_code(crs: &JsonValue) -> Option<i32> {
    if let Some(name) = crs
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(|v| v.as_str())
    {
        // urn:ogc:def:crs:OGC:1.3:CRS84 is WGS 84 in lon/lat order.
        if name.ends_with("CRS84") {
            return Some(WGS84_EPSG);
        }
        // "EPSG:2154" and "urn:ogc:def:crs:EPSG::2154" both end in the
        // numeric code.
        if let Some(code) = name.rsplit(':').next().and_then(|tail| tail.parse().ok()) {
            return Some(code);
        }
    }
    if let Some(code) = crs
        .get("properties")
        .and_then(|p| p.get("code"))
        .and_then(|v| v.as_i64())
    {
        // EPSG codes fit in an i32; anything larger fails resolution
        // instead of wrapping onto a valid code.
        return i32::try_from(code).ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CAMBRIDGE_POINTS: &str = r#"{
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::26986" } },
        "features": [
            { "type": "Feature", "properties": null,
              "geometry": { "type": "Point", "coordinates": [231000.0, 902000.0] } },
            { "type": "Feature", "properties": null,
              "geometry": { "type": "Point", "coordinates": [231020.0, 902000.0] } }
        ]
    }"#;

    #[test]
    fn test_from_points() {
        let source = SamplePoints::from_points(vec![Point::new(-71.1, 42.36)], 4326);
        assert_eq!(source.len(), 1);
        let sample = source.sample(0).unwrap();
        assert_eq!(sample.index, 0);
        assert_eq!(sample.epsg, 4326);
        assert_eq!(sample.geometry.x(), -71.1);
        assert_eq!(sample.geometry.y(), 42.36);
    }

    #[test]
    fn test_from_geojson_with_urn_crs() {
        let source = SamplePoints::from_geojson_str(CAMBRIDGE_POINTS).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.epsg(), 26986);
        let sample = source.sample(1).unwrap();
        assert_eq!(sample.index, 1);
        assert_eq!(sample.geometry.x(), 231020.0);
    }

    #[test]
    fn test_missing_crs_defaults_to_wgs84() {
        let data = r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": null,
                  "geometry": { "type": "Point", "coordinates": [-71.1, 42.36] } }
            ]
        }"#;
        let source = SamplePoints::from_geojson_str(data).unwrap();
        assert_eq!(source.epsg(), WGS84_EPSG);
    }

    #[test]
    fn test_crs_name_and_code_forms() {
        let name_form: JsonValue = serde_json::json!({
            "type": "name", "properties": { "name": "EPSG:2154" }
        });
        assert_eq!(crs_code(&name_form), Some(2154));

        let code_form: JsonValue = serde_json::json!({
            "type": "EPSG", "properties": { "code": 4326 }
        });
        assert_eq!(crs_code(&code_form), Some(4326));

        let crs84: JsonValue = serde_json::json!({
            "type": "name", "properties": { "name": "urn:ogc:def:crs:OGC:1.3:CRS84" }
        });
        assert_eq!(crs_code(&crs84), Some(WGS84_EPSG));
    }

    #[test]
    fn test_out_of_range_crs_code_fails() {
        // 4326 + 2^32: a wrapping cast would read this as WGS 84.
        let wrapped: JsonValue = serde_json::json!({
            "type": "EPSG", "properties": { "code": 4_294_971_622_i64 }
        });
        assert_eq!(crs_code(&wrapped), None);

        let data = r#"{
            "type": "FeatureCollection",
            "crs": { "type": "EPSG", "properties": { "code": 4294971622 } },
            "features": []
        }"#;
        let err = SamplePoints::from_geojson_str(data).unwrap_err();
        assert!(matches!(err, CollectError::Configuration(_)));
    }

    #[test]
    fn test_unsupported_crs_member_fails() {
        let data = r#"{
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "not-a-code" } },
            "features": []
        }"#;
        let err = SamplePoints::from_geojson_str(data).unwrap_err();
        assert!(matches!(err, CollectError::Configuration(_)));
    }

    #[test]
    fn test_non_feature_collection_fails() {
        let data = r#"{ "type": "Feature", "properties": null,
            "geometry": { "type": "Point", "coordinates": [0.0, 0.0] } }"#;
        let err = SamplePoints::from_geojson_str(data).unwrap_err();
        assert!(matches!(err, CollectError::Configuration(_)));
    }

    #[test]
    fn test_non_point_geometry_fails() {
        let data = r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": null,
                  "geometry": { "type": "LineString",
                                "coordinates": [[0.0, 0.0], [1.0, 1.0]] } }
            ]
        }"#;
        let err = SamplePoints::from_geojson_str(data).unwrap_err();
        assert!(matches!(err, CollectError::Configuration(_)));
    }

    #[test]
    fn test_sample_out_of_range() {
        let source = SamplePoints::from_points(vec![], 4326);
        assert!(source.is_empty());
        assert!(source.sample(0).is_err());
    }

    #[test]
    fn test_from_geojson_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CAMBRIDGE_POINTS.as_bytes()).unwrap();
        let source = SamplePoints::from_geojson_file(file.path()).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.epsg(), 26986);
    }
}
