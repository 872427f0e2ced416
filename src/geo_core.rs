use std::fmt;

use geo::Point;
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::error::CollectError;

/// EPSG code of the canonical geographic system used for metadata
/// queries (WGS 84).
pub const WGS84_EPSG: i32 = 4326;

/// A (latitude, longitude) pair in the canonical geographic system.
///
/// Produced by [`WgsTransform::apply`]; a correct transform keeps
/// latitude in [-90, 90] and longitude in [-180, 180].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeographicCoordinate {
    pub lat: f64,
    pub lon: f64,
}

impl GeographicCoordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        GeographicCoordinate { lat, lon }
    }

    /// True when both components are inside canonical bounds.
    pub fn in_bounds(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Renders as `lat,lon`, the location key format of the metadata
/// service.
impl fmt::Display for GeographicCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

/// Look up the PROJ4 definition string for an EPSG code.
fn proj_string(epsg: i32) -> Option<&'static str> {
    u16::try_from(epsg)
        .ok()
        .and_then(crs_definitions::from_code)
        .map(|def| def.proj4)
}

/// True when the EPSG code denotes a geographic (lon/lat) system.
/// proj4rs expects geographic coordinates in radians, so callers must
/// know which side of a transform needs the conversion.
fn is_geographic(epsg: i32) -> bool {
    match proj_string(epsg) {
        Some(def) => def.contains("+proj=longlat"),
        None => epsg == WGS84_EPSG,
    }
}

fn resolve_proj(epsg: i32) -> Result<Proj, CollectError> {
    let def = proj_string(epsg).ok_or_else(|| {
        CollectError::Configuration(format!(
            "EPSG:{} is not in the crs-definitions database",
            epsg
        ))
    })?;
    Proj::from_proj_string(def).map_err(|e| {
        CollectError::Configuration(format!("invalid projection for EPSG:{}: {:?}", epsg, e))
    })
}

fn convert(
    source: &Proj,
    target: &Proj,
    source_geographic: bool,
    target_geographic: bool,
    x: f64,
    y: f64,
) -> Result<(f64, f64), CollectError> {
    let (x_in, y_in) = if source_geographic {
        (x.to_radians(), y.to_radians())
    } else {
        (x, y)
    };

    let mut point = (x_in, y_in, 0.0);
    transform(source, target, &mut point)
        .map_err(|e| CollectError::Configuration(format!("coordinate transform failed: {:?}", e)))?;

    if target_geographic {
        Ok((point.0.to_degrees(), point.1.to_degrees()))
    } else {
        Ok((point.0, point.1))
    }
}

/// Transform coordinates from one EPSG code to another.
///
/// Axis order is x=easting/longitude, y=northing/latitude on both
/// sides, regardless of the authority's axis conventions.
pub fn transform_coords(
    from_epsg: i32,
    to_epsg: i32,
    x: f64,
    y: f64,
) -> Result<(f64, f64), CollectError> {
    if from_epsg == to_epsg {
        return Ok((x, y));
    }
    let source = resolve_proj(from_epsg)?;
    let target = resolve_proj(to_epsg)?;
    convert(
        &source,
        &target,
        is_geographic(from_epsg),
        is_geographic(to_epsg),
        x,
        y,
    )
}

/// One-way transform from a native reference system into WGS 84.
///
/// Resolving the source system can fail with
/// [`CollectError::Configuration`] when the EPSG code is unknown; the
/// transform itself is applied per point with no state carried across
/// points.
#[derive(Debug)]
pub struct WgsTransform {
    source_epsg: i32,
    source: Proj,
    target: Proj,
    source_is_geographic: bool,
}

impl WgsTransform {
    pub fn new(source_epsg: i32) -> Result<Self, CollectError> {
        let source = resolve_proj(source_epsg)?;
        let target = resolve_proj(WGS84_EPSG)?;
        Ok(WgsTransform {
            source_epsg,
            source,
            target,
            source_is_geographic: is_geographic(source_epsg),
        })
    }

    /// Convert one native point, x=longitude/easting and
    /// y=latitude/northing, into a [`GeographicCoordinate`].
    /// Floating-point precision is retained; nothing is rounded here.
    pub fn apply(&self, point: &Point<f64>) -> Result<GeographicCoordinate, CollectError> {
        // Already in the canonical system: pass coordinates through
        // untouched instead of round-tripping them through radians.
        if self.source_epsg == WGS84_EPSG {
            return Ok(GeographicCoordinate::new(point.y(), point.x()));
        }
        let (lon, lat) = convert(
            &self.source,
            &self.target,
            self.source_is_geographic,
            true,
            point.x(),
            point.y(),
        )?;
        Ok(GeographicCoordinate::new(lat, lon))
    }
}
