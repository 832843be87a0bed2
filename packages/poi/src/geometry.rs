//! Canonical coordinate extraction from raw GeoJSON geometries.
//!
//! Point layers map directly; polygon layers (parks) are reduced to the
//! arithmetic-mean centroid of the outer ring of their first polygon; line
//! layers (hiking loops) keep the full ordered vertex sequence alongside a
//! derived centroid for camera framing.
//!
//! Extraction failures are per-feature and non-fatal: the normalizer drops
//! the offending feature and keeps processing the batch.

use geojson::Geometry;
use lyon_poi_models::{Bounds, Coordinate};
use thiserror::Error;

/// Errors from extracting a coordinate out of one feature's geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The feature has no geometry member, or it is `null`.
    #[error("feature has no geometry")]
    Missing,

    /// The geometry JSON does not parse as GeoJSON.
    #[error("malformed geometry: {message}")]
    Malformed {
        /// Description of the parse failure.
        message: String,
    },

    /// A geometry type this system has no use for (e.g. `MultiPoint`).
    #[error("unsupported geometry type: {0}")]
    Unsupported(String),

    /// A position with fewer than two numeric components.
    #[error("position has fewer than two components")]
    TooFewCoordinates,

    /// A point coordinate outside the WGS84 envelope.
    #[error("coordinate outside the WGS84 range")]
    OutOfRange,

    /// No vertex survived sanity filtering, so no centroid exists.
    #[error("no valid vertices to derive a centroid from")]
    NoValidVertices,
}

/// A geometry reduced to its canonical coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedGeometry {
    /// The point itself, or the derived centroid for polygons and lines.
    pub coordinate: Coordinate,
    /// Full ordered vertex sequence, present only for line geometries.
    pub path: Option<Vec<Coordinate>>,
}

/// Extracts the canonical coordinate (and polyline, for line layers) from
/// one raw GeoJSON geometry value.
///
/// Polygon centroids skip vertices outside `envelope` so that stray
/// out-of-region coordinates cannot drag the mean off the map.
///
/// # Errors
///
/// Returns [`GeometryError`] when the geometry is absent, malformed, of an
/// unsupported type, or yields no valid coordinate.
pub fn extract_geometry(
    geometry: &serde_json::Value,
    envelope: &Bounds,
) -> Result<ExtractedGeometry, GeometryError> {
    if geometry.is_null() {
        return Err(GeometryError::Missing);
    }

    let parsed: Geometry =
        serde_json::from_value(geometry.clone()).map_err(|e| GeometryError::Malformed {
            message: e.to_string(),
        })?;

    match parsed.value {
        geojson::Value::Point(position) => {
            let coordinate = position_to_coordinate(&position)?;
            Ok(ExtractedGeometry {
                coordinate,
                path: None,
            })
        }
        geojson::Value::Polygon(rings) => polygon_centroid(&rings, envelope),
        geojson::Value::MultiPolygon(polygons) => {
            let rings = polygons.first().ok_or(GeometryError::NoValidVertices)?;
            polygon_centroid(rings, envelope)
        }
        geojson::Value::LineString(positions) => line_geometry(&[positions]),
        geojson::Value::MultiLineString(lines) => line_geometry(&lines),
        other => Err(GeometryError::Unsupported(other.type_name().to_string())),
    }
}

/// Converts a raw `[lon, lat, ...]` position into a validated coordinate.
fn position_to_coordinate(position: &[f64]) -> Result<Coordinate, GeometryError> {
    if position.len() < 2 {
        return Err(GeometryError::TooFewCoordinates);
    }
    let coordinate = Coordinate::new(position[1], position[0]);
    if coordinate.is_valid_wgs84() {
        Ok(coordinate)
    } else {
        Err(GeometryError::OutOfRange)
    }
}

/// Arithmetic-mean centroid of the outer ring of a polygon.
///
/// Vertices outside the sanity envelope are excluded from the mean. Closed
/// rings repeat the first vertex as the last; the duplicate is dropped so
/// it does not skew the mean.
fn polygon_centroid(
    rings: &[Vec<Vec<f64>>],
    envelope: &Bounds,
) -> Result<ExtractedGeometry, GeometryError> {
    let outer = rings.first().ok_or(GeometryError::NoValidVertices)?;

    let mut ring: &[Vec<f64>] = outer;
    if ring.len() > 1 && ring.first() == ring.last() {
        ring = &ring[..ring.len() - 1];
    }

    let vertices: Vec<Coordinate> = ring
        .iter()
        .filter_map(|position| position_to_coordinate(position).ok())
        .filter(|coordinate| envelope.contains(coordinate))
        .collect();

    let coordinate = mean_coordinate(&vertices).ok_or(GeometryError::NoValidVertices)?;
    Ok(ExtractedGeometry {
        coordinate,
        path: None,
    })
}

/// Full vertex sequence of one or more line strings plus a mean centroid.
fn line_geometry(lines: &[Vec<Vec<f64>>]) -> Result<ExtractedGeometry, GeometryError> {
    let vertices: Vec<Coordinate> = lines
        .iter()
        .flatten()
        .filter_map(|position| position_to_coordinate(position).ok())
        .collect();

    let coordinate = mean_coordinate(&vertices).ok_or(GeometryError::NoValidVertices)?;
    Ok(ExtractedGeometry {
        coordinate,
        path: Some(vertices),
    })
}

/// Arithmetic mean of a coordinate set; `None` when empty.
fn mean_coordinate(coordinates: &[Coordinate]) -> Option<Coordinate> {
    if coordinates.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let count = coordinates.len() as f64;
    let (lat_sum, lon_sum) = coordinates.iter().fold((0.0, 0.0), |acc, c| {
        (acc.0 + c.latitude, acc.1 + c.longitude)
    });
    Some(Coordinate::new(lat_sum / count, lon_sum / count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::METRO_BOUNDS;

    #[test]
    fn extracts_point() {
        let geometry = serde_json::json!({
            "type": "Point",
            "coordinates": [4.8357, 45.7640]
        });
        let extracted = extract_geometry(&geometry, &METRO_BOUNDS).unwrap();
        assert!((extracted.coordinate.latitude - 45.7640).abs() < 1e-9);
        assert!((extracted.coordinate.longitude - 4.8357).abs() < 1e-9);
        assert!(extracted.path.is_none());
    }

    #[test]
    fn rejects_short_point() {
        let geometry = serde_json::json!({
            "type": "Point",
            "coordinates": [4.8357]
        });
        // geojson itself refuses a one-component position
        assert!(matches!(
            extract_geometry(&geometry, &METRO_BOUNDS),
            Err(GeometryError::Malformed { .. } | GeometryError::TooFewCoordinates)
        ));
    }

    #[test]
    fn rejects_out_of_range_point() {
        let geometry = serde_json::json!({
            "type": "Point",
            "coordinates": [4.8357, 245.0]
        });
        assert!(matches!(
            extract_geometry(&geometry, &METRO_BOUNDS),
            Err(GeometryError::OutOfRange)
        ));
    }

    #[test]
    fn multipolygon_centroid_means_the_outer_ring() {
        let geometry = serde_json::json!({
            "type": "MultiPolygon",
            "coordinates": [[[
                [4.83, 45.76],
                [4.84, 45.76],
                [4.84, 45.77],
                [4.83, 45.77],
                [4.83, 45.76]
            ]]]
        });
        let extracted = extract_geometry(&geometry, &METRO_BOUNDS).unwrap();
        assert!((extracted.coordinate.latitude - 45.765).abs() < 1e-9);
        assert!((extracted.coordinate.longitude - 4.835).abs() < 1e-9);
    }

    #[test]
    fn centroid_skips_vertices_outside_the_envelope() {
        // One stray vertex far outside Lyon must not drag the mean.
        let geometry = serde_json::json!({
            "type": "Polygon",
            "coordinates": [[
                [4.83, 45.76],
                [4.85, 45.76],
                [2.35, 48.85]
            ]]
        });
        let extracted = extract_geometry(&geometry, &METRO_BOUNDS).unwrap();
        assert!((extracted.coordinate.latitude - 45.76).abs() < 1e-9);
        assert!((extracted.coordinate.longitude - 4.84).abs() < 1e-9);
    }

    #[test]
    fn all_vertices_outside_envelope_is_an_error() {
        let geometry = serde_json::json!({
            "type": "Polygon",
            "coordinates": [[
                [2.35, 48.85],
                [2.36, 48.85],
                [2.36, 48.86]
            ]]
        });
        assert!(matches!(
            extract_geometry(&geometry, &METRO_BOUNDS),
            Err(GeometryError::NoValidVertices)
        ));
    }

    #[test]
    fn linestring_keeps_the_full_path() {
        let geometry = serde_json::json!({
            "type": "LineString",
            "coordinates": [
                [4.80, 45.70],
                [4.82, 45.72],
                [4.84, 45.74]
            ]
        });
        let extracted = extract_geometry(&geometry, &METRO_BOUNDS).unwrap();
        let path = extracted.path.unwrap();
        assert_eq!(path.len(), 3);
        assert!((extracted.coordinate.latitude - 45.72).abs() < 1e-9);
        assert!((extracted.coordinate.longitude - 4.82).abs() < 1e-9);
    }

    #[test]
    fn multilinestring_concatenates_segments_in_order() {
        let geometry = serde_json::json!({
            "type": "MultiLineString",
            "coordinates": [
                [[4.80, 45.70], [4.82, 45.72]],
                [[4.84, 45.74], [4.86, 45.76]]
            ]
        });
        let extracted = extract_geometry(&geometry, &METRO_BOUNDS).unwrap();
        let path = extracted.path.unwrap();
        assert_eq!(path.len(), 4);
        assert!((path[3].longitude - 4.86).abs() < 1e-9);
    }

    #[test]
    fn null_geometry_is_missing() {
        assert!(matches!(
            extract_geometry(&serde_json::Value::Null, &METRO_BOUNDS),
            Err(GeometryError::Missing)
        ));
    }

    #[test]
    fn multipoint_is_unsupported() {
        let geometry = serde_json::json!({
            "type": "MultiPoint",
            "coordinates": [[4.83, 45.76]]
        });
        assert!(matches!(
            extract_geometry(&geometry, &METRO_BOUNDS),
            Err(GeometryError::Unsupported(_))
        ));
    }
}
