#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! GeoJSON feature normalization for Lyon open-data POI layers.
//!
//! Turns raw WFS `FeatureCollection` features into canonical
//! [`PointOfInterest`](lyon_poi_models::PointOfInterest) records. Geometry
//! handling (points, polygon centroids, hiking-loop polylines) lives in
//! [`geometry`]; field mapping is driven by per-domain TOML schemas
//! embedded at compile time, following the same registry pattern as the
//! schema files themselves.

pub mod geometry;
pub mod normalize;
pub mod registry;

use lyon_poi_models::Bounds;

/// Sanity envelope for extracted geometry — a generous box around the
/// Lyon metropolitan area. Polygon vertices outside it are excluded from
/// centroid computation (some layers carry stray projected coordinates).
pub const METRO_BOUNDS: Bounds = Bounds {
    min_lat: 45.4,
    max_lat: 46.1,
    min_lon: 4.2,
    max_lon: 5.4,
};
