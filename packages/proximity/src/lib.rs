#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Proximity math over normalized POI records.
//!
//! [`rank`] orders a collection by great-circle distance from a reference
//! point; [`cluster`] merges co-located markers for map display with a
//! zoom-adaptive threshold and a debounced memo. Everything here is pure
//! synchronous computation — fetching and caching live elsewhere.

pub mod cluster;
pub mod rank;

use lyon_poi_models::Coordinate;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle (haversine) distance in meters between two coordinates.
#[must_use]
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}
