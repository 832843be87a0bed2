#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Point-of-interest taxonomy and record types.
//!
//! This crate defines the canonical POI record produced by the normalizer,
//! the domain taxonomy shared across the whole lyon-poi system, and the
//! TOML schema types that drive per-domain normalization. All open-data
//! layers are normalized into these shared types.

pub mod schema;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude, in [-90, 90].
    pub latitude: f64,
    /// Longitude, in [-180, 180].
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate without range validation.
    ///
    /// Boundary code (geometry extraction) is responsible for rejecting
    /// out-of-range values before a coordinate enters a [`PointOfInterest`].
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns `true` if both components are within the WGS84 envelope.
    #[must_use]
    pub fn is_valid_wgs84(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A rectangular lat/lon region, used as a sanity envelope for geometry
/// extraction and for bounded spatial queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lon: f64,
    /// Eastern edge.
    pub max_lon: f64,
}

impl Bounds {
    /// Returns `true` if the coordinate lies inside the region (edges
    /// inclusive).
    #[must_use]
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&coordinate.latitude)
            && (self.min_lon..=self.max_lon).contains(&coordinate.longitude)
    }
}

/// The eight open-data POI domains served by the system.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Domain {
    /// Public toilets.
    Toilets,
    /// Public benches.
    Benches,
    /// Drinking fountains.
    DrinkingFountains,
    /// Parks and gardens.
    Parks,
    /// Neighborhood compost bins.
    CompostBins,
    /// Glass-recycling silos.
    GlassSilos,
    /// EV charging stations.
    ChargingStations,
    /// Marked hiking loops.
    HikingLoops,
}

impl Domain {
    /// All domains, in registry order.
    pub const ALL: &[Self] = &[
        Self::Toilets,
        Self::Benches,
        Self::DrinkingFountains,
        Self::Parks,
        Self::CompostBins,
        Self::GlassSilos,
        Self::ChargingStations,
        Self::HikingLoops,
    ];
}

/// A normalized point of interest.
///
/// Produced by the normalizer from one raw GeoJSON feature; the coordinate
/// is always present and inside the WGS84 envelope (features failing
/// geometry extraction are dropped, never kept with null coordinates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    /// Stable unique identifier (source feature id, or generated).
    pub id: String,
    /// Which open-data domain this record belongs to.
    pub domain: Domain,
    /// Representative coordinate (the point itself, or a centroid).
    pub coordinate: Coordinate,
    /// Human-readable label, never empty (placeholder when absent).
    pub display_name: String,
    /// Assembled postal address, never empty (placeholder when absent).
    pub address: String,
    /// Domain-specific attributes.
    pub details: PoiDetails,
}

/// Domain-specific POI attributes.
///
/// Boolean flags are conservative: absence of an explicit affirmative value
/// in the source means `false`. Numeric fields stay `None` when the source
/// is silent — zero is a real value, not a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PoiDetails {
    /// Public toilet.
    Toilets {
        /// Wheelchair accessible.
        accessible: bool,
    },
    /// Public bench.
    Benches {
        /// Located under tree cover or another shade structure.
        shaded: bool,
    },
    /// Drinking fountain.
    DrinkingFountains {
        /// Currently in service.
        in_service: bool,
    },
    /// Park or garden.
    Parks {
        /// Total surface in square meters, when published.
        area_sq_m: Option<f64>,
        /// Dogs allowed (typically on a leash).
        dogs_allowed: bool,
    },
    /// Neighborhood compost bin.
    CompostBins {
        /// Currently in service.
        in_service: bool,
    },
    /// Glass-recycling silo.
    GlassSilos {
        /// Reachable by people with reduced mobility.
        accessible: bool,
    },
    /// EV charging station.
    ChargingStations {
        /// Maximum charging power in kW, when published.
        power_kw: Option<f64>,
        /// Connector types offered (e.g. `"T2"`, `"EF"`).
        connectors: Vec<String>,
        /// Free to use.
        is_free: bool,
        /// Number of charge points at the station.
        point_count: u32,
    },
    /// Marked hiking loop.
    HikingLoops {
        /// Full ordered vertex sequence of the loop, for camera framing
        /// and polyline rendering.
        path: Vec<Coordinate>,
        /// Loop length in kilometers, when published.
        length_km: Option<f64>,
        /// Free-text difficulty rating, when published.
        difficulty: Option<String>,
    },
}

/// A group of co-located POIs merged for map display.
///
/// A cluster with exactly one member behaves identically to an unclustered
/// POI at the presentation boundary. Clusters are recomputed, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Stable identifier — the first member's id for a given input order.
    pub id: String,
    /// Arithmetic mean of the member coordinates.
    pub centroid: Coordinate,
    /// Member POIs; never empty.
    pub members: Vec<PointOfInterest>,
}
