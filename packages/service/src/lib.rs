#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Cached geo-proximity data service for Lyon open-data POI layers.
//!
//! [`PoiService`] is the front door: it answers proximity queries from a
//! two-tier in-memory cache ([`cache`]) and delegates misses to a
//! [`PoiFetcher`] — in production the WFS client in [`wfs`], in tests a
//! fake. Concurrent misses for the same domain and zone coalesce onto one
//! in-flight request, so a burst of queries costs one fetch.

pub mod cache;
pub mod service;
pub mod wfs;

use async_trait::async_trait;
use lyon_poi_models::{Coordinate, Domain, PointOfInterest};
use thiserror::Error;

pub use service::{PoiService, ServiceConfig};
pub use wfs::{WfsClient, WfsConfig};

/// Errors from fetching a POI collection.
///
/// The enum is `Clone` (messages rather than source errors) so results can
/// be shared between coalesced callers of the same in-flight fetch.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The configured endpoint is not a valid URL.
    #[error("Invalid WFS URL: {0}")]
    InvalidUrl(String),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {message}")]
    Http {
        /// Description of the transport failure.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("Unexpected response status: {status}")]
    InvalidResponse {
        /// HTTP status code.
        status: u16,
    },

    /// The response body is not a usable GeoJSON envelope.
    #[error("Malformed WFS response: {message}")]
    Decode {
        /// Description of the decode failure.
        message: String,
    },

    /// The request exceeded the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// A bounded query matched nothing. Internal fallback signal — the
    /// orchestrator retries unbounded and never surfaces this to callers.
    #[error("No features in the requested region")]
    NoResultsInRegion,
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Http {
                message: e.to_string(),
            }
        }
    }
}

/// How much of the dataset a fetch covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// The whole layer — eligible for the global cache.
    Full,
    /// A bounding-box region around a reference point — zone cache only.
    Bounded,
}

/// The result of one fetch: normalized records plus their coverage.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Normalized, deduplicated records.
    pub records: Vec<PointOfInterest>,
    /// Whether the records cover the full layer or a bounded region.
    pub coverage: Coverage,
}

/// The seam between the cache layer and the upstream data source.
///
/// Production uses [`WfsClient`]; tests substitute counting or failing
/// fakes.
#[async_trait]
pub trait PoiFetcher: Send + Sync {
    /// Fetches and normalizes one domain, bounded around `around` when
    /// given and supported by the layer.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the upstream request or decode fails.
    async fn fetch(
        &self,
        domain: Domain,
        around: Option<Coordinate>,
    ) -> Result<FetchOutcome, FetchError>;
}
