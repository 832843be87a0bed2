//! WFS GetFeature client for the Grand Lyon open-data endpoint.
//!
//! Builds bounded-region queries when a reference point is available,
//! falls back to an unbounded full-table request when the bounded query
//! errors or matches nothing (the upstream spatial index is unreliable),
//! and fans out one request per district for layers split by commune.
//! Raw features are piped through the schema-driven normalizer before
//! they leave this module.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt as _};
use lyon_poi::normalize::normalize_features;
use lyon_poi::{METRO_BOUNDS, registry};
use lyon_poi_models::schema::DomainSchema;
use lyon_poi_models::{Coordinate, Domain, PoiDetails, PointOfInterest};

use crate::{Coverage, FetchError, FetchOutcome, PoiFetcher};

/// Meters per degree of latitude.
const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Coordinates are deduplicated at this precision (6 decimal places is
/// roughly 0.1 m).
const DEDUP_SCALE: f64 = 1e6;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct WfsConfig {
    /// Base WFS endpoint.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Half-size of the bounded query box, in meters.
    pub bounded_radius_m: f64,
    /// Concurrent requests during district fan-out.
    pub fan_out_concurrency: usize,
}

impl Default for WfsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://download.data.grandlyon.com/wfs/grandlyon".to_string(),
            timeout: Duration::from_secs(12),
            bounded_radius_m: 1500.0,
            fan_out_concurrency: 4,
        }
    }
}

/// A rectangular query region, `minLon,minLat,maxLon,maxLat`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    /// Western edge.
    pub min_lon: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Eastern edge.
    pub max_lon: f64,
    /// Northern edge.
    pub max_lat: f64,
}

impl Bbox {
    /// Builds a box of `radius_m` half-size around a center point,
    /// correcting the longitude span for the latitude.
    #[must_use]
    pub fn around(center: &Coordinate, radius_m: f64) -> Self {
        let d_lat = radius_m / METERS_PER_DEGREE_LAT;
        let d_lon = radius_m / (METERS_PER_DEGREE_LAT * center.latitude.to_radians().cos());
        Self {
            min_lon: center.longitude - d_lon,
            min_lat: center.latitude - d_lat,
            max_lon: center.longitude + d_lon,
            max_lat: center.latitude + d_lat,
        }
    }

    /// Renders the `BBOX` query parameter value.
    #[must_use]
    pub fn to_query_value(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// WFS GetFeature query parameters for one request.
fn build_query(layer: &str, bbox: Option<&Bbox>, cql: Option<&str>) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = [
        ("SERVICE", "WFS"),
        ("VERSION", "2.0.0"),
        ("REQUEST", "GetFeature"),
        ("typename", layer),
        ("outputFormat", "application/json; subtype=geojson"),
        ("SRSNAME", "EPSG:4326"),
        ("sortBy", "gid"),
        ("startIndex", "0"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    if let Some(bbox) = bbox {
        params.push(("BBOX".to_string(), bbox.to_query_value()));
    }
    if let Some(cql) = cql {
        params.push(("CQL_FILTER".to_string(), cql.to_string()));
    }
    params
}

/// The production [`PoiFetcher`].
#[derive(Debug)]
pub struct WfsClient {
    client: reqwest::Client,
    base_url: reqwest::Url,
    config: WfsConfig,
}

impl WfsClient {
    /// Builds a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] when the endpoint does not
    /// parse, or [`FetchError::Http`] when the TLS backend fails to
    /// initialize.
    pub fn new(config: WfsConfig) -> Result<Self, FetchError> {
        let base_url = reqwest::Url::parse(&config.base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// One GetFeature request, decoded to the raw features array.
    async fn fetch_layer(
        &self,
        layer: &str,
        bbox: Option<&Bbox>,
        cql: Option<&str>,
    ) -> Result<Vec<serde_json::Value>, FetchError> {
        let params = build_query(layer, bbox, cql);
        let resp = self
            .client
            .get(self.base_url.clone())
            .query(&params)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(FetchError::InvalidResponse {
                status: resp.status().as_u16(),
            });
        }
        let body = resp.text().await?;

        let json: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode {
                message: format!("Failed to parse WFS response: {e}"),
            })?;

        let features = json["features"]
            .as_array()
            .ok_or_else(|| FetchError::Decode {
                message: "No features array in WFS response".to_string(),
            })?;

        Ok(features.clone())
    }

    /// Bounded query around a reference point. An empty result is an
    /// error here so the caller falls back to the unbounded path.
    async fn fetch_bounded(
        &self,
        layer: &str,
        center: &Coordinate,
    ) -> Result<Vec<serde_json::Value>, FetchError> {
        let bbox = Bbox::around(center, self.config.bounded_radius_m);
        let features = self.fetch_layer(layer, Some(&bbox), None).await?;
        if features.is_empty() {
            return Err(FetchError::NoResultsInRegion);
        }
        Ok(features)
    }

    /// One request per district, merged; individual failures are logged
    /// and skipped so partial results stay usable.
    async fn fetch_districts(
        &self,
        schema: &DomainSchema,
        district_field: &str,
    ) -> Result<Vec<serde_json::Value>, FetchError> {
        let results: Vec<(String, Result<Vec<serde_json::Value>, FetchError>)> =
            stream::iter(schema.districts.iter().cloned().map(|district| {
                let cql = format!("{district_field}='{district}'");
                async move {
                    let result = self.fetch_layer(&schema.layer, None, Some(&cql)).await;
                    (district, result)
                }
            }))
            .buffer_unordered(self.config.fan_out_concurrency)
            .collect()
            .await;

        let mut features = Vec::new();
        let mut first_error = None;
        let mut succeeded = 0usize;

        for (district, result) in results {
            match result {
                Ok(mut batch) => {
                    succeeded += 1;
                    features.append(&mut batch);
                }
                Err(e) => {
                    log::warn!("{}: district {district} fetch failed: {e}", schema.layer);
                    first_error.get_or_insert(e);
                }
            }
        }

        if succeeded == 0
            && let Some(e) = first_error
        {
            return Err(e);
        }
        Ok(features)
    }

    /// Fetches one domain, picking the bounded, fan-out, or full path.
    async fn fetch_domain(
        &self,
        schema: &DomainSchema,
        around: Option<Coordinate>,
    ) -> Result<FetchOutcome, FetchError> {
        if let Some(district_field) = schema.district_field.as_deref()
            && !schema.districts.is_empty()
        {
            let features = self.fetch_districts(schema, district_field).await?;
            let records = normalize_features(schema, &features, &METRO_BOUNDS);
            log::info!(
                "{}: {} records from {} districts",
                schema.layer,
                records.len(),
                schema.districts.len()
            );
            return Ok(FetchOutcome {
                records: dedup_by_coordinate(records),
                coverage: Coverage::Full,
            });
        }

        if let Some(center) = around
            && schema.spatial_filter
        {
            match self.fetch_bounded(&schema.layer, &center).await {
                Ok(features) => {
                    let records = normalize_features(schema, &features, &METRO_BOUNDS);
                    log::info!("{}: {} records in bounded region", schema.layer, records.len());
                    return Ok(FetchOutcome {
                        records,
                        coverage: Coverage::Bounded,
                    });
                }
                Err(e) => {
                    log::warn!(
                        "{}: bounded fetch unusable ({e}), falling back to full fetch",
                        schema.layer
                    );
                }
            }
        }

        let features = self.fetch_layer(&schema.layer, None, None).await?;
        let records = normalize_features(schema, &features, &METRO_BOUNDS);
        log::info!("{}: {} records in full fetch", schema.layer, records.len());
        Ok(FetchOutcome {
            records,
            coverage: Coverage::Full,
        })
    }
}

#[async_trait]
impl PoiFetcher for WfsClient {
    async fn fetch(
        &self,
        domain: Domain,
        around: Option<Coordinate>,
    ) -> Result<FetchOutcome, FetchError> {
        let schema = registry::schema_for(domain);
        self.fetch_domain(&schema, around).await
    }
}

/// Merges records whose coordinates round to the same six decimal places.
///
/// Charging-station attributes merge (max power, OR'd free flag, unioned
/// connectors, summed charge points); everything else keeps the first
/// record of the group.
#[must_use]
pub fn dedup_by_coordinate(records: Vec<PointOfInterest>) -> Vec<PointOfInterest> {
    let mut index: HashMap<(i64, i64), usize> = HashMap::new();
    let mut merged: Vec<PointOfInterest> = Vec::with_capacity(records.len());

    for record in records {
        let key = rounded_key(&record.coordinate);
        match index.entry(key) {
            Entry::Occupied(slot) => merge_into(&mut merged[*slot.get()], record),
            Entry::Vacant(slot) => {
                slot.insert(merged.len());
                merged.push(record);
            }
        }
    }
    merged
}

#[allow(clippy::cast_possible_truncation)]
fn rounded_key(coordinate: &Coordinate) -> (i64, i64) {
    (
        (coordinate.latitude * DEDUP_SCALE).round() as i64,
        (coordinate.longitude * DEDUP_SCALE).round() as i64,
    )
}

fn merge_into(primary: &mut PointOfInterest, other: PointOfInterest) {
    if let (
        PoiDetails::ChargingStations {
            power_kw,
            connectors,
            is_free,
            point_count,
        },
        PoiDetails::ChargingStations {
            power_kw: other_power,
            connectors: other_connectors,
            is_free: other_free,
            point_count: other_count,
        },
    ) = (&mut primary.details, other.details)
    {
        *power_kw = match (*power_kw, other_power) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        for connector in other_connectors {
            if !connectors.contains(&connector) {
                connectors.push(connector);
            }
        }
        *is_free = *is_free || other_free;
        *point_count += other_count;
    }
}
