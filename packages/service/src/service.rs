//! The cached service front over a [`PoiFetcher`].
//!
//! One `PoiService` owns the process-wide cache state. All reads and
//! writes happen under a single async mutex held only between suspension
//! points, so cache reads in a call happen-before any write the same call
//! triggers. Concurrent misses for the same domain and zone coalesce onto
//! one shared in-flight future instead of issuing duplicate requests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt as _;
use futures::future::{BoxFuture, Shared};
use lyon_poi_models::{Coordinate, Domain, PointOfInterest};
use lyon_proximity::rank::{RankedPoi, rank};
use tokio::sync::Mutex;

use crate::cache::{CacheConfig, PoiCache, ZoneKey};
use crate::{Coverage, FetchError, FetchOutcome, PoiFetcher};

/// Service tuning.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Radius used to filter cached datasets around a reference point, in
    /// meters. Matches the bounded-fetch radius so cache hits and fresh
    /// fetches answer the same question.
    pub query_radius_m: f64,
    /// Cache expiry and quantization tuning.
    pub cache: CacheConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            query_radius_m: 1500.0,
            cache: CacheConfig::default(),
        }
    }
}

/// A fetch future shared between coalesced callers.
type SharedFetch = Shared<BoxFuture<'static, Result<FetchOutcome, FetchError>>>;

/// In-flight fetches are keyed by domain plus the query's zone, so
/// identical queries join one flight while a moved reference point starts
/// its own (and later writes its own, newer zone entry).
type FlightKey = (Domain, Option<ZoneKey>);

struct ServiceState {
    cache: PoiCache,
    /// In-flight futures tagged with a unique id, so a completer only
    /// evicts its own flight and never a successor under the same key.
    in_flight: HashMap<FlightKey, (u64, SharedFetch)>,
    next_flight_id: u64,
}

/// The cached geo-proximity service.
pub struct PoiService {
    fetcher: Arc<dyn PoiFetcher>,
    query_radius_m: f64,
    state: Mutex<ServiceState>,
}

impl PoiService {
    /// Creates a service with an empty cache.
    #[must_use]
    pub fn new(fetcher: Arc<dyn PoiFetcher>, config: ServiceConfig) -> Self {
        Self {
            fetcher,
            query_radius_m: config.query_radius_m,
            state: Mutex::new(ServiceState {
                cache: PoiCache::new(config.cache),
                in_flight: HashMap::new(),
                next_flight_id: 0,
            }),
        }
    }

    /// Returns the records for `domain`, served from cache when possible.
    ///
    /// With a reference point, the result is filtered to the configured
    /// query radius around it; without one, the full dataset comes back.
    /// A fetch failure surfaces as-is and leaves existing cache entries
    /// untouched, so stale data stays servable for later calls.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when both cache tiers miss and the fetch
    /// fails.
    pub async fn get_or_fetch(
        &self,
        domain: Domain,
        reference: Option<Coordinate>,
    ) -> Result<Vec<PointOfInterest>, FetchError> {
        let started = Instant::now();

        let (flight, flight_id, flight_key, is_owner) = {
            let mut state = self.state.lock().await;

            if let Some(records) = state.cache.lookup(domain, reference.as_ref()) {
                return Ok(self.filter_around(records.to_vec(), reference));
            }

            let flight_key = (
                domain,
                reference
                    .as_ref()
                    .map(|c| ZoneKey::quantize(c, state.cache.config().zone_cell_deg)),
            );

            if let Some((id, existing)) = state.in_flight.get(&flight_key) {
                log::debug!("Joining in-flight fetch for {domain}");
                (existing.clone(), *id, flight_key, false)
            } else {
                let fetcher = Arc::clone(&self.fetcher);
                let flight = async move { fetcher.fetch(domain, reference).await }
                    .boxed()
                    .shared();
                let id = state.next_flight_id;
                state.next_flight_id += 1;
                state.in_flight.insert(flight_key, (id, flight.clone()));
                (flight, id, flight_key, true)
            }
        };

        let result = flight.await;

        {
            let mut state = self.state.lock().await;
            // Every completer clears the flight entry (the owner may have
            // been cancelled mid-await), but only this exact flight — a
            // successor under the same key must not be evicted.
            if let Some((id, _)) = state.in_flight.get(&flight_key)
                && *id == flight_id
            {
                state.in_flight.remove(&flight_key);
            }
            if is_owner && let Ok(outcome) = &result {
                if outcome.coverage == Coverage::Full {
                    state
                        .cache
                        .store_global(domain, outcome.records.clone(), started);
                }
                if let Some(center) = reference {
                    state
                        .cache
                        .store_zone(domain, center, outcome.records.clone(), started);
                }
            }
        }

        let outcome = result?;
        Ok(self.filter_around(outcome.records, reference))
    }

    /// Ranked nearby query: cache-backed records ordered by distance.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the underlying fetch fails.
    pub async fn nearby(
        &self,
        domain: Domain,
        reference: Coordinate,
        max_radius_m: Option<f64>,
        max_results: Option<usize>,
    ) -> Result<Vec<RankedPoi>, FetchError> {
        let records = self.get_or_fetch(domain, Some(reference)).await?;
        Ok(rank(&records, reference, max_radius_m, max_results))
    }

    /// Drops cached data for one domain (pull-to-refresh).
    pub async fn invalidate(&self, domain: Domain) {
        self.state.lock().await.cache.invalidate(domain);
    }

    /// Drops all cached data.
    pub async fn clear_cache(&self) {
        self.state.lock().await.cache.clear();
    }

    /// Filters a dataset to the query radius around the reference point,
    /// ordered nearest-first. Without a reference the dataset passes
    /// through unchanged.
    fn filter_around(
        &self,
        records: Vec<PointOfInterest>,
        reference: Option<Coordinate>,
    ) -> Vec<PointOfInterest> {
        match reference {
            Some(center) => rank(&records, center, Some(self.query_radius_m), None)
                .into_iter()
                .map(|ranked| ranked.poi)
                .collect(),
            None => records,
        }
    }
}
