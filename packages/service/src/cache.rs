//! Two-tier in-memory POI cache.
//!
//! A process-wide full-dataset tier keyed by domain with a long expiry,
//! and a per-zone tier keyed by a coarse grid cell with a short expiry and
//! a center-drift invalidation rule. Entries are immutable once written; a
//! refresh replaces the entry wholesale. The cache is an explicitly
//! constructed object owned by the service, not a hidden singleton, so
//! tests can build one per scenario.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use lyon_poi_models::{Coordinate, Domain, PointOfInterest};
use lyon_proximity::distance_meters;

/// Expiry and quantization tuning.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime of a full-dataset entry.
    pub global_expiry: Duration,
    /// Lifetime of a per-zone entry.
    pub zone_expiry: Duration,
    /// Grid cell edge in degrees (0.01 is roughly a kilometer at Lyon's
    /// latitude).
    pub zone_cell_deg: f64,
    /// How far the query center may drift from a zone entry's recorded
    /// center before the entry is treated as stale, in meters.
    pub drift_tolerance_m: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            global_expiry: Duration::from_secs(6 * 3600),
            zone_expiry: Duration::from_secs(600),
            zone_cell_deg: 0.01,
            drift_tolerance_m: 200.0,
        }
    }
}

/// A coordinate quantized to the zone grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZoneKey {
    /// Latitude cell index.
    pub lat_cell: i32,
    /// Longitude cell index.
    pub lon_cell: i32,
}

impl ZoneKey {
    /// Quantizes a coordinate onto the grid.
    #[must_use]
    pub fn quantize(coordinate: &Coordinate, cell_deg: f64) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self {
            lat_cell: (coordinate.latitude / cell_deg).floor() as i32,
            lon_cell: (coordinate.longitude / cell_deg).floor() as i32,
        }
    }
}

/// A full-dataset entry for one domain.
struct GlobalEntry {
    records: Vec<PointOfInterest>,
    fetched_at: Instant,
}

/// A bounded-region entry for one grid cell.
struct ZoneEntry {
    records: Vec<PointOfInterest>,
    fetched_at: Instant,
    center: Coordinate,
}

/// The two-tier cache. All mutation goes through the owning service.
pub struct PoiCache {
    config: CacheConfig,
    global: HashMap<Domain, GlobalEntry>,
    zones: HashMap<(Domain, ZoneKey), ZoneEntry>,
}

impl PoiCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            global: HashMap::new(),
            zones: HashMap::new(),
        }
    }

    /// Returns the cache tuning.
    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Looks up servable records for a query, global tier first.
    ///
    /// Returns `None` when both tiers miss (absent, expired, or the query
    /// center drifted past the tolerance), in which case the caller must
    /// fetch.
    #[must_use]
    pub fn lookup(
        &self,
        domain: Domain,
        reference: Option<&Coordinate>,
    ) -> Option<&[PointOfInterest]> {
        if let Some(entry) = self.global.get(&domain)
            && entry.fetched_at.elapsed() < self.config.global_expiry
        {
            log::debug!("Global cache hit for {domain}");
            return Some(&entry.records);
        }

        let reference = reference?;
        let key = ZoneKey::quantize(reference, self.config.zone_cell_deg);
        let entry = self.zones.get(&(domain, key))?;

        if entry.fetched_at.elapsed() >= self.config.zone_expiry {
            return None;
        }
        let drift = distance_meters(&entry.center, reference);
        if drift > self.config.drift_tolerance_m {
            log::debug!("Zone entry for {domain} drifted {drift:.0} m, treating as stale");
            return None;
        }

        log::debug!("Zone cache hit for {domain}");
        Some(&entry.records)
    }

    /// Stores a full-dataset entry, replacing any previous one unless a
    /// newer fetch already wrote (last-writer-wins by fetch timestamp,
    /// not completion order).
    pub fn store_global(
        &mut self,
        domain: Domain,
        records: Vec<PointOfInterest>,
        fetched_at: Instant,
    ) {
        if let Some(existing) = self.global.get(&domain)
            && existing.fetched_at > fetched_at
        {
            log::debug!("Dropping stale global write for {domain}");
            return;
        }
        self.global.insert(
            domain,
            GlobalEntry {
                records,
                fetched_at,
            },
        );
    }

    /// Stores a zone entry for the cell containing `center`, unless a
    /// newer fetch already wrote that cell.
    pub fn store_zone(
        &mut self,
        domain: Domain,
        center: Coordinate,
        records: Vec<PointOfInterest>,
        fetched_at: Instant,
    ) {
        let key = ZoneKey::quantize(&center, self.config.zone_cell_deg);
        if let Some(existing) = self.zones.get(&(domain, key))
            && existing.fetched_at > fetched_at
        {
            log::debug!("Dropping stale zone write for {domain}");
            return;
        }
        self.zones.insert(
            (domain, key),
            ZoneEntry {
                records,
                fetched_at,
                center,
            },
        );
    }

    /// Drops both tiers for one domain.
    pub fn invalidate(&mut self, domain: Domain) {
        self.global.remove(&domain);
        self.zones.retain(|(entry_domain, _), _| *entry_domain != domain);
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.global.clear();
        self.zones.clear();
    }
}
