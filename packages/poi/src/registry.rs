//! Compile-time registry of domain normalization schemas.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Adding a new open-data layer requires creating a TOML file in
//! `domains/` and adding a corresponding entry here.

use lyon_poi_models::Domain;
use lyon_poi_models::schema::DomainSchema;

/// Number of registered domain schemas. Updated when new domains are
/// added. Enforced by a test.
#[cfg(test)]
const EXPECTED_SCHEMA_COUNT: usize = 8;

/// Embedded TOML schema definitions.
const SCHEMA_TOMLS: &[(&str, &str)] = &[
    ("toilets", include_str!("../domains/toilets.toml")),
    ("benches", include_str!("../domains/benches.toml")),
    (
        "drinking_fountains",
        include_str!("../domains/drinking_fountains.toml"),
    ),
    ("parks", include_str!("../domains/parks.toml")),
    ("compost_bins", include_str!("../domains/compost_bins.toml")),
    ("glass_silos", include_str!("../domains/glass_silos.toml")),
    (
        "charging_stations",
        include_str!("../domains/charging_stations.toml"),
    ),
    ("hiking_loops", include_str!("../domains/hiking_loops.toml")),
];

/// Returns all registered domain schemas.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught during CI.
#[must_use]
pub fn all_schemas() -> Vec<DomainSchema> {
    SCHEMA_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse domain schema '{name}': {e}"))
        })
        .collect()
}

/// Returns the schema for one domain.
///
/// # Panics
///
/// Panics if the domain has no registered schema; the registry test
/// guarantees every [`Domain`] variant is covered.
#[must_use]
pub fn schema_for(domain: Domain) -> DomainSchema {
    all_schemas()
        .into_iter()
        .find(|schema| schema.domain == domain)
        .unwrap_or_else(|| panic!("No schema registered for domain '{domain}'"))
}
