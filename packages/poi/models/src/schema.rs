//! Per-domain normalization schema types, deserialized from TOML.
//!
//! Each open-data layer ships one schema file describing how to map its
//! loosely-typed feature properties onto a [`PointOfInterest`](crate::PointOfInterest):
//! which fields carry the display name and address parts, and which
//! extractors feed the domain-specific flags and numbers. A single generic
//! normalizer interprets these tables, so adding a layer never means adding
//! normalization code.

use serde::{Deserialize, Serialize};

use crate::Domain;

/// A complete domain schema, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainSchema {
    /// Which domain this schema normalizes into.
    pub domain: Domain,
    /// WFS feature type name (e.g. `"adr_voie_lieu.adrtoilettepublique"`).
    pub layer: String,
    /// Human-readable dataset name (e.g. "Public toilets").
    pub label: String,
    /// Property fields tried in order for the record id; a v4 UUID is
    /// generated when none yields a value.
    pub id_fields: Vec<String>,
    /// Whether the upstream layer supports server-side `BBOX` filtering.
    /// Defaults to `true`.
    #[serde(default = "default_true")]
    pub spatial_filter: bool,
    /// Sub-region values for fan-out domains (one request per entry,
    /// filtered via `district_field`). Empty for single-request domains.
    #[serde(default)]
    pub districts: Vec<String>,
    /// Property field the district values filter on (CQL).
    #[serde(default)]
    pub district_field: Option<String>,
    /// Display name extraction.
    pub display_name: TextMapping,
    /// Address assembly.
    pub address: AddressMapping,
    /// Domain-specific attribute extraction.
    pub details: DetailMapping,
}

const fn default_true() -> bool {
    true
}

/// First-non-empty text extraction with a placeholder default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextMapping {
    /// Property fields tried in order; the first non-empty string wins.
    pub fields: Vec<String>,
    /// Placeholder used when no field yields a value.
    pub default: String,
}

/// Address assembly from up to two sub-groups of fields.
///
/// Street parts are joined by spaces, locality parts (postal code, commune)
/// are joined by spaces, and the two groups are joined by `", "`. Empty
/// parts are omitted at every level; when everything is absent the
/// placeholder is used instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressMapping {
    /// Street sub-group fields (number, street name), in order.
    #[serde(default)]
    pub street: Vec<String>,
    /// Locality sub-group fields (postal code, commune), in order.
    #[serde(default)]
    pub locality: Vec<String>,
    /// Placeholder used when no part is present.
    pub default: String,
}

/// How to derive a boolean flag from a raw property.
///
/// The policy is deliberately conservative: anything that is not an
/// explicit affirmative value maps to `false`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlagMapping {
    /// No source field — the flag is always `false`.
    #[default]
    None,
    /// Direct boolean field.
    DirectBool {
        /// Property field name.
        field: String,
    },
    /// String field matched case-insensitively against affirmative tokens
    /// (substring match, e.g. `"oui"`, `"laisse"`, `"gratuit"`).
    TokenMatch {
        /// Property field name.
        field: String,
        /// Affirmative substrings.
        tokens: Vec<String>,
    },
}

/// A numeric property that may arrive as a JSON number or a numeric
/// string. Absence stays `None` — never zero-defaulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumberMapping {
    /// Property field name.
    pub field: String,
}

/// A delimited-list property (e.g. connector types `"T2 - EF"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMapping {
    /// Property field name.
    pub field: String,
    /// Separator between values. Defaults to `"-"`.
    #[serde(default = "default_list_separator")]
    pub separator: String,
}

fn default_list_separator() -> String {
    "-".to_string()
}

/// Per-domain attribute extraction table.
///
/// The variant selects which [`PoiDetails`](crate::PoiDetails) variant the
/// normalizer produces and names the extractor for each of its fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DetailMapping {
    /// Public toilets.
    Toilets {
        /// Wheelchair accessibility flag.
        #[serde(default)]
        accessible: FlagMapping,
    },
    /// Public benches.
    Benches {
        /// Shade flag.
        #[serde(default)]
        shaded: FlagMapping,
    },
    /// Drinking fountains.
    DrinkingFountains {
        /// In-service flag.
        #[serde(default)]
        in_service: FlagMapping,
    },
    /// Parks and gardens.
    Parks {
        /// Surface area in square meters.
        area_sq_m: Option<NumberMapping>,
        /// Dogs-allowed flag.
        #[serde(default)]
        dogs_allowed: FlagMapping,
    },
    /// Compost bins.
    CompostBins {
        /// In-service flag.
        #[serde(default)]
        in_service: FlagMapping,
    },
    /// Glass-recycling silos.
    GlassSilos {
        /// Reduced-mobility accessibility flag.
        #[serde(default)]
        accessible: FlagMapping,
    },
    /// EV charging stations.
    ChargingStations {
        /// Maximum power in kW.
        power_kw: Option<NumberMapping>,
        /// Connector type list.
        connectors: Option<ListMapping>,
        /// Free-to-use flag.
        #[serde(default)]
        is_free: FlagMapping,
        /// Charge point count.
        point_count: Option<NumberMapping>,
    },
    /// Hiking loops.
    HikingLoops {
        /// Loop length in kilometers.
        length_km: Option<NumberMapping>,
        /// Free-text difficulty field.
        #[serde(default)]
        difficulty: Option<String>,
    },
}

// Parse coverage for these types lives next to the embedded TOML files in
// the `lyon_poi` registry.
