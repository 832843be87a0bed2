//! Normalizes raw GeoJSON features into [`PointOfInterest`] records.
//!
//! A single generic implementation interprets the per-domain
//! [`DomainSchema`] tables, so every layer goes through the same code
//! path regardless of its API-specific field naming. Features whose
//! geometry cannot be extracted are dropped and logged; the returned
//! collection is best-effort.

use lyon_poi_models::schema::{
    AddressMapping, DetailMapping, DomainSchema, FlagMapping, ListMapping, NumberMapping,
    TextMapping,
};
use lyon_poi_models::{Bounds, PoiDetails, PointOfInterest};

use crate::geometry::{ExtractedGeometry, extract_geometry};

/// Normalizes a batch of raw GeoJSON features.
///
/// Per-feature geometry failures are logged and skipped; they never abort
/// the batch.
#[must_use]
pub fn normalize_features(
    schema: &DomainSchema,
    features: &[serde_json::Value],
    envelope: &Bounds,
) -> Vec<PointOfInterest> {
    features
        .iter()
        .filter_map(|feature| normalize_feature(schema, feature, envelope))
        .collect()
}

/// Normalizes a single GeoJSON feature.
fn normalize_feature(
    schema: &DomainSchema,
    feature: &serde_json::Value,
    envelope: &Bounds,
) -> Option<PointOfInterest> {
    let null = serde_json::Value::Null;
    let geometry = feature.get("geometry").unwrap_or(&null);
    let extracted = match extract_geometry(geometry, envelope) {
        Ok(extracted) => extracted,
        Err(e) => {
            log::warn!("Skipping {} feature: {e}", schema.layer);
            return None;
        }
    };

    let props = feature.get("properties").unwrap_or(&null);

    let id = extract_id(props, &schema.id_fields)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    Some(PointOfInterest {
        id,
        domain: schema.domain,
        coordinate: extracted.coordinate,
        display_name: extract_text(&schema.display_name, props),
        address: assemble_address(&schema.address, props),
        details: build_details(&schema.details, props, &extracted),
    })
}

/// Builds the domain-specific detail payload from the schema's extractor
/// table.
fn build_details(
    mapping: &DetailMapping,
    props: &serde_json::Value,
    extracted: &ExtractedGeometry,
) -> PoiDetails {
    match mapping {
        DetailMapping::Toilets { accessible } => PoiDetails::Toilets {
            accessible: extract_flag(accessible, props),
        },
        DetailMapping::Benches { shaded } => PoiDetails::Benches {
            shaded: extract_flag(shaded, props),
        },
        DetailMapping::DrinkingFountains { in_service } => PoiDetails::DrinkingFountains {
            in_service: extract_flag(in_service, props),
        },
        DetailMapping::Parks {
            area_sq_m,
            dogs_allowed,
        } => PoiDetails::Parks {
            area_sq_m: area_sq_m.as_ref().and_then(|m| extract_number(m, props)),
            dogs_allowed: extract_flag(dogs_allowed, props),
        },
        DetailMapping::CompostBins { in_service } => PoiDetails::CompostBins {
            in_service: extract_flag(in_service, props),
        },
        DetailMapping::GlassSilos { accessible } => PoiDetails::GlassSilos {
            accessible: extract_flag(accessible, props),
        },
        DetailMapping::ChargingStations {
            power_kw,
            connectors,
            is_free,
            point_count,
        } => {
            // A station with no published count is a single charge point.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let point_count = point_count
                .as_ref()
                .and_then(|m| extract_number(m, props))
                .map_or(1, |n| n.max(0.0) as u32);
            PoiDetails::ChargingStations {
                power_kw: power_kw.as_ref().and_then(|m| extract_number(m, props)),
                connectors: connectors
                    .as_ref()
                    .map(|m| extract_list(m, props))
                    .unwrap_or_default(),
                is_free: extract_flag(is_free, props),
                point_count,
            }
        }
        DetailMapping::HikingLoops {
            length_km,
            difficulty,
        } => PoiDetails::HikingLoops {
            path: extracted.path.clone().unwrap_or_default(),
            length_km: length_km.as_ref().and_then(|m| extract_number(m, props)),
            difficulty: difficulty
                .as_deref()
                .and_then(|field| get_str(props, field))
                .map(String::from),
        },
    }
}

// ── Extractor helpers ────────────────────────────────────────────────────

/// Gets a string value from a JSON object by field name.
fn get_str<'a>(record: &'a serde_json::Value, field: &str) -> Option<&'a str> {
    record.get(field)?.as_str()
}

/// Tries each field name in order and returns the first non-empty string
/// value. Falls back to converting numeric values to strings (some layers
/// expose `gid` as an integer).
fn extract_id(record: &serde_json::Value, fields: &[String]) -> Option<String> {
    for field in fields {
        if let Some(s) = get_str(record, field)
            && !s.is_empty()
        {
            return Some(s.to_string());
        }
        if let Some(n) = record.get(field).and_then(serde_json::Value::as_i64) {
            return Some(n.to_string());
        }
    }
    None
}

/// First non-empty field wins; otherwise the placeholder default.
fn extract_text(mapping: &TextMapping, record: &serde_json::Value) -> String {
    mapping
        .fields
        .iter()
        .filter_map(|field| get_str(record, field))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map_or_else(|| mapping.default.clone(), String::from)
}

/// Assembles an address from the street and locality sub-groups.
///
/// Parts within a group are joined by spaces, the groups by `", "`;
/// empty parts are omitted at every level so a feature carrying only a
/// commune yields exactly that commune with no stray separators.
fn assemble_address(mapping: &AddressMapping, record: &serde_json::Value) -> String {
    let join_group = |fields: &[String]| -> Option<String> {
        let parts: Vec<&str> = fields
            .iter()
            .filter_map(|field| get_str(record, field))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    };

    let groups: Vec<String> = [join_group(&mapping.street), join_group(&mapping.locality)]
        .into_iter()
        .flatten()
        .collect();

    if groups.is_empty() {
        mapping.default.clone()
    } else {
        groups.join(", ")
    }
}

/// Derives a boolean flag; anything that is not an explicit affirmative
/// value is `false`.
fn extract_flag(mapping: &FlagMapping, record: &serde_json::Value) -> bool {
    match mapping {
        FlagMapping::None => false,
        FlagMapping::DirectBool { field } => record
            .get(field)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false),
        FlagMapping::TokenMatch { field, tokens } => {
            get_str(record, field).is_some_and(|value| {
                let value = value.to_lowercase();
                tokens
                    .iter()
                    .any(|token| value.contains(&token.to_lowercase()))
            })
        }
    }
}

/// Extracts a number that may arrive as a JSON number or numeric string.
/// Absence stays `None`.
fn extract_number(mapping: &NumberMapping, record: &serde_json::Value) -> Option<f64> {
    let value = record.get(&mapping.field)?;
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Splits a delimited-list property into trimmed, non-empty entries.
fn extract_list(mapping: &ListMapping, record: &serde_json::Value) -> Vec<String> {
    get_str(record, &mapping.field)
        .map(|value| {
            value
                .split(&mapping.separator)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::METRO_BOUNDS;
    use lyon_poi_models::Domain;
    use lyon_poi_models::schema::DomainSchema;

    fn toilet_schema() -> DomainSchema {
        toml::de::from_str(
            r#"
            domain = "toilets"
            layer = "adr_voie_lieu.adrtoilettepublique"
            label = "Public toilets"
            id_fields = ["gid"]

            [display_name]
            fields = ["nom"]
            default = "Public toilet"

            [address]
            street = ["adresse"]
            locality = ["code_postal", "commune"]
            default = "Address not available"

            [details]
            type = "toilets"

            [details.accessible]
            type = "token_match"
            field = "acces_pmr"
            tokens = ["oui"]
        "#,
        )
        .unwrap()
    }

    fn point_feature(props: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [4.8357, 45.7640] },
            "properties": props
        })
    }

    #[test]
    fn normalizes_a_complete_feature() {
        let feature = point_feature(serde_json::json!({
            "gid": 42,
            "nom": "Toilettes Bellecour",
            "adresse": "Place Bellecour",
            "code_postal": "69002",
            "commune": "Lyon",
            "acces_pmr": "Oui"
        }));
        let pois = normalize_features(&toilet_schema(), &[feature], &METRO_BOUNDS);
        assert_eq!(pois.len(), 1);
        let poi = &pois[0];
        assert_eq!(poi.id, "42");
        assert_eq!(poi.domain, Domain::Toilets);
        assert_eq!(poi.display_name, "Toilettes Bellecour");
        assert_eq!(poi.address, "Place Bellecour, 69002 Lyon");
        assert_eq!(poi.details, PoiDetails::Toilets { accessible: true });
    }

    #[test]
    fn commune_only_address_has_no_stray_separators() {
        let feature = point_feature(serde_json::json!({ "commune": "Villeurbanne" }));
        let pois = normalize_features(&toilet_schema(), &[feature], &METRO_BOUNDS);
        assert_eq!(pois[0].address, "Villeurbanne");
    }

    #[test]
    fn absent_fields_fall_back_to_placeholders() {
        let feature = point_feature(serde_json::json!({}));
        let pois = normalize_features(&toilet_schema(), &[feature], &METRO_BOUNDS);
        let poi = &pois[0];
        assert_eq!(poi.display_name, "Public toilet");
        assert_eq!(poi.address, "Address not available");
        assert_eq!(poi.details, PoiDetails::Toilets { accessible: false });
        // No usable id field — a generated UUID stands in.
        assert!(!poi.id.is_empty());
    }

    #[test]
    fn non_affirmative_flag_values_are_false() {
        let feature = point_feature(serde_json::json!({ "acces_pmr": "Non" }));
        let pois = normalize_features(&toilet_schema(), &[feature], &METRO_BOUNDS);
        assert_eq!(pois[0].details, PoiDetails::Toilets { accessible: false });
    }

    #[test]
    fn bad_geometry_drops_only_the_offending_feature() {
        let good = point_feature(serde_json::json!({ "gid": 1 }));
        let bad = serde_json::json!({
            "type": "Feature",
            "geometry": null,
            "properties": { "gid": 2 }
        });
        let pois = normalize_features(&toilet_schema(), &[bad, good], &METRO_BOUNDS);
        assert_eq!(pois.len(), 1);
        assert_eq!(pois[0].id, "1");
    }

    #[test]
    fn charger_numbers_pass_through_strings_and_absence() {
        let schema: DomainSchema = toml::de::from_str(
            r#"
            domain = "charging_stations"
            layer = "nrj_energie.nrjbornerechargeelectrique"
            label = "EV charging stations"
            id_fields = ["gid"]

            [display_name]
            fields = ["nom_station"]
            default = "Charging station"

            [address]
            street = ["adresse_station"]
            locality = ["commune"]
            default = "Address not available"

            [details]
            type = "charging_stations"
            power_kw = { field = "puissance_nominale" }
            connectors = { field = "type_prise" }
            point_count = { field = "nbre_pdc" }

            [details.is_free]
            type = "token_match"
            field = "gratuit"
            tokens = ["oui", "gratuit", "libre"]
        "#,
        )
        .unwrap();

        let feature = point_feature(serde_json::json!({
            "gid": 7,
            "puissance_nominale": "22",
            "type_prise": "T2 - EF",
            "gratuit": "Acces libre",
            "nbre_pdc": 2
        }));
        let pois = normalize_features(&schema, &[feature], &METRO_BOUNDS);
        match &pois[0].details {
            PoiDetails::ChargingStations {
                power_kw,
                connectors,
                is_free,
                point_count,
            } => {
                assert_eq!(*power_kw, Some(22.0));
                assert_eq!(connectors, &["T2", "EF"]);
                assert!(is_free);
                assert_eq!(*point_count, 2);
            }
            other => panic!("unexpected details: {other:?}"),
        }

        // Absent numerics stay None; absent count means one charge point.
        let bare = point_feature(serde_json::json!({ "gid": 8 }));
        let pois = normalize_features(&schema, &[bare], &METRO_BOUNDS);
        match &pois[0].details {
            PoiDetails::ChargingStations {
                power_kw,
                point_count,
                ..
            } => {
                assert_eq!(*power_kw, None);
                assert_eq!(*point_count, 1);
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[test]
    fn hiking_loop_keeps_its_polyline() {
        let schema: DomainSchema = toml::de::from_str(
            r#"
            domain = "hiking_loops"
            layer = "evg_esp_veg.evgsentierpietonnier"
            label = "Hiking loops"
            id_fields = ["gid"]
            spatial_filter = false

            [display_name]
            fields = ["nom"]
            default = "Hiking loop"

            [address]
            locality = ["commune"]
            default = "Address not available"

            [details]
            type = "hiking_loops"
            length_km = { field = "longueur_km" }
            difficulty = "difficulte"
        "#,
        )
        .unwrap();

        let feature = serde_json::json!({
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": [[4.80, 45.70], [4.82, 45.72], [4.84, 45.74]]
            },
            "properties": { "gid": 3, "longueur_km": 5.4, "difficulte": "Facile" }
        });
        let pois = normalize_features(&schema, &[feature], &METRO_BOUNDS);
        match &pois[0].details {
            PoiDetails::HikingLoops {
                path,
                length_km,
                difficulty,
            } => {
                assert_eq!(path.len(), 3);
                assert_eq!(*length_km, Some(5.4));
                assert_eq!(difficulty.as_deref(), Some("Facile"));
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }
}
