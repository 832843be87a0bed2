//! Distance ranking of POI collections around a reference point.

use lyon_poi_models::{Coordinate, PointOfInterest};

use crate::distance_meters;

/// A POI paired with its distance from the reference point.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPoi {
    /// The ranked record.
    pub poi: PointOfInterest,
    /// Great-circle distance from the reference point, in meters.
    pub distance_m: f64,
}

/// Ranks `pois` by ascending distance from `reference`.
///
/// The radius filter is inclusive: a POI exactly `max_radius_m` away is
/// kept. Ties keep their relative input order (the sort is stable), and
/// `max_results` truncates after sorting.
#[must_use]
pub fn rank(
    pois: &[PointOfInterest],
    reference: Coordinate,
    max_radius_m: Option<f64>,
    max_results: Option<usize>,
) -> Vec<RankedPoi> {
    let mut ranked: Vec<RankedPoi> = pois
        .iter()
        .map(|poi| RankedPoi {
            distance_m: distance_meters(&reference, &poi.coordinate),
            poi: poi.clone(),
        })
        .filter(|entry| max_radius_m.is_none_or(|radius| entry.distance_m <= radius))
        .collect();

    ranked.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));

    if let Some(limit) = max_results {
        ranked.truncate(limit);
    }
    ranked
}
