//! Density-based marker clustering for map display.
//!
//! Merges POIs within a zoom-adaptive distance threshold into clusters.
//! Recomputation is memoized: while the viewport has not moved meaningfully
//! and the debounce interval has not elapsed, the previous result is
//! returned unchanged, which keeps continuous pan/zoom gestures from
//! thrashing the engine.

use std::time::{Duration, Instant};

use geo::{Contains as _, Point, Rect};
use lyon_poi_models::{Cluster, Coordinate, PointOfInterest};

use crate::distance_meters;

/// The visible map region, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Center of the visible region.
    pub center: Coordinate,
    /// North-south extent, in degrees.
    pub lat_span: f64,
    /// East-west extent, in degrees.
    pub lon_span: f64,
}

/// Tuning knobs for the cluster engine.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Merge distance at the reference span, in meters.
    pub base_distance_m: f64,
    /// Viewport span at which `base_distance_m` applies, in degrees.
    pub reference_span_deg: f64,
    /// Lower bound on the zoom scale factor, so fully zoomed-in views
    /// still merge markers sharing a doorstep.
    pub min_factor: f64,
    /// Visibility margin around the viewport, per axis (1.5 = half a
    /// viewport of slack on each side), to avoid pop-in at the edges.
    pub margin_factor: f64,
    /// Minimum interval between recomputations for a near-identical
    /// viewport.
    pub debounce: Duration,
    /// Center movement below this is "the same viewport", in degrees.
    pub center_epsilon_deg: f64,
    /// Span change below this is "the same viewport", in degrees.
    pub span_epsilon_deg: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            base_distance_m: 50.0,
            reference_span_deg: 0.01,
            min_factor: 0.5,
            margin_factor: 1.5,
            debounce: Duration::from_millis(500),
            center_epsilon_deg: 0.0005,
            span_epsilon_deg: 0.001,
        }
    }
}

/// Memo of the last computation.
struct Memo {
    center: Coordinate,
    lat_span: f64,
    lon_span: f64,
    computed_at: Instant,
    clusters: Vec<Cluster>,
}

/// Groups visible POIs into clusters for the current viewport.
///
/// Clusters are recomputed, never mutated in place; callers get an owned
/// snapshot each time.
pub struct ClusterEngine {
    config: ClusterConfig,
    memo: Option<Memo>,
}

impl ClusterEngine {
    /// Creates an engine with the given tuning.
    #[must_use]
    pub const fn new(config: ClusterConfig) -> Self {
        Self {
            config,
            memo: None,
        }
    }

    /// Returns the clusters for `viewport`, recomputing only when the
    /// viewport moved meaningfully or the debounce interval elapsed.
    pub fn clusters(&mut self, pois: &[PointOfInterest], viewport: &Viewport) -> Vec<Cluster> {
        if let Some(memo) = &self.memo
            && self.is_same_viewport(memo, viewport)
            && memo.computed_at.elapsed() < self.config.debounce
        {
            log::debug!("Cluster recomputation debounced");
            return memo.clusters.clone();
        }

        let clusters = compute_clusters(pois, viewport, &self.config);
        self.memo = Some(Memo {
            center: viewport.center,
            lat_span: viewport.lat_span,
            lon_span: viewport.lon_span,
            computed_at: Instant::now(),
            clusters: clusters.clone(),
        });
        clusters
    }

    /// Forces the next [`Self::clusters`] call to recompute.
    pub fn invalidate(&mut self) {
        self.memo = None;
    }

    fn is_same_viewport(&self, memo: &Memo, viewport: &Viewport) -> bool {
        (memo.center.latitude - viewport.center.latitude).abs() < self.config.center_epsilon_deg
            && (memo.center.longitude - viewport.center.longitude).abs()
                < self.config.center_epsilon_deg
            && (memo.lat_span - viewport.lat_span).abs() < self.config.span_epsilon_deg
            && (memo.lon_span - viewport.lon_span).abs() < self.config.span_epsilon_deg
    }
}

/// One full clustering pass: visibility filter, then greedy merge.
fn compute_clusters(
    pois: &[PointOfInterest],
    viewport: &Viewport,
    config: &ClusterConfig,
) -> Vec<Cluster> {
    let visible: Vec<&PointOfInterest> = {
        let half_lat = viewport.lat_span * config.margin_factor / 2.0;
        let half_lon = viewport.lon_span * config.margin_factor / 2.0;
        let region = Rect::new(
            Point::new(
                viewport.center.longitude - half_lon,
                viewport.center.latitude - half_lat,
            ),
            Point::new(
                viewport.center.longitude + half_lon,
                viewport.center.latitude + half_lat,
            ),
        );
        pois.iter()
            .filter(|poi| {
                region.contains(&Point::new(
                    poi.coordinate.longitude,
                    poi.coordinate.latitude,
                ))
            })
            .collect()
    };

    // Wider viewport (zoomed out) scales the merge distance up.
    let span = viewport.lat_span.max(viewport.lon_span);
    let threshold =
        config.base_distance_m * config.min_factor.max(span / config.reference_span_deg);

    let mut processed = vec![false; visible.len()];
    let mut clusters = Vec::new();

    for seed in 0..visible.len() {
        if processed[seed] {
            continue;
        }
        processed[seed] = true;
        let mut members = vec![visible[seed].clone()];

        // Gather everything within the threshold of the seed; no
        // transitive chaining.
        for other in (seed + 1)..visible.len() {
            if processed[other] {
                continue;
            }
            let d = distance_meters(&visible[seed].coordinate, &visible[other].coordinate);
            if d <= threshold {
                processed[other] = true;
                members.push(visible[other].clone());
            }
        }

        clusters.push(Cluster {
            id: members[0].id.clone(),
            centroid: mean_coordinate(&members),
            members,
        });
    }

    clusters
}

/// Arithmetic mean of the member coordinates. Members are never empty.
fn mean_coordinate(members: &[PointOfInterest]) -> Coordinate {
    #[allow(clippy::cast_precision_loss)]
    let count = members.len() as f64;
    let (lat_sum, lon_sum) = members.iter().fold((0.0, 0.0), |acc, poi| {
        (
            acc.0 + poi.coordinate.latitude,
            acc.1 + poi.coordinate.longitude,
        )
    });
    Coordinate::new(lat_sum / count, lon_sum / count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyon_poi_models::{Domain, PoiDetails};
    use std::collections::BTreeSet;

    fn poi(id: &str, latitude: f64, longitude: f64) -> PointOfInterest {
        PointOfInterest {
            id: id.to_string(),
            domain: Domain::GlassSilos,
            coordinate: Coordinate::new(latitude, longitude),
            display_name: "Glass silo".to_string(),
            address: "Address not available".to_string(),
            details: PoiDetails::GlassSilos { accessible: false },
        }
    }

    fn viewport() -> Viewport {
        Viewport {
            center: Coordinate::new(45.7640, 4.8357),
            lat_span: 0.01,
            lon_span: 0.01,
        }
    }

    fn engine() -> ClusterEngine {
        ClusterEngine::new(ClusterConfig::default())
    }

    #[test]
    fn empty_input_yields_no_clusters() {
        assert!(engine().clusters(&[], &viewport()).is_empty());
    }

    #[test]
    fn members_cover_the_visible_set_exactly_once() {
        let pois = vec![
            poi("a", 45.7640, 4.8357),
            poi("b", 45.7641, 4.8357),
            poi("c", 45.7660, 4.8380),
            poi("d", 45.7620, 4.8340),
        ];
        let clusters = engine().clusters(&pois, &viewport());

        let mut seen = BTreeSet::new();
        for cluster in &clusters {
            assert!(!cluster.members.is_empty());
            for member in &cluster.members {
                assert!(seen.insert(member.id.clone()), "{} duplicated", member.id);
            }
        }
        assert_eq!(seen.len(), pois.len());
    }

    #[test]
    fn members_stay_within_the_threshold_of_their_seed() {
        let config = ClusterConfig::default();
        let vp = viewport();
        let span = vp.lat_span.max(vp.lon_span);
        let threshold =
            config.base_distance_m * config.min_factor.max(span / config.reference_span_deg);

        let pois = vec![
            poi("a", 45.7640, 4.8357),
            poi("b", 45.7641, 4.8357),
            poi("c", 45.7643, 4.8360),
            poi("d", 45.7660, 4.8380),
        ];
        let clusters = ClusterEngine::new(config).clusters(&pois, &vp);

        for cluster in &clusters {
            let seed = &cluster.members[0];
            for member in &cluster.members {
                assert!(
                    distance_meters(&seed.coordinate, &member.coordinate) <= threshold,
                    "{} is too far from seed {}",
                    member.id,
                    seed.id
                );
            }
        }
    }

    #[test]
    fn co_located_markers_merge_with_a_mean_centroid() {
        let pois = vec![
            poi("a", 45.7640, 4.8357),
            poi("b", 45.7642, 4.8357),
            poi("lone", 45.7700, 4.8420),
        ];
        let clusters = engine().clusters(&pois, &viewport());
        assert_eq!(clusters.len(), 2);

        let merged = clusters.iter().find(|c| c.members.len() == 2).unwrap();
        assert_eq!(merged.id, "a");
        assert!((merged.centroid.latitude - 45.7641).abs() < 1e-9);
        assert!((merged.centroid.longitude - 4.8357).abs() < 1e-9);

        let singleton = clusters.iter().find(|c| c.members.len() == 1).unwrap();
        assert_eq!(singleton.id, "lone");
        assert_eq!(singleton.centroid, singleton.members[0].coordinate);
    }

    #[test]
    fn visibility_margin_excludes_far_away_pois() {
        // 1.5x margin on a 0.01 deg span keeps +-0.0075 deg around the
        // center; 0.02 deg away is out.
        let pois = vec![
            poi("inside", 45.7640, 4.8357),
            poi("outside", 45.7840, 4.8357),
        ];
        let clusters = engine().clusters(&pois, &viewport());
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].id, "inside");
    }

    #[test]
    fn zoomed_out_viewport_merges_more_aggressively() {
        // ~330 m apart: separate when zoomed in, merged when zoomed out.
        let pois = vec![poi("a", 45.7640, 4.8357), poi("b", 45.7670, 4.8357)];

        let zoomed_in = engine().clusters(&pois, &viewport());
        assert_eq!(zoomed_in.len(), 2);

        let wide = Viewport {
            center: Coordinate::new(45.7640, 4.8357),
            lat_span: 0.1,
            lon_span: 0.1,
        };
        let zoomed_out = engine().clusters(&pois, &wide);
        assert_eq!(zoomed_out.len(), 1);
        assert_eq!(zoomed_out[0].members.len(), 2);
    }

    #[test]
    fn near_identical_viewport_is_debounced() {
        let mut engine = ClusterEngine::new(ClusterConfig {
            debounce: Duration::from_secs(3600),
            ..ClusterConfig::default()
        });
        let pois = vec![poi("a", 45.7640, 4.8357)];
        let first = engine.clusters(&pois, &viewport());
        assert_eq!(first.len(), 1);

        // Same viewport within the debounce window: the stale memo comes
        // back even though the POI set changed.
        let more = vec![poi("a", 45.7640, 4.8357), poi("b", 45.7660, 4.8380)];
        let debounced = engine.clusters(&more, &viewport());
        assert_eq!(debounced.len(), 1);

        // A meaningful pan forces recomputation.
        let panned = Viewport {
            center: Coordinate::new(45.7680, 4.8357),
            lat_span: 0.01,
            lon_span: 0.01,
        };
        let recomputed = engine.clusters(&more, &panned);
        assert_eq!(recomputed.len(), 2);
    }

    #[test]
    fn invalidate_forces_recomputation() {
        let mut engine = ClusterEngine::new(ClusterConfig {
            debounce: Duration::from_secs(3600),
            ..ClusterConfig::default()
        });
        let pois = vec![poi("a", 45.7640, 4.8357)];
        engine.clusters(&pois, &viewport());

        let more = vec![poi("a", 45.7640, 4.8357), poi("b", 45.7660, 4.8380)];
        engine.invalidate();
        let recomputed = engine.clusters(&more, &viewport());
        assert_eq!(recomputed.len(), 2);
    }
}
