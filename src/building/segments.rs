//! Segments: facet paths inside one superlayer.

use super::facets::Facet;
use crate::automaton::LayerOrdered;
use crate::fit::{fit_circle, CircleFit};
use crate::hits::{HitId, RightLeft, WireHit};
use nalgebra::Vector2;
use std::collections::BTreeMap;

/// Radially ordered hits of one superlayer with their reconstructed
/// touch points.
#[derive(Clone, Debug)]
pub struct Segment {
    hits: Vec<HitId>,
    right_left: Vec<RightLeft>,
    touch_points: Vec<Vector2<f64>>,
    superlayer: u8,
    fit: Option<CircleFit>,
}

impl Segment {
    /// Merges the facets of `path` (in path order). Touch points of hits
    /// shared by several facets are averaged; the passage is taken from the
    /// first facet containing the hit.
    pub fn from_facet_path(hits: &[WireHit], facets: &[Facet], path: &[usize]) -> Self {
        let mut order: Vec<HitId> = Vec::new();
        let mut accumulated: BTreeMap<HitId, (Vector2<f64>, usize, RightLeft)> = BTreeMap::new();
        for &index in path {
            let facet = &facets[index];
            let points = facet.touch_points(hits);
            for ((&hit, &rl), point) in facet.hits().iter().zip(facet.right_left()).zip(points) {
                let entry = accumulated.entry(hit).or_insert_with(|| {
                    order.push(hit);
                    (Vector2::zeros(), 0, rl)
                });
                entry.0 += point;
                entry.1 += 1;
            }
        }

        let mut right_left = Vec::with_capacity(order.len());
        let mut touch_points = Vec::with_capacity(order.len());
        for hit in &order {
            if let Some(&(sum, count, rl)) = accumulated.get(hit) {
                right_left.push(rl);
                touch_points.push(sum / count as f64);
            }
        }
        let superlayer = order.first().map_or(0, |&h| hits[h].superlayer());
        let fit = if touch_points.len() >= 4 {
            fit_circle(&touch_points, None)
        } else {
            None
        };
        Self {
            hits: order,
            right_left,
            touch_points,
            superlayer,
            fit,
        }
    }

    #[inline]
    pub fn hits(&self) -> &[HitId] {
        &self.hits
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    #[inline]
    pub fn right_left(&self) -> &[RightLeft] {
        &self.right_left
    }

    #[inline]
    pub fn superlayer(&self) -> u8 {
        self.superlayer
    }

    pub fn fit(&self) -> Option<&CircleFit> {
        self.fit.as_ref()
    }

    #[inline]
    pub fn touch_points(&self) -> &[Vector2<f64>] {
        &self.touch_points
    }

    /// Touch points reflected through their wires, i.e. the reconstruction
    /// under the opposite passage of every hit.
    pub fn mirrored_touch_points(&self, hits: &[WireHit]) -> Vec<Vector2<f64>> {
        self.hits
            .iter()
            .zip(&self.touch_points)
            .map(|(&h, p)| hits[h].reference_position() * 2.0 - p)
            .collect()
    }

    /// First and last hit.
    pub fn ends(&self) -> Option<(HitId, HitId)> {
        Some((*self.hits.first()?, *self.hits.last()?))
    }
}

impl LayerOrdered for Segment {
    fn layer(&self) -> u32 {
        u32::from(self.superlayer)
    }
}

/// Converts facet paths into segments with at least `min_hits` hits.
pub fn build_segments(
    hits: &[WireHit],
    facets: &[Facet],
    paths: &[Vec<usize>],
    min_hits: usize,
) -> Vec<Segment> {
    paths
        .iter()
        .map(|path| Segment::from_facet_path(hits, facets, path))
        .filter(|segment| segment.len() >= min_hits)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::{CellularPathFinder, PathFinderParams};
    use crate::building::facets::{build_facets, facet_relations};
    use crate::deadline::Deadline;
    use crate::hits::{build_wire_hits, CylindricalLayout, HitNeighborhood, LayoutParams, RawHit};
    use crate::trajectory::PerigeeCircle;

    fn superlayer_hits(layout: &CylindricalLayout, track: &PerigeeCircle, superlayer: u8) -> Vec<WireHit> {
        let raw: Vec<RawHit> = layout
            .layers_of_superlayer(superlayer)
            .map(|layer| {
                let point = track.position_at(layout.layer_radius(layer));
                let line = layout.nearest_wire(layer, &point, 0.0).expect("wire");
                RawHit {
                    layer,
                    wire: line.id.wire,
                    superlayer,
                    position: [line.reference.x, line.reference.y],
                    drift_length: track.signed_distance(&line.reference).abs(),
                    drift_length_variance: 1e-4,
                    right_left: None,
                }
            })
            .collect();
        build_wire_hits(&raw, layout)
    }

    #[test]
    fn facet_path_becomes_a_segment_on_the_track() {
        let layout = CylindricalLayout::new(LayoutParams::default()).unwrap();
        let track = PerigeeCircle::new(0.005, 1.1, 0.0);
        let hits = superlayer_hits(&layout, &track, 2);
        let ids: Vec<HitId> = (0..hits.len()).collect();
        let neighborhood = HitNeighborhood::build(&hits, &ids, 3.5);
        let mut facets = build_facets(&hits, &neighborhood, 0.01);
        let relations = facet_relations(&facets, 2, 0.3);
        let finder = CellularPathFinder::new(PathFinderParams::default()).unwrap();
        let paths = finder
            .find_paths(&mut facets, &relations, &Deadline::unlimited())
            .unwrap();
        let segments = build_segments(&hits, &facets, &paths, 4);

        let longest = segments.iter().max_by_key(|s| s.len()).expect("segment");
        assert_eq!(longest.len(), hits.len());
        assert_eq!(longest.superlayer(), 2);
        assert!(longest.hits().windows(2).all(|w| hits[w[0]].layer() < hits[w[1]].layer()));
        for point in longest.touch_points() {
            assert!(track.signed_distance(point).abs() < 0.05);
        }
        let mirrored = longest.mirrored_touch_points(&hits);
        for ((&h, p), m) in longest.hits().iter().zip(longest.touch_points()).zip(&mirrored) {
            let wire = hits[h].reference_position();
            assert!(((p + m) * 0.5 - wire).norm() < 1e-12);
        }
    }

    #[test]
    fn short_paths_are_dropped() {
        let layout = CylindricalLayout::new(LayoutParams::default()).unwrap();
        let track = PerigeeCircle::new(0.0, 0.3, 0.0);
        let hits = superlayer_hits(&layout, &track, 0);
        let ids: Vec<HitId> = (0..hits.len()).collect();
        let neighborhood = HitNeighborhood::build(&hits, &ids, 3.5);
        let facets = build_facets(&hits, &neighborhood, 0.01);
        let single = vec![vec![0]];
        assert!(build_segments(&hits, &facets, &single, 4).is_empty());
        assert_eq!(build_segments(&hits, &facets, &single, 3).len(), 1);
    }
}
