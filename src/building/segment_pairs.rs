//! Segment pairs across consecutive axial superlayers and the triple
//! relation linking them into tracks.

use super::segments::Segment;
use crate::angle::{azimuth, azimuth_difference};
use crate::automaton::{build_self_relations, AutomatonCell, AutomatonNode, LayerOrdered, Relation};
use crate::fit::{fit_circle, fit_drift_circles, CircleFit, DriftObservation};
use crate::hits::{HitId, WireHit};
use nalgebra::Vector2;
use std::collections::BTreeMap;

/// Acceptance thresholds for segment pairs.
#[derive(Clone, Copy, Debug)]
pub struct PairCuts {
    pub max_reduced_chi2: f64,
    pub max_phi_gap: f64,
    pub fit_iterations: usize,
}

/// Two segments fitted by one circle.
#[derive(Clone, Debug)]
pub struct SegmentPair {
    inner: usize,
    outer: usize,
    hits: Vec<HitId>,
    superlayer: u8,
    fit: CircleFit,
    cell: AutomatonCell,
}

impl SegmentPair {
    /// Index of the inner segment.
    #[inline]
    pub fn inner(&self) -> usize {
        self.inner
    }

    #[inline]
    pub fn outer(&self) -> usize {
        self.outer
    }

    #[inline]
    pub fn hits(&self) -> &[HitId] {
        &self.hits
    }

    #[inline]
    pub fn fit(&self) -> &CircleFit {
        &self.fit
    }
}

impl LayerOrdered for SegmentPair {
    fn layer(&self) -> u32 {
        u32::from(self.superlayer)
    }
}

impl AutomatonNode for SegmentPair {
    fn cell(&self) -> &AutomatonCell {
        &self.cell
    }

    fn cell_mut(&mut self) -> &mut AutomatonCell {
        &mut self.cell
    }

    fn intrinsic_weight(&self) -> f64 {
        self.hits.len() as f64 - self.fit.reduced_chi2()
    }

    fn hit_ids(&self) -> &[HitId] {
        &self.hits
    }
}

/// Joint fit of two segments.
///
/// Each segment's touch points are tried as reconstructed and mirrored
/// through their wires; every combination seeds a drift-circle fit and the
/// lowest χ² wins.
pub fn fit_segment_pair(
    hits: &[WireHit],
    inner: &Segment,
    outer: &Segment,
    iterations: usize,
) -> Option<CircleFit> {
    let observations: Vec<DriftObservation> = inner
        .hits()
        .iter()
        .chain(outer.hits())
        .map(|&h| hits[h].drift_observation())
        .collect();
    let inner_variants = [inner.touch_points().to_vec(), inner.mirrored_touch_points(hits)];
    let outer_variants = [outer.touch_points().to_vec(), outer.mirrored_touch_points(hits)];

    let mut best: Option<CircleFit> = None;
    for inner_points in &inner_variants {
        for outer_points in &outer_variants {
            let points: Vec<Vector2<f64>> = inner_points.iter().chain(outer_points).copied().collect();
            let Some(seed) = fit_circle(&points, None) else {
                continue;
            };
            let Some(fit) = fit_drift_circles(&observations, &seed.circle, iterations) else {
                continue;
            };
            if best.as_ref().map_or(true, |b| fit.chi2 < b.chi2) {
                best = Some(fit);
            }
        }
    }
    best
}

/// Maps every axial superlayer present in `hits` to the next one outwards.
pub fn next_axial_superlayers(hits: &[WireHit]) -> BTreeMap<u8, u8> {
    let mut present: Vec<u8> = hits.iter().filter(|h| h.is_axial()).map(WireHit::superlayer).collect();
    present.sort_unstable();
    present.dedup();
    present.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Pairs every segment with the segments of the next axial superlayer that
/// start within `max_phi_gap` of its end and fit one circle with it.
pub fn build_segment_pairs(
    hits: &[WireHit],
    segments: &[Segment],
    next_superlayer: &BTreeMap<u8, u8>,
    cuts: &PairCuts,
) -> Vec<SegmentPair> {
    let window = next_superlayer
        .iter()
        .map(|(&a, &b)| u32::from(b - a))
        .max()
        .unwrap_or(0);
    let candidates = build_self_relations(segments, window, |a, b| {
        if next_superlayer.get(&a.superlayer()) != Some(&b.superlayer()) {
            return None;
        }
        let (_, inner_end) = a.ends()?;
        let (outer_start, _) = b.ends()?;
        let gap = azimuth_difference(
            azimuth(&hits[inner_end].reference_position()),
            azimuth(&hits[outer_start].reference_position()),
        );
        (gap.abs() <= cuts.max_phi_gap).then_some(0.0)
    });

    let mut pairs = Vec::new();
    for candidate in candidates {
        let (inner, outer) = (&segments[candidate.from], &segments[candidate.to]);
        let Some(fit) = fit_segment_pair(hits, inner, outer, cuts.fit_iterations) else {
            continue;
        };
        if !(fit.reduced_chi2() <= cuts.max_reduced_chi2) {
            continue;
        }
        pairs.push(SegmentPair {
            inner: candidate.from,
            outer: candidate.to,
            hits: inner.hits().iter().chain(outer.hits()).copied().collect(),
            superlayer: inner.superlayer(),
            fit,
            cell: AutomatonCell::new(),
        });
    }
    pairs
}

/// Triple relations `(A, B) → (B, C)` with curvatures within
/// `max_curvature_difference`. The weight subtracts the hits of the shared
/// segment, which both pairs count.
pub fn pair_relations(
    pairs: &[SegmentPair],
    segments: &[Segment],
    layer_window: u32,
    max_curvature_difference: f64,
) -> Vec<Relation> {
    build_self_relations(pairs, layer_window, |a, b| {
        if a.outer != b.inner {
            return None;
        }
        let difference = (a.fit.circle.curvature - b.fit.circle.curvature).abs();
        (difference <= max_curvature_difference).then(|| {
            -(segments[a.outer].len() as f64) - difference / max_curvature_difference
        })
    })
}
