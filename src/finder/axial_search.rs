//! Global axial track search over (φ0, curvature, impact).

use super::params::{AxialHoughParams, PostprocessParams};
use super::postprocess::{fit_hits, remove_outliers, sort_radially};
use super::AxialTrack;
use crate::deadline::Deadline;
use crate::diagnostics::AxialHoughStage;
use crate::error::Result;
use crate::hits::{HitId, WireHit};
use crate::hough::{
    select_candidates_with, AxialHitItem, AxialHitPredicate, HoughCandidate, HoughTree,
};
use crate::trajectory::PerigeeCircle;
use crate::types::TrackOrigin;
use log::debug;
use nalgebra::Vector2;

/// Hough tree passes over the usable axial hits, each followed by a
/// drift-circle fit of every accepted region.
#[derive(Clone, Debug)]
pub struct AxialHoughSearch {
    tree: HoughTree<3>,
    predicate: AxialHitPredicate,
    thresholds: Vec<usize>,
}

impl AxialHoughSearch {
    pub fn new(params: &AxialHoughParams) -> Result<Self> {
        params.validate()?;
        let axes = [
            params.phi0.build("phi0")?,
            params.curvature.build("curvature")?,
            params.impact.build("impact")?,
        ];
        let divisions = [
            params.phi0.divisions,
            params.curvature.divisions,
            params.impact.divisions,
        ];
        Ok(Self {
            tree: HoughTree::new(axes, divisions, params.max_level, params.min_items_per_leaf)?,
            predicate: AxialHitPredicate {
                tolerance: params.tolerance,
            },
            thresholds: params.thresholds(),
        })
    }

    /// Finds axial tracks; their hits are taken. Long tracks are searched
    /// first; every later pass lowers the hit threshold and only sees the
    /// hits left over.
    pub fn run(
        &self,
        hits: &mut [WireHit],
        cleanup: &PostprocessParams,
        fit_iterations: usize,
        deadline: &Deadline,
    ) -> Result<(Vec<AxialTrack>, AxialHoughStage)> {
        let items: Vec<AxialHitItem> = hits.iter().map(axial_item).collect();
        let mut stage = AxialHoughStage {
            input_hits: usable_axial(hits).len(),
            ..AxialHoughStage::default()
        };

        let mut tracks = Vec::new();
        for &limit in &self.thresholds {
            let candidates = usable_axial(hits);
            let outcome = self.tree.search_with_min_items(
                &self.predicate,
                &items,
                &candidates,
                limit,
                deadline,
                "axial hough",
            )?;
            stage.tree.accumulate(&outcome.stats);
            stage.passes += 1;

            let mut taken: Vec<bool> = hits.iter().map(|hit| !hit.cell().is_usable()).collect();
            let mut rejected = 0;
            let found = select_candidates_with(&outcome.leaves, limit, &mut taken, |region| {
                let track = fit_region(hits, region, cleanup, fit_iterations);
                rejected += usize::from(track.is_none());
                track
            });
            stage.candidates += found.len() + rejected;
            debug!(
                "axial hough pass threshold={limit}: {} candidates -> {} tracks",
                found.len() + rejected,
                found.len()
            );
            for track in found {
                for &h in &track.hits {
                    hits[h].cell_mut().take();
                }
                tracks.push(track);
            }
        }
        stage.tracks = tracks.len();
        Ok((tracks, stage))
    }
}

fn usable_axial(hits: &[WireHit]) -> Vec<HitId> {
    hits.iter()
        .filter(|hit| hit.is_axial() && hit.cell().is_usable())
        .map(WireHit::id)
        .collect()
}

/// Fits a Hough region seeded from its centre, oriented along its hits, and
/// removes outliers. `None` when a fit fails.
fn fit_region(
    hits: &[WireHit],
    region: &HoughCandidate<3>,
    cleanup: &PostprocessParams,
    fit_iterations: usize,
) -> Option<AxialTrack> {
    let [phi0, curvature, impact] = region.center();
    let positions: Vec<Vector2<f64>> =
        region.items.iter().map(|&h| hits[h].reference_position()).collect();
    let start = PerigeeCircle::new(curvature, phi0, impact).oriented_along(&positions);
    let first = fit_hits(hits, &region.items, &start, fit_iterations)?;
    let kept = remove_outliers(hits, &region.items, &first.circle, cleanup);
    let fit = if kept.len() == region.items.len() {
        first
    } else {
        fit_hits(hits, &kept, &first.circle, fit_iterations)?
    };
    let mut track_hits = kept;
    sort_radially(hits, &mut track_hits);
    debug!(
        "axial hough region level={} hits={} -> track hits={} kappa={:.5} phi0={:.4}",
        region.level,
        region.items.len(),
        track_hits.len(),
        fit.circle.curvature,
        fit.circle.phi0
    );
    Some(AxialTrack {
        hits: track_hits,
        fit,
        origin: TrackOrigin::AxialHough,
    })
}

/// Hough item of an axial hit.
pub fn axial_item(hit: &WireHit) -> AxialHitItem {
    AxialHitItem {
        position: hit.reference_position(),
        drift_length: hit.drift_length(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hits::{build_wire_hits, CylindricalLayout, LayoutParams, RawHit};
    use crate::synthetic::{track_hits, TruthTrack};

    fn truth(curvature: f64, phi0: f64) -> TruthTrack {
        TruthTrack {
            curvature,
            phi0,
            impact: 0.0,
            z0: 0.0,
            tan_lambda: 0.0,
        }
    }

    #[test]
    fn long_and_short_tracks_are_found_in_separate_passes() {
        let layout = CylindricalLayout::new(LayoutParams::default()).unwrap();
        let long = truth(0.02, 0.7);
        let short = truth(-0.03, -2.0);
        let mut raw: Vec<RawHit> = track_hits(&layout, &long);
        let split = raw.len();
        raw.extend(track_hits(&layout, &short));
        let mut hits = build_wire_hits(&raw, &layout);
        let long_axial = hits[..split].iter().filter(|h| h.is_axial()).count();
        let short_axial = hits[split..].iter().filter(|h| h.is_axial()).count();
        assert!(long_axial >= 24 && (14..24).contains(&short_axial), "{long_axial} {short_axial}");

        let params = AxialHoughParams::default();
        let search = AxialHoughSearch::new(&params).unwrap();
        let (tracks, stage) = search
            .run(&mut hits, &PostprocessParams::default(), 10, &Deadline::unlimited())
            .unwrap();
        assert_eq!(stage.passes, 2);
        assert_eq!(tracks.len(), 2);
        // The long track is complete after the first pass.
        assert!(tracks[0].hits.iter().all(|&h| h < split));
        assert_eq!(tracks[0].hits.len(), long_axial);
        assert!(tracks[1].hits.iter().all(|&h| h >= split));
        for (track, truth) in tracks.iter().zip([long, short]) {
            assert!(
                (track.fit.circle.curvature - truth.curvature).abs() < 1e-3,
                "curvature {} vs {}",
                track.fit.circle.curvature,
                truth.curvature
            );
        }
        assert!(hits.iter().filter(|h| h.is_axial()).all(|h| h.cell().is_taken()));
    }
}
