//! Stereo hit assignment.
//!
//! Every stereo hit is reconstructed along an axial track by sliding along
//! its wire until the drift circle touches the trajectory. The (s, z) points
//! feed a (z0, tanλ) Hough search; the best region becomes the track's stereo
//! hits and a weighted line fit gives z0 and tanλ.

use super::params::StereoParams;
use crate::deadline::Deadline;
use crate::diagnostics::StereoStage;
use crate::error::Result;
use crate::fit::fit_sz_line;
use crate::hits::{HitId, WireHit};
use crate::hough::{select_candidates, HoughTree, StereoHitItem, StereoHitPredicate, SzPoint};
use crate::trajectory::{PerigeeCircle, SzLine};
use log::debug;

const NEWTON_TOLERANCE: f64 = 1e-6;

/// Solves `D(reference + skew·z) = ±l` for z by Newton iteration from z = 0.
/// Keeps solutions inside the wire's z extent with positive arc length.
pub fn reconstruct_stereo_hit(hit: &WireHit, circle: &PerigeeCircle, iterations: usize) -> StereoHitItem {
    let skew = hit.skew();
    let (z_lo, z_hi) = hit.z_range();
    let mut points = Vec::with_capacity(2);
    for side in [1.0, -1.0] {
        let target = side * hit.drift_length();
        let mut z = 0.0;
        let mut converged = false;
        for _ in 0..iterations {
            let position = hit.position_at_z(z);
            let residual = circle.signed_distance(&position) - target;
            let slope = circle.gradient(&position).dot(&skew);
            if slope.abs() < 1e-12 {
                break;
            }
            let step = residual / slope;
            z -= step;
            if step.abs() < NEWTON_TOLERANCE {
                converged = true;
                break;
            }
        }
        if !converged || !z.is_finite() || z < z_lo || z > z_hi {
            continue;
        }
        let arc_length = circle.arc_length_to(&hit.position_at_z(z));
        if arc_length > 0.0 {
            points.push(SzPoint { arc_length, z });
        }
    }
    StereoHitItem { points }
}

/// Stereo hits attached to one track.
#[derive(Clone, Debug)]
pub struct StereoAssignment {
    pub hits: Vec<HitId>,
    pub line: SzLine,
}

/// Tree search and line fit for the stereo hits of single tracks.
#[derive(Clone, Debug)]
pub struct StereoAssigner {
    tree: HoughTree<2>,
    predicate: StereoHitPredicate,
    iterations: usize,
}

impl StereoAssigner {
    pub fn new(params: &StereoParams) -> Result<Self> {
        params.validate()?;
        let axes = [params.z0.build("z0")?, params.tan_lambda.build("tan_lambda")?];
        let divisions = [params.z0.divisions, params.tan_lambda.divisions];
        Ok(Self {
            tree: HoughTree::new(axes, divisions, params.max_level, params.min_items_per_leaf)?,
            predicate: StereoHitPredicate {
                tolerance: params.tolerance,
            },
            iterations: params.reconstruction_iterations,
        })
    }

    /// Finds the stereo hits of the track `circle` among the usable stereo
    /// hits and takes them. Returns `None` when no region holds enough hits.
    pub fn assign(
        &self,
        hits: &mut [WireHit],
        circle: &PerigeeCircle,
        deadline: &Deadline,
        stage: &mut StereoStage,
    ) -> Result<Option<StereoAssignment>> {
        let mut items = vec![StereoHitItem::default(); hits.len()];
        let mut candidates = Vec::new();
        for hit in hits.iter() {
            if hit.is_axial() || !hit.cell().is_usable() {
                continue;
            }
            let item = reconstruct_stereo_hit(hit, circle, self.iterations);
            if !item.points.is_empty() {
                candidates.push(hit.id());
                items[hit.id()] = item;
            }
        }
        stage.reconstructed_hits += candidates.len();

        let outcome = self
            .tree
            .search(&self.predicate, &items, &candidates, deadline, "stereo hough")?;
        stage.tree_nodes += outcome.stats.nodes;
        let mut taken = vec![false; hits.len()];
        let regions = select_candidates(&outcome.leaves, self.tree.min_items(), &mut taken);
        let Some(best) = regions.first() else {
            return Ok(None);
        };

        let [z0, tan_lambda] = best.center();
        let start = SzLine { z0, tan_lambda };
        let Some((line, assigned)) = self.resolve_line(hits, &items, &best.items, start) else {
            return Ok(None);
        };

        for &h in &assigned {
            hits[h].cell_mut().take();
        }
        stage.tracks_with_stereo += 1;
        stage.assigned_hits += assigned.len();
        debug!(
            "stereo assignment: {} of {} region hits, z0={:.3} tanλ={:.4}",
            assigned.len(),
            best.items.len(),
            line.z0,
            line.tan_lambda
        );
        Ok(Some(StereoAssignment { hits: assigned, line }))
    }

    /// Chooses one reconstruction per hit and fits the s-z line.
    ///
    /// Hits with a single reconstruction near `start` seed the fit. Every
    /// hit then takes the reconstruction closest to the current line and the
    /// line is refitted until the choices settle. Hits further than the
    /// tolerance from the final line are not assigned.
    fn resolve_line(
        &self,
        hits: &[WireHit],
        items: &[StereoHitItem],
        region: &[HitId],
        start: SzLine,
    ) -> Option<(SzLine, Vec<HitId>)> {
        let tolerance = self.predicate.tolerance;
        let unambiguous: Vec<HitId> = region
            .iter()
            .copied()
            .filter(|&h| {
                items[h]
                    .points
                    .iter()
                    .filter(|p| start.residual(p.arc_length, p.z).abs() <= tolerance)
                    .count()
                    == 1
            })
            .collect();
        let seed = if unambiguous.len() >= 3 { &unambiguous[..] } else { region };
        let (mut line, _) = fit_closest(hits, items, seed, &start, tolerance)?;

        let mut previous: Vec<SzPoint> = Vec::new();
        for _ in 0..MAX_REFITS {
            let (next, chosen) = fit_closest(hits, items, region, &line, tolerance)?;
            line = next;
            if chosen == previous {
                break;
            }
            previous = chosen;
        }

        let assigned: Vec<HitId> = region
            .iter()
            .copied()
            .filter(|&h| closest_point(&items[h], &line).map_or(false, |(_, r)| r <= tolerance))
            .collect();
        (assigned.len() >= self.tree.min_items()).then_some((line, assigned))
    }
}

const MAX_REFITS: usize = 10;

/// Reconstruction of `item` closest to `line` with its absolute residual.
fn closest_point(item: &StereoHitItem, line: &SzLine) -> Option<(SzPoint, f64)> {
    item.points
        .iter()
        .map(|p| (*p, line.residual(p.arc_length, p.z).abs()))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Inverse variance of a stereo hit's z, from the drift variance projected
/// through the wire skew.
fn z_weight(hit: &WireHit) -> f64 {
    let skew = hit.skew().norm().max(1e-6);
    skew * skew / hit.drift_length_variance().max(1e-8)
}

/// Weighted line fit through the reconstruction of every hit in `ids`
/// closest to `line`, skipping hits further than `max_residual`. Returns the
/// fitted line and the chosen points.
fn fit_closest(
    hits: &[WireHit],
    items: &[StereoHitItem],
    ids: &[HitId],
    line: &SzLine,
    max_residual: f64,
) -> Option<(SzLine, Vec<SzPoint>)> {
    let mut chosen = Vec::with_capacity(ids.len());
    let mut points = Vec::with_capacity(ids.len());
    let mut weights = Vec::with_capacity(ids.len());
    for &h in ids {
        let Some((point, residual)) = closest_point(&items[h], line) else {
            continue;
        };
        if residual > max_residual {
            continue;
        }
        chosen.push(point);
        points.push((point.arc_length, point.z));
        weights.push(z_weight(&hits[h]));
    }
    let fitted = fit_sz_line(&points, Some(&weights))?;
    Some((fitted, chosen))
}
