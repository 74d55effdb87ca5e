//! Item-in-box predicates.
//!
//! Both predicates are sound: an item lying exactly on some trajectory inside
//! the box is never rejected, at any depth.

use super::boxes::ParamBounds;
use crate::angle::lift_into;
use crate::trajectory::PerigeeCircle;
use nalgebra::Vector2;
use std::f64::consts::FRAC_PI_2;

/// Decides whether an item is compatible with some parameter point in a box.
pub trait HoughPredicate<const N: usize> {
    type Item;

    fn contains(&self, item: &Self::Item, bounds: &ParamBounds<N>) -> bool;
}

/// Axial hit as seen by the (φ0, curvature, impact) search.
#[derive(Clone, Copy, Debug)]
pub struct AxialHitItem {
    pub position: Vector2<f64>,
    pub drift_length: f64,
}

/// Range of the signed distance `D` of `position` over a (φ0, κ, d0) box.
///
/// `D` is linear in κ and quadratic in d0, and depends on φ0 only through
/// `X·n`, whose extrema sit at `atan2(y, x) ± π/2`. Evaluating the corners
/// plus the interior stationary points therefore brackets `D` exactly.
pub fn signed_distance_range(position: &Vector2<f64>, bounds: &ParamBounds<3>) -> (f64, f64) {
    let (phi_lo, phi_hi) = bounds[0];
    let (k_lo, k_hi) = bounds[1];
    let (d_lo, d_hi) = bounds[2];

    let mut phis = [phi_lo, phi_hi, 0.0, 0.0];
    let mut n_phi = 2;
    let alpha = position.y.atan2(position.x);
    for extremum in [alpha + FRAC_PI_2, alpha - FRAC_PI_2] {
        let lifted = lift_into(extremum, phi_lo);
        if lifted <= phi_hi {
            phis[n_phi] = lifted;
            n_phi += 1;
        }
    }

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &phi in &phis[..n_phi] {
        let along_normal = -position.x * phi.sin() + position.y * phi.cos();
        for k in [k_lo, k_hi] {
            let mut impacts = [d_lo, d_hi, 0.0];
            let mut n_impact = 2;
            if k.abs() > 1e-15 {
                let stationary = along_normal - 1.0 / k;
                if stationary > d_lo && stationary < d_hi {
                    impacts[2] = stationary;
                    n_impact = 3;
                }
            }
            for &d0 in &impacts[..n_impact] {
                let circle = PerigeeCircle {
                    curvature: k,
                    phi0: phi,
                    impact: d0,
                };
                let dist = circle.signed_distance(position);
                lo = lo.min(dist);
                hi = hi.max(dist);
            }
        }
    }
    (lo, hi)
}

/// Largest `X·t(φ0)` over `φ0 ∈ [phi_lo, phi_hi]`, with `t` the direction
/// of flight at the perigee. Positive for points ahead of the perigee on the
/// outgoing half turn.
pub fn max_forward_projection(position: &Vector2<f64>, phi_lo: f64, phi_hi: f64) -> f64 {
    let alpha = position.y.atan2(position.x);
    if lift_into(alpha, phi_lo) <= phi_hi {
        return position.norm();
    }
    let along = |phi: f64| position.x * phi.cos() + position.y * phi.sin();
    along(phi_lo).max(along(phi_hi))
}

/// Keeps a hit when `D − l` or `D + l` can vanish (within `tolerance`)
/// inside the box and the hit can lie ahead of the perigee. The second test
/// removes the reversed copy `(−κ, φ0 + π, −d0)` of every trajectory.
/// Axes: (φ0, curvature, impact).
#[derive(Clone, Copy, Debug)]
pub struct AxialHitPredicate {
    pub tolerance: f64,
}

impl HoughPredicate<3> for AxialHitPredicate {
    type Item = AxialHitItem;

    fn contains(&self, item: &AxialHitItem, bounds: &ParamBounds<3>) -> bool {
        let (phi_lo, phi_hi) = bounds[0];
        if max_forward_projection(&item.position, phi_lo, phi_hi) < -self.tolerance {
            return false;
        }
        let (lo, hi) = signed_distance_range(&item.position, bounds);
        let l = item.drift_length;
        let t = self.tolerance;
        (lo <= l + t && hi >= l - t) || (lo <= -l + t && hi >= -l - t)
    }
}

/// Reconstructed (arc length, z) position of a stereo hit along a track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SzPoint {
    pub arc_length: f64,
    pub z: f64,
}

/// Stereo hit with its one or two right/left reconstructions.
#[derive(Clone, Debug, Default)]
pub struct StereoHitItem {
    pub points: Vec<SzPoint>,
}

/// Keeps a stereo hit when `z − z0 − tanλ·s` changes sign (within
/// `tolerance`) over the box for at least one reconstruction.
/// Axes: (z0, tanλ).
#[derive(Clone, Copy, Debug)]
pub struct StereoHitPredicate {
    pub tolerance: f64,
}

impl HoughPredicate<2> for StereoHitPredicate {
    type Item = StereoHitItem;

    fn contains(&self, item: &StereoHitItem, bounds: &ParamBounds<2>) -> bool {
        let (z0_lo, z0_hi) = bounds[0];
        let (tl_lo, tl_hi) = bounds[1];
        item.points.iter().any(|p| {
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for z0 in [z0_lo, z0_hi] {
                for tl in [tl_lo, tl_hi] {
                    let residual = p.z - z0 - tl * p.arc_length;
                    lo = lo.min(residual);
                    hi = hi.max(residual);
                }
            }
            lo <= self.tolerance && hi >= -self.tolerance
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn range_brackets_every_interior_point() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let position = Vector2::new(rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0));
            let phi_lo = rng.gen_range(-3.2..3.0);
            let bounds: ParamBounds<3> = [
                (phi_lo, phi_lo + rng.gen_range(0.0..1.5)),
                (-0.05, rng.gen_range(-0.05..0.05)),
                (-2.0, rng.gen_range(-2.0..2.0)),
            ];
            let bounds: ParamBounds<3> = [
                bounds[0],
                (bounds[1].0.min(bounds[1].1), bounds[1].0.max(bounds[1].1)),
                (bounds[2].0.min(bounds[2].1), bounds[2].0.max(bounds[2].1)),
            ];
            let (lo, hi) = signed_distance_range(&position, &bounds);
            for _ in 0..50 {
                let circle = PerigeeCircle {
                    phi0: rng.gen_range(bounds[0].0..=bounds[0].1),
                    curvature: rng.gen_range(bounds[1].0..=bounds[1].1),
                    impact: rng.gen_range(bounds[2].0..=bounds[2].1),
                };
                let d = circle.signed_distance(&position);
                assert!(d >= lo - 1e-9 && d <= hi + 1e-9, "{d} outside [{lo}, {hi}]");
            }
        }
    }

    #[test]
    fn hit_on_trajectory_is_contained() {
        let truth = PerigeeCircle::new(0.02, 0.7, 0.0);
        let point = truth.position_at(40.0);
        let t = truth.tangent_at(40.0);
        let wire = point + Vector2::new(-t.y, t.x) * 0.4;
        let item = AxialHitItem {
            position: wire,
            drift_length: 0.4,
        };
        let predicate = AxialHitPredicate { tolerance: 0.0 };
        let tight = [(0.69, 0.71), (0.0199, 0.0201), (0.0, 0.0)];
        assert!(predicate.contains(&item, &tight));
        let elsewhere = [(1.5, 1.6), (0.0199, 0.0201), (0.0, 0.0)];
        assert!(!predicate.contains(&item, &elsewhere));
    }

    #[test]
    fn reversed_trajectory_is_rejected() {
        let truth = PerigeeCircle::new(0.02, 0.7, 0.0);
        let point = truth.position_at(40.0);
        let t = truth.tangent_at(40.0);
        let item = AxialHitItem {
            position: point + Vector2::new(-t.y, t.x) * 0.4,
            drift_length: 0.4,
        };
        let predicate = AxialHitPredicate { tolerance: 0.03 };
        let forward = [(0.69, 0.71), (0.0199, 0.0201), (0.0, 0.0)];
        assert!(predicate.contains(&item, &forward));
        let reversed = truth.reversed();
        let phi = crate::angle::wrap_angle(reversed.phi0);
        let backward = [(phi - 0.01, phi + 0.01), (-0.0201, -0.0199), (0.0, 0.0)];
        let (lo, hi) = signed_distance_range(&item.position, &backward);
        assert!(lo <= 0.4 + 0.03 && hi >= -0.4 - 0.03, "D range [{lo}, {hi}]");
        assert!(!predicate.contains(&item, &backward));
    }

    #[test]
    fn forward_projection_covers_the_whole_phi_range() {
        let p = Vector2::new(10.0, 0.0);
        assert!((max_forward_projection(&p, -0.5, 0.5) - 10.0).abs() < 1e-12);
        assert!(max_forward_projection(&p, 2.0, 2.5) < 0.0);
        assert!((max_forward_projection(&p, 1.0, 2.0) - 10.0 * 1.0f64.cos()).abs() < 1e-12);
    }

    #[test]
    fn stereo_point_on_line_is_contained() {
        let item = StereoHitItem {
            points: vec![
                SzPoint { arc_length: 50.0, z: 30.0 },
                SzPoint { arc_length: 50.0, z: -80.0 },
            ],
        };
        let predicate = StereoHitPredicate { tolerance: 0.5 };
        // z0 = 5, tanλ = 0.5 passes through the first reconstruction.
        assert!(predicate.contains(&item, &[(4.0, 6.0), (0.45, 0.55)]));
        assert!(!predicate.contains(&item, &[(10.0, 12.0), (0.45, 0.55)]));
    }
}
