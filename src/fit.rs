//! Coarse circle and line fits used to rate and seed candidates.
//!
//! - `fit_circle`: non-iterative Karimäki fit over weighted points.
//! - `refit_with_drift`: moves every wire by its drift length onto a first-pass
//!   circle and fits again.
//! - `fit_drift_circles`: Gauss-Newton over `(κ, φ0, d0)` minimising
//!   `Σ w (|D(wire)| − l)²`, independent of the right/left passage.
//! - `fit_sz_line`: weighted least squares `z = z0 + tanλ·s`.
//!
//! These are seed-quality estimates, not a precision track fit.

use crate::trajectory::{PerigeeCircle, SzLine};
use nalgebra::{Matrix2, Matrix3, Vector2, Vector3};
use serde::Serialize;

const MIN_VARIANCE: f64 = 1e-8;

/// Outcome of a circle fit.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct CircleFit {
    pub circle: PerigeeCircle,
    pub chi2: f64,
    pub ndf: usize,
}

impl CircleFit {
    pub fn reduced_chi2(&self) -> f64 {
        if self.ndf == 0 {
            self.chi2
        } else {
            self.chi2 / self.ndf as f64
        }
    }
}

/// Wire position with its drift circle.
#[derive(Clone, Copy, Debug)]
pub struct DriftObservation {
    pub position: Vector2<f64>,
    pub drift_length: f64,
    pub variance: f64,
}

impl DriftObservation {
    #[inline]
    pub fn weight(&self) -> f64 {
        1.0 / self.variance.max(MIN_VARIANCE)
    }

    /// Distance between the drift circle and the trajectory, signed so that
    /// positive values mean the trajectory misses the drift circle.
    #[inline]
    pub fn residual(&self, circle: &PerigeeCircle) -> f64 {
        circle.signed_distance(&self.position).abs() - self.drift_length
    }
}

/// Karimäki circle fit. Returns `None` for fewer than three points or
/// degenerate configurations. The circle is oriented so that the points lie
/// ahead of the perigee.
pub fn fit_circle(points: &[Vector2<f64>], weights: Option<&[f64]>) -> Option<CircleFit> {
    let n = points.len();
    if n < 3 || weights.map_or(false, |w| w.len() != n) {
        return None;
    }
    let weight_at = |i: usize| weights.map_or(1.0, |w| w[i]);

    let mut sw = 0.0;
    let (mut mx, mut my, mut mxx, mut mxy, mut myy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    let (mut mr2, mut mxr, mut myr, mut mr4) = (0.0, 0.0, 0.0, 0.0);
    for (i, p) in points.iter().enumerate() {
        let w = weight_at(i);
        let r2 = p.norm_squared();
        sw += w;
        mx += w * p.x;
        my += w * p.y;
        mxx += w * p.x * p.x;
        mxy += w * p.x * p.y;
        myy += w * p.y * p.y;
        mr2 += w * r2;
        mxr += w * p.x * r2;
        myr += w * p.y * r2;
        mr4 += w * r2 * r2;
    }
    if !(sw > 0.0) {
        return None;
    }
    for m in [
        &mut mx, &mut my, &mut mxx, &mut mxy, &mut myy, &mut mr2, &mut mxr, &mut myr, &mut mr4,
    ] {
        *m /= sw;
    }

    let cxx = mxx - mx * mx;
    let cxy = mxy - mx * my;
    let cyy = myy - my * my;
    let cxr = mxr - mx * mr2;
    let cyr = myr - my * mr2;
    let crr = mr4 - mr2 * mr2;
    if crr.abs() < 1e-12 {
        return None;
    }

    let q1 = crr * cxy - cxr * cyr;
    let q2 = crr * (cxx - cyy) - cxr * cxr + cyr * cyr;
    let phi = 0.5 * (2.0 * q1).atan2(q2);
    let (sin, cos) = phi.sin_cos();
    let kappa = (sin * cxr - cos * cyr) / crr;
    let delta = -kappa * mr2 + sin * mx - cos * my;
    let disc = 1.0 - 4.0 * delta * kappa;
    if !(disc >= 0.0) {
        return None;
    }
    let root = disc.sqrt();
    let rho = 2.0 * kappa / root;
    let dist = 2.0 * delta / (1.0 + root);
    let chi2 = sw
        * (1.0 + rho * dist).powi(2)
        * (sin * sin * cxx - 2.0 * sin * cos * cxy + cos * cos * cyy - kappa * kappa * crr);

    let circle = PerigeeCircle::new(rho, phi + std::f64::consts::PI, dist);
    if !(circle.curvature.is_finite() && circle.phi0.is_finite() && circle.impact.is_finite()) {
        return None;
    }
    Some(CircleFit {
        circle: circle.oriented_along(points),
        chi2: chi2.max(0.0),
        ndf: n - 3,
    })
}

/// Moves each wire onto `first` by its drift length and refits with
/// inverse-variance weights.
pub fn refit_with_drift(
    observations: &[DriftObservation],
    first: &PerigeeCircle,
) -> Option<CircleFit> {
    let mut points = Vec::with_capacity(observations.len());
    let mut weights = Vec::with_capacity(observations.len());
    for obs in observations {
        let dist = first.signed_distance(&obs.position);
        let grad = first.gradient(&obs.position);
        let norm = grad.norm();
        let shifted = if norm > 0.0 {
            obs.position - grad * (dist.signum() * obs.drift_length / norm)
        } else {
            obs.position
        };
        points.push(shifted);
        weights.push(obs.weight());
    }
    fit_circle(&points, Some(&weights))
}

/// Gauss-Newton fit of a circle tangent to the drift circles.
///
/// The objective ignores the right/left passage, so it converges to the
/// nearest local minimum of `start`. Callers with an ambiguous start should
/// try several and keep the best.
pub fn fit_drift_circles(
    observations: &[DriftObservation],
    start: &PerigeeCircle,
    iterations: usize,
) -> Option<CircleFit> {
    let n = observations.len();
    if n < 3 {
        return None;
    }
    let mut circle = *start;
    for _ in 0..iterations {
        let mut normal = Matrix3::<f64>::zeros();
        let mut rhs = Vector3::<f64>::zeros();
        for obs in observations {
            let dist = circle.signed_distance(&obs.position);
            let sign = if dist >= 0.0 { 1.0 } else { -1.0 };
            let residual = sign * dist - obs.drift_length;
            let jac = circle.parameter_jacobian(&obs.position);
            let j = Vector3::new(sign * jac[0], sign * jac[1], sign * jac[2]);
            let w = obs.weight();
            normal += j * j.transpose() * w;
            rhs -= j * (residual * w);
        }
        let damping = 1e-12 * normal.trace().max(1e-300);
        normal += Matrix3::identity() * damping;
        let step = normal.lu().solve(&rhs)?;
        if !step.iter().all(|v| v.is_finite()) {
            return None;
        }
        circle = PerigeeCircle {
            curvature: circle.curvature + step[0],
            phi0: circle.phi0 + step[1],
            impact: circle.impact + step[2],
        };
        if step[0].abs() < 1e-12 && step[1].abs() < 1e-10 && step[2].abs() < 1e-8 {
            break;
        }
    }

    let circle = PerigeeCircle::new(circle.curvature, circle.phi0, circle.impact);
    let chi2: f64 = observations
        .iter()
        .map(|obs| obs.residual(&circle).powi(2) * obs.weight())
        .sum();
    if !chi2.is_finite() {
        return None;
    }
    let positions: Vec<Vector2<f64>> = observations.iter().map(|o| o.position).collect();
    Some(CircleFit {
        circle: circle.oriented_along(&positions),
        chi2,
        ndf: n - 3,
    })
}

/// Weighted straight-line fit in the s-z plane. Needs two distinct arc
/// lengths.
pub fn fit_sz_line(points: &[(f64, f64)], weights: Option<&[f64]>) -> Option<SzLine> {
    if points.len() < 2 || weights.map_or(false, |w| w.len() != points.len()) {
        return None;
    }
    let mut normal = Matrix2::<f64>::zeros();
    let mut rhs = Vector2::<f64>::zeros();
    for (i, &(s, z)) in points.iter().enumerate() {
        let w = weights.map_or(1.0, |w| w[i]);
        normal[(0, 0)] += w;
        normal[(0, 1)] += w * s;
        normal[(1, 1)] += w * s * s;
        rhs[0] += w * z;
        rhs[1] += w * s * z;
    }
    normal[(1, 0)] = normal[(0, 1)];
    if normal.determinant().abs() < 1e-9 * normal[(1, 1)].abs().max(1.0) {
        return None;
    }
    let solution = normal.try_inverse()? * rhs;
    Some(SzLine {
        z0: solution[0],
        tan_lambda: solution[1],
    })
}
