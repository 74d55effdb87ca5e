//! Perigee circle and s-z line models.
//!
//! A circle is described by its perigee parameters: signed curvature κ, the
//! direction of flight φ0 at the point of closest approach to the origin, and
//! the signed impact parameter d0. With `t = (cos φ0, sin φ0)` and the left
//! normal `n = (-sin φ0, cos φ0)` the perigee sits at `d0·n` and the circle
//! centre at `(d0 + 1/κ)·n`.
//!
//! The signed distance used everywhere in the crate is
//!
//! ```text
//! D(X) = (1 + κ d0) X·n − κ/2 |X|² − d0 (1 + κ d0 / 2)
//! ```
//!
//! which vanishes exactly on the circle, is positive on the left of the
//! direction of flight, and stays finite as κ → 0 (straight lines).

use crate::angle::wrap_angle;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

const STRAIGHT_CURVATURE: f64 = 1e-12;

/// Circle in perigee parametrisation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerigeeCircle {
    pub curvature: f64,
    pub phi0: f64,
    pub impact: f64,
}

impl PerigeeCircle {
    pub fn new(curvature: f64, phi0: f64, impact: f64) -> Self {
        Self {
            curvature,
            phi0: wrap_angle(phi0),
            impact,
        }
    }

    /// Unit direction of flight at the perigee.
    #[inline]
    pub fn tangent(&self) -> Vector2<f64> {
        Vector2::new(self.phi0.cos(), self.phi0.sin())
    }

    /// Unit left normal at the perigee.
    #[inline]
    pub fn normal(&self) -> Vector2<f64> {
        Vector2::new(-self.phi0.sin(), self.phi0.cos())
    }

    #[inline]
    pub fn is_straight(&self) -> bool {
        self.curvature.abs() < STRAIGHT_CURVATURE
    }

    pub fn perigee(&self) -> Vector2<f64> {
        self.normal() * self.impact
    }

    /// Circle centre, `None` for straight lines.
    pub fn center(&self) -> Option<Vector2<f64>> {
        if self.is_straight() {
            None
        } else {
            Some(self.normal() * (self.impact + 1.0 / self.curvature))
        }
    }

    /// Signed distance approximation `D(X)`, exact on the circle.
    #[inline]
    pub fn signed_distance(&self, point: &Vector2<f64>) -> f64 {
        let k = self.curvature;
        let d0 = self.impact;
        (1.0 + k * d0) * point.dot(&self.normal())
            - 0.5 * k * point.norm_squared()
            - d0 * (1.0 + 0.5 * k * d0)
    }

    /// Gradient of `D` with respect to the point.
    #[inline]
    pub fn gradient(&self, point: &Vector2<f64>) -> Vector2<f64> {
        self.normal() * (1.0 + self.curvature * self.impact) - point * self.curvature
    }

    /// Derivatives of `D(point)` with respect to `(curvature, phi0, impact)`.
    pub fn parameter_jacobian(&self, point: &Vector2<f64>) -> [f64; 3] {
        let k = self.curvature;
        let d0 = self.impact;
        let xn = point.dot(&self.normal());
        let xt = point.dot(&self.tangent());
        [
            d0 * xn - 0.5 * point.norm_squared() - 0.5 * d0 * d0,
            -(1.0 + k * d0) * xt,
            k * xn - 1.0 - k * d0,
        ]
    }

    /// Arc length from the perigee to the point's projection onto the circle,
    /// positive in the direction of flight.
    pub fn arc_length_to(&self, point: &Vector2<f64>) -> f64 {
        let xt = point.dot(&self.tangent());
        if self.is_straight() {
            return xt;
        }
        let k = self.curvature;
        let xn = point.dot(&self.normal());
        (k * xt).atan2(1.0 + k * (self.impact - xn)) / k
    }

    /// Point on the circle after travelling `arc_length` from the perigee.
    pub fn position_at(&self, arc_length: f64) -> Vector2<f64> {
        let (along, across) = if self.is_straight() {
            (arc_length, 0.0)
        } else {
            let k = self.curvature;
            let phase = k * arc_length;
            (phase.sin() / k, (1.0 - phase.cos()) / k)
        };
        self.normal() * (self.impact + across) + self.tangent() * along
    }

    /// Direction of flight after travelling `arc_length` from the perigee.
    pub fn tangent_at(&self, arc_length: f64) -> Vector2<f64> {
        let phi = self.phi0 + self.curvature * arc_length;
        Vector2::new(phi.cos(), phi.sin())
    }

    /// Same geometric circle traversed in the opposite direction.
    pub fn reversed(&self) -> Self {
        Self::new(-self.curvature, self.phi0 + std::f64::consts::PI, -self.impact)
    }

    /// Orients the circle so that the mean arc length of `points` is
    /// non-negative, i.e. the points lie ahead of the perigee.
    pub fn oriented_along(&self, points: &[Vector2<f64>]) -> Self {
        if points.is_empty() {
            return *self;
        }
        let total: f64 = points.iter().map(|p| self.arc_length_to(p)).sum();
        if total < 0.0 {
            self.reversed()
        } else {
            *self
        }
    }
}

/// Straight line in the (arc length, z) plane: `z = z0 + tanλ·s`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SzLine {
    pub z0: f64,
    pub tan_lambda: f64,
}

impl SzLine {
    #[inline]
    pub fn z_at(&self, arc_length: f64) -> f64 {
        self.z0 + self.tan_lambda * arc_length
    }

    #[inline]
    pub fn residual(&self, arc_length: f64, z: f64) -> f64 {
        z - self.z_at(arc_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn signed_distance_vanishes_on_circle() {
        for &(k, d0) in &[(0.02, 0.0), (-0.03, 0.5), (1e-14, -0.3), (0.01, -2.0)] {
            let circle = PerigeeCircle::new(k, 0.7, d0);
            for s in [5.0, 30.0, 60.0] {
                let p = circle.position_at(s);
                assert!(approx_eq(circle.signed_distance(&p), 0.0, 1e-9));
                assert!(approx_eq(circle.arc_length_to(&p), s, 1e-7));
            }
        }
    }

    #[test]
    fn signed_distance_is_positive_on_the_left() {
        let circle = PerigeeCircle::new(0.01, 0.3, 0.0);
        let p = circle.position_at(20.0);
        let t = circle.tangent_at(20.0);
        let left = p + Vector2::new(-t.y, t.x) * 0.1;
        let right = p - Vector2::new(-t.y, t.x) * 0.1;
        assert!(approx_eq(circle.signed_distance(&left), 0.1, 1e-3));
        assert!(approx_eq(circle.signed_distance(&right), -0.1, 1e-3));
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let circle = PerigeeCircle::new(0.015, -1.2, 0.4);
        let p = Vector2::new(12.0, -30.0);
        let grad = circle.gradient(&p);
        let h = 1e-6;
        let dx = (circle.signed_distance(&(p + Vector2::new(h, 0.0)))
            - circle.signed_distance(&(p - Vector2::new(h, 0.0))))
            / (2.0 * h);
        let dy = (circle.signed_distance(&(p + Vector2::new(0.0, h)))
            - circle.signed_distance(&(p - Vector2::new(0.0, h))))
            / (2.0 * h);
        assert!(approx_eq(grad.x, dx, 1e-6));
        assert!(approx_eq(grad.y, dy, 1e-6));
    }

    #[test]
    fn parameter_jacobian_matches_finite_difference() {
        let p = Vector2::new(-20.0, 35.0);
        let base = PerigeeCircle::new(0.01, 2.0, 0.2);
        let jac = base.parameter_jacobian(&p);
        let h = 1e-7;
        let bumps = [
            PerigeeCircle { curvature: base.curvature + h, ..base },
            PerigeeCircle { phi0: base.phi0 + h, ..base },
            PerigeeCircle { impact: base.impact + h, ..base },
        ];
        for (bumped, expected) in bumps.iter().zip(jac.iter()) {
            let numeric = (bumped.signed_distance(&p) - base.signed_distance(&p)) / h;
            assert!(approx_eq(numeric, *expected, 1e-4), "{numeric} vs {expected}");
        }
    }

    #[test]
    fn reversed_circle_is_the_same_set() {
        let circle = PerigeeCircle::new(0.02, 0.7, 0.3);
        let rev = circle.reversed();
        let p = circle.position_at(40.0);
        assert!(approx_eq(rev.signed_distance(&p), 0.0, 1e-9));
        assert!(rev.arc_length_to(&p) < 0.0);
        let c1 = circle.center().unwrap();
        let c2 = rev.center().unwrap();
        assert!(approx_eq((c1 - c2).norm(), 0.0, 1e-9));
    }

    #[test]
    fn orientation_follows_points() {
        let circle = PerigeeCircle::new(0.02, 0.7, 0.0);
        let points: Vec<_> = (1..10).map(|i| circle.position_at(i as f64 * 5.0)).collect();
        let restored = circle.reversed().oriented_along(&points);
        assert!(approx_eq(restored.curvature, 0.02, 1e-12));
        assert!(approx_eq(restored.phi0, 0.7, 1e-9));
        assert!(approx_eq(restored.impact, 0.0, 1e-12));
        assert!(approx_eq(circle.oriented_along(&points).curvature, 0.02, 1e-12));
    }

    #[test]
    fn sz_line_residual() {
        let line = SzLine { z0: 2.0, tan_lambda: 0.5 };
        assert!(approx_eq(line.z_at(10.0), 7.0, 1e-12));
        assert!(approx_eq(line.residual(10.0, 8.0), 1.0, 1e-12));
    }
}
