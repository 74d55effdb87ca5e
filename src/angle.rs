//! Angle utilities used across the finder.

use nalgebra::Vector2;
use std::f64::consts::{PI, TAU};

/// Wraps an angle into the range (-π, π].
#[inline]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Smallest unsigned difference between two azimuths, in [0, π].
#[inline]
pub fn azimuth_difference(a: f64, b: f64) -> f64 {
    wrap_angle(a - b).abs()
}

/// Azimuth of a point seen from the origin.
#[inline]
pub fn azimuth(point: &Vector2<f64>) -> f64 {
    point.y.atan2(point.x)
}

/// Unsigned angle between two 2D vectors in radians, in [0, π].
/// Zero when the vectors are parallel, π when they are opposite.
#[inline]
pub fn angle_between(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    let na = a.norm().max(1e-12);
    let nb = b.norm().max(1e-12);
    (a.dot(b) / (na * nb)).clamp(-1.0, 1.0).acos()
}

/// Lifts `angle` into the window `[lower, lower + 2π)`.
#[inline]
pub fn lift_into(angle: f64, lower: f64) -> f64 {
    lower + (angle - lower).rem_euclid(TAU)
}
