//! Synthetic events on a [`CylindricalLayout`].
//!
//! Helices are intersected with every layer radius; the wire closest to the
//! crossing point at the crossing height records the distance to the circle
//! as its drift length. Background hits land on random wires. Used by the
//! demo binary, the benchmarks and the integration tests.

use crate::hits::{CylindricalLayout, RawHit, WireLine};
use crate::trajectory::{PerigeeCircle, SzLine};
use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f64::consts::{PI, TAU};

/// Helix parameters of a simulated particle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruthTrack {
    pub curvature: f64,
    pub phi0: f64,
    pub impact: f64,
    pub z0: f64,
    pub tan_lambda: f64,
}

impl TruthTrack {
    pub fn circle(&self) -> PerigeeCircle {
        PerigeeCircle::new(self.curvature, self.phi0, self.impact)
    }

    pub fn sz_line(&self) -> SzLine {
        SzLine {
            z0: self.z0,
            tan_lambda: self.tan_lambda,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticParams {
    pub tracks: Vec<TruthTrack>,
    /// Uniformly distributed background hits.
    pub noise_hits: usize,
    /// Gaussian smearing of the drift lengths in cm.
    pub drift_sigma: f64,
    /// Variance reported with every hit.
    pub drift_length_variance: f64,
    /// Probability of a layer crossing producing a hit.
    pub hit_efficiency: f64,
    /// Largest drift length of a background hit.
    pub max_noise_drift: f64,
    pub seed: u64,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            tracks: vec![
                TruthTrack {
                    curvature: 0.02,
                    phi0: 0.7,
                    impact: 0.0,
                    z0: 5.0,
                    tan_lambda: 0.4,
                },
                TruthTrack {
                    curvature: -0.012,
                    phi0: 2.4,
                    impact: 0.0,
                    z0: -3.0,
                    tan_lambda: -0.2,
                },
                TruthTrack {
                    curvature: 0.006,
                    phi0: -1.5,
                    impact: 0.0,
                    z0: 0.0,
                    tan_lambda: 0.8,
                },
            ],
            noise_hits: 0,
            drift_sigma: 0.0,
            drift_length_variance: 1e-4,
            hit_efficiency: 1.0,
            max_noise_drift: 0.5,
            seed: 5,
        }
    }
}

/// Simulated hits with the index of the producing track (`None` for noise).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntheticEvent {
    pub hits: Vec<RawHit>,
    pub truth: Vec<Option<usize>>,
}

impl SyntheticEvent {
    /// Hits produced by track `track`.
    pub fn hits_of(&self, track: usize) -> Vec<usize> {
        self.truth
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == Some(track))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Arc length at which `circle` first reaches `radius`, searching the
/// outgoing half turn.
pub fn arc_length_at_radius(circle: &PerigeeCircle, radius: f64) -> Option<f64> {
    let s_max = if circle.is_straight() {
        2.0 * radius + circle.impact.abs()
    } else {
        (PI / circle.curvature.abs()).min(4.0 * radius + circle.impact.abs())
    };
    let excess = |s: f64| circle.position_at(s).norm() - radius;
    if excess(0.0) > 0.0 || excess(s_max) < 0.0 {
        return None;
    }
    let (mut lo, mut hi) = (0.0, s_max);
    for _ in 0..80 {
        let mid = 0.5 * (lo + hi);
        if excess(mid) < 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Some(0.5 * (lo + hi))
}

/// Distance of a point from the circle.
fn distance_to_circle(circle: &PerigeeCircle, point: &Vector2<f64>) -> f64 {
    match circle.center() {
        Some(center) => ((point - center).norm() - 1.0 / circle.curvature.abs()).abs(),
        None => circle.signed_distance(point).abs(),
    }
}

fn raw_hit(line: &WireLine, drift_length: f64, drift_length_variance: f64) -> RawHit {
    RawHit {
        layer: line.id.layer,
        wire: line.id.wire,
        superlayer: line.superlayer,
        position: [line.reference.x, line.reference.y],
        drift_length,
        drift_length_variance,
        right_left: None,
    }
}

/// Standard normal sample (Box-Muller).
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

/// Hits of one helix, one per crossed layer, in radial order.
pub fn track_hits(layout: &CylindricalLayout, track: &TruthTrack) -> Vec<RawHit> {
    let circle = track.circle();
    let line = track.sz_line();
    (0..layout.layer_count())
        .filter_map(|layer| {
            let s = arc_length_at_radius(&circle, layout.layer_radius(layer))?;
            let z = line.z_at(s);
            let wire = layout.nearest_wire(layer, &circle.position_at(s), z)?;
            if !wire.contains_z(z) {
                return None;
            }
            let drift = distance_to_circle(&circle, &wire.position_at(z));
            Some(raw_hit(&wire, drift, 1e-4))
        })
        .collect()
}

/// Simulates one event. Deterministic for a given seed; one hit per wire,
/// the first producer wins.
pub fn simulate_event(layout: &CylindricalLayout, params: &SyntheticParams) -> SyntheticEvent {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut used_wires = BTreeSet::new();
    let mut event = SyntheticEvent::default();

    for (index, track) in params.tracks.iter().enumerate() {
        for mut hit in track_hits(layout, track) {
            if params.hit_efficiency < 1.0 && !rng.gen_bool(params.hit_efficiency.clamp(0.0, 1.0)) {
                continue;
            }
            if !used_wires.insert((hit.layer, hit.wire)) {
                continue;
            }
            if params.drift_sigma > 0.0 {
                hit.drift_length = (hit.drift_length + params.drift_sigma * gaussian(&mut rng)).abs();
            }
            hit.drift_length_variance = params.drift_length_variance;
            event.hits.push(hit);
            event.truth.push(Some(index));
        }
    }

    let layers = layout.layer_count();
    let mut attempts = 0;
    let mut placed = 0;
    while placed < params.noise_hits && layers > 0 && attempts < 100 * params.noise_hits {
        attempts += 1;
        let layer = rng.gen_range(0..layers);
        let radius = layout.layer_radius(layer);
        let phi = rng.gen_range(-PI..PI);
        let point = Vector2::new(radius * phi.cos(), radius * phi.sin());
        let Some(wire) = layout.nearest_wire(layer, &point, 0.0) else {
            continue;
        };
        if !used_wires.insert((layer, wire.id.wire)) {
            continue;
        }
        let drift = rng.gen_range(0.0..params.max_noise_drift.max(f64::EPSILON));
        event.hits.push(raw_hit(&wire, drift, params.drift_length_variance));
        event.truth.push(None);
        placed += 1;
    }
    event
}
