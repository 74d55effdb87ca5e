//! Facets: neighbouring hit triples with a right/left passage hypothesis.

use crate::angle::angle_between;
use crate::automaton::{build_self_relations, AutomatonCell, AutomatonNode, LayerOrdered, Relation};
use crate::hits::{hit_key, HitId, HitNeighborhood, RightLeft, WireHit};
use nalgebra::Vector2;

const NEWTON_STEPS: usize = 8;

/// Ordered hit triple with a tangent line touching the three drift circles.
#[derive(Clone, Debug)]
pub struct Facet {
    hits: [HitId; 3],
    right_left: [RightLeft; 3],
    direction: Vector2<f64>,
    chi2: f64,
    layer: u16,
    weight: f64,
    cell: AutomatonCell,
}

impl Facet {
    #[inline]
    pub fn hits(&self) -> &[HitId; 3] {
        &self.hits
    }

    #[inline]
    pub fn right_left(&self) -> &[RightLeft; 3] {
        &self.right_left
    }

    /// Unit direction of the tangent line, from the first hit to the last.
    #[inline]
    pub fn direction(&self) -> Vector2<f64> {
        self.direction
    }

    /// Left normal of [`Facet::direction`].
    #[inline]
    pub fn normal(&self) -> Vector2<f64> {
        Vector2::new(-self.direction.y, self.direction.x)
    }

    #[inline]
    pub fn chi2(&self) -> f64 {
        self.chi2
    }

    /// Points where the tangent line touches the drift circles.
    pub fn touch_points(&self, hits: &[WireHit]) -> [Vector2<f64>; 3] {
        let normal = self.normal();
        std::array::from_fn(|i| {
            let hit = &hits[self.hits[i]];
            hit.reference_position() - normal * (self.right_left[i].sign() * hit.drift_length())
        })
    }

    /// Whether `next` continues this facet: two shared hits with the same
    /// passage.
    pub fn continues_into(&self, next: &Facet) -> bool {
        self.hits[1] == next.hits[0]
            && self.hits[2] == next.hits[1]
            && self.right_left[1] == next.right_left[0]
            && self.right_left[2] == next.right_left[1]
    }
}

impl LayerOrdered for Facet {
    fn layer(&self) -> u32 {
        u32::from(self.layer)
    }
}

impl AutomatonNode for Facet {
    fn cell(&self) -> &AutomatonCell {
        &self.cell
    }

    fn cell_mut(&mut self) -> &mut AutomatonCell {
        &mut self.cell
    }

    fn intrinsic_weight(&self) -> f64 {
        self.weight
    }

    fn hit_ids(&self) -> &[HitId] {
        &self.hits
    }
}

/// Least-squares line `n·X = c` through three points shifted by `offsets`
/// along the normal, i.e. minimising `Σ (n·Xᵢ − c − offsetᵢ)²`.
///
/// Returns the unit normal and the residual sum of squares. The normal
/// starts at the left normal of the first-to-last chord and is refined by
/// Newton steps on its angle.
pub fn fit_tangent_line(positions: &[Vector2<f64>; 3], offsets: &[f64; 3]) -> (Vector2<f64>, f64) {
    let mean = (positions[0] + positions[1] + positions[2]) / 3.0;
    let mean_offset = (offsets[0] + offsets[1] + offsets[2]) / 3.0;
    let (mut sxx, mut syy, mut sxy, mut vx, mut vy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (p, &b) in positions.iter().zip(offsets) {
        let y = p - mean;
        let b = b - mean_offset;
        sxx += y.x * y.x;
        syy += y.y * y.y;
        sxy += y.x * y.y;
        vx += b * y.x;
        vy += b * y.y;
    }

    let chord = positions[2] - positions[0];
    let mut theta = chord.x.atan2(-chord.y);
    for _ in 0..NEWTON_STEPS {
        let (s, c) = theta.sin_cos();
        let first = 2.0 * (-c * s * sxx + (c * c - s * s) * sxy + s * c * syy) - 2.0 * (-s * vx + c * vy);
        let second = 2.0 * (-(c * c - s * s) * sxx - 4.0 * c * s * sxy + (c * c - s * s) * syy)
            - 2.0 * (-c * vx - s * vy);
        if second <= 1e-12 {
            break;
        }
        theta -= first / second;
    }

    let normal = Vector2::new(theta.cos(), theta.sin());
    let chi2 = positions
        .iter()
        .zip(offsets)
        .map(|(p, &b)| (normal.dot(&(p - mean)) - (b - mean_offset)).powi(2))
        .sum();
    (normal, chi2)
}

const PASSAGES: [RightLeft; 2] = [RightLeft::Right, RightLeft::Left];

/// Builds every facet of the hits in `neighborhood`.
///
/// Triples are ordered by [`hit_key`]; each of the eight passage hypotheses
/// with `χ² ≤ max_chi2` yields one facet.
pub fn build_facets(hits: &[WireHit], neighborhood: &HitNeighborhood, max_chi2: f64) -> Vec<Facet> {
    let mut facets = Vec::new();
    for middle in neighborhood.hits_in_order(hits) {
        let key = hit_key(&hits[middle]);
        let around = neighborhood.neighbors(middle);
        let split = around.partition_point(|&h| hit_key(&hits[h]) < key);
        let (inner, outer) = around.split_at(split);
        for &start in inner {
            for &end in outer {
                push_facets(hits, [start, middle, end], max_chi2, &mut facets);
            }
        }
    }
    facets
}

fn push_facets(hits: &[WireHit], ids: [HitId; 3], max_chi2: f64, facets: &mut Vec<Facet>) {
    let positions = ids.map(|h| hits[h].reference_position());
    let drifts = ids.map(|h| hits[h].drift_length());
    let chord = positions[2] - positions[0];
    for a in PASSAGES {
        for b in PASSAGES {
            for c in PASSAGES {
                let mut right_left = [a, b, c];
                let offsets = [0, 1, 2].map(|i| right_left[i].sign() * drifts[i]);
                let (normal, chi2) = fit_tangent_line(&positions, &offsets);
                if !(chi2 <= max_chi2) {
                    continue;
                }
                let mut direction = Vector2::new(normal.y, -normal.x);
                if direction.dot(&chord) < 0.0 {
                    direction = -direction;
                    right_left = right_left.map(RightLeft::flipped);
                }
                facets.push(Facet {
                    hits: ids,
                    right_left,
                    direction,
                    chi2,
                    layer: hits[ids[0]].layer(),
                    weight: 1.0 - 0.5 * chi2 / max_chi2,
                    cell: AutomatonCell::new(),
                });
            }
        }
    }
}

/// Relations between facets sharing two hits with the same passage whose
/// directions differ by at most `max_angle_change`.
pub fn facet_relations(facets: &[Facet], layer_window: u32, max_angle_change: f64) -> Vec<Relation> {
    build_self_relations(facets, layer_window, |a, b| {
        if !a.continues_into(b) {
            return None;
        }
        let change = angle_between(&a.direction, &b.direction);
        (change <= max_angle_change).then(|| -0.5 * change / max_angle_change)
    })
}
