//! Weighted relations between building blocks.
//!
//! Candidates are restricted to a forward layer window, so the work is
//! proportional to the number of pairs inside the window rather than to the
//! square of the collection size. Relating a collection to itself requires a
//! strictly increasing (layer, index) order, which makes the graph acyclic by
//! construction.

use log::warn;
use serde::Serialize;

/// Directed edge `from → to` between node indices.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Relation {
    pub from: usize,
    pub to: usize,
    pub weight: f64,
}

/// Objects with a radial ordering coordinate.
pub trait LayerOrdered {
    fn layer(&self) -> u32;
}

fn relate<A, B, F>(from: &[A], to: &[B], layer_window: u32, mut admit: F) -> Vec<Relation>
where
    A: LayerOrdered,
    B: LayerOrdered,
    F: FnMut(usize, &A, usize, &B) -> Option<f64>,
{
    let mut order: Vec<usize> = (0..to.len()).collect();
    order.sort_by_key(|&j| (to[j].layer(), j));
    let layers: Vec<u32> = order.iter().map(|&j| to[j].layer()).collect();

    let mut relations = Vec::new();
    for (i, a) in from.iter().enumerate() {
        let lower = a.layer();
        let upper = lower.saturating_add(layer_window);
        let start = layers.partition_point(|&l| l < lower);
        let end = layers.partition_point(|&l| l <= upper);
        for &j in &order[start..end] {
            let Some(weight) = admit(i, a, j, &to[j]) else {
                continue;
            };
            if !weight.is_finite() {
                warn!("dropping relation {i} -> {j} with non-finite weight");
                continue;
            }
            relations.push(Relation {
                from: i,
                to: j,
                weight,
            });
        }
    }
    relations.sort_by(|x, y| (x.from, x.to).cmp(&(y.from, y.to)));
    relations
}

/// Relations from one collection to another, `0 ≤ layer(to) − layer(from) ≤
/// layer_window`. `filter` returns the edge weight or `None` for no edge.
pub fn build_relations<A, B, F>(from: &[A], to: &[B], layer_window: u32, mut filter: F) -> Vec<Relation>
where
    A: LayerOrdered,
    B: LayerOrdered,
    F: FnMut(&A, &B) -> Option<f64>,
{
    relate(from, to, layer_window, |_, a, _, b| filter(a, b))
}

/// Relations inside one collection. Only pairs with strictly increasing
/// (layer, index) are offered to `filter`, so there are no self-loops and no
/// cycles.
pub fn build_self_relations<T, F>(items: &[T], layer_window: u32, mut filter: F) -> Vec<Relation>
where
    T: LayerOrdered,
    F: FnMut(&T, &T) -> Option<f64>,
{
    relate(items, items, layer_window, |i, a, j, b| {
        if (b.layer(), j) > (a.layer(), i) {
            filter(a, b)
        } else {
            None
        }
    })
}
