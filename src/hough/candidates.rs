//! Greedy extraction of non-overlapping candidate regions from Hough leaves.

use super::boxes::ParamBounds;
use super::tree::HoughLeaf;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Accepted Hough region with the items it claimed.
#[derive(Clone, Debug)]
pub struct HoughCandidate<const N: usize> {
    /// Index of the originating leaf.
    pub leaf: usize,
    pub bounds: ParamBounds<N>,
    pub level: u32,
    pub items: Vec<usize>,
}

impl<const N: usize> HoughCandidate<N> {
    /// Midpoint of the region on every axis.
    pub fn center(&self) -> [f64; N] {
        std::array::from_fn(|i| 0.5 * (self.bounds[i].0 + self.bounds[i].1))
    }
}

/// Non-maximum suppression with lazy deletion.
///
/// Leaves are popped by item count (ties: discovery order). A popped entry
/// whose untaken count dropped is re-pushed with the new count while it still
/// meets `min_items`; an entry whose count is current is accepted and its
/// items are marked in `taken`.
pub fn select_candidates<const N: usize>(
    leaves: &[HoughLeaf<N>],
    min_items: usize,
    taken: &mut [bool],
) -> Vec<HoughCandidate<N>> {
    select_candidates_with(leaves, min_items, taken, |candidate| Some(candidate.clone()))
}

/// [`select_candidates`] with an acceptance step. `accept` sees every region
/// that survives suppression; its items are marked in `taken` only when it
/// returns `Some`, so a rejected region leaves its items to later leaves.
pub fn select_candidates_with<const N: usize, T, F>(
    leaves: &[HoughLeaf<N>],
    min_items: usize,
    taken: &mut [bool],
    mut accept: F,
) -> Vec<T>
where
    F: FnMut(&HoughCandidate<N>) -> Option<T>,
{
    let mut heap: BinaryHeap<(usize, Reverse<usize>)> = leaves
        .iter()
        .enumerate()
        .filter(|(_, leaf)| leaf.items.len() >= min_items)
        .map(|(index, leaf)| (leaf.items.len(), Reverse(index)))
        .collect();

    let mut accepted = Vec::new();
    while let Some((count, Reverse(index))) = heap.pop() {
        let leaf = &leaves[index];
        let free: Vec<usize> = leaf.items.iter().copied().filter(|&i| !taken[i]).collect();
        if free.len() < min_items {
            continue;
        }
        if free.len() < count {
            heap.push((free.len(), Reverse(index)));
            continue;
        }
        let candidate = HoughCandidate {
            leaf: index,
            bounds: leaf.bounds,
            level: leaf.level,
            items: free,
        };
        if let Some(value) = accept(&candidate) {
            for &i in &candidate.items {
                taken[i] = true;
            }
            accepted.push(value);
        }
    }
    accepted
}
