//! Recursive Hough tree search.
//!
//! Depth-first over an explicit stack. Every node filters the item list
//! inherited from its parent, so the total work stays proportional to
//! items × depth. Item lists live in a slot arena and are recycled through
//! a free list once all children of a node have consumed them.

use super::axis::DiscreteAxis;
use super::boxes::{HoughBox, ParamBounds};
use super::predicates::HoughPredicate;
use crate::deadline::Deadline;
use crate::error::{FinderError, Result};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum HoughNodeState {
    Unexpanded,
    Populated,
    Expanded,
    Leaf,
    Pruned,
}

#[derive(Clone, Debug)]
pub struct HoughNode<const N: usize> {
    pub hough_box: HoughBox<N>,
    pub level: u32,
    pub state: HoughNodeState,
    parent_slot: usize,
}

/// Populated leaf region.
#[derive(Clone, Debug)]
pub struct HoughLeaf<const N: usize> {
    pub hough_box: HoughBox<N>,
    pub bounds: ParamBounds<N>,
    pub level: u32,
    /// Indices into the item arena passed to [`HoughTree::search`].
    pub items: Vec<usize>,
}

/// Node counts of one search.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeStats {
    pub nodes: usize,
    pub expanded: usize,
    pub leaves: usize,
    pub pruned: usize,
    pub deepest_level: u32,
    pub item_tests: usize,
}

impl TreeStats {
    fn record(&mut self, state: HoughNodeState, level: u32) {
        self.nodes += 1;
        match state {
            HoughNodeState::Expanded => self.expanded += 1,
            HoughNodeState::Leaf => self.leaves += 1,
            HoughNodeState::Pruned => self.pruned += 1,
            HoughNodeState::Unexpanded | HoughNodeState::Populated => {}
        }
        self.deepest_level = self.deepest_level.max(level);
    }

    /// Adds the counts of another search.
    pub fn accumulate(&mut self, other: &TreeStats) {
        self.nodes += other.nodes;
        self.expanded += other.expanded;
        self.leaves += other.leaves;
        self.pruned += other.pruned;
        self.deepest_level = self.deepest_level.max(other.deepest_level);
        self.item_tests += other.item_tests;
    }
}

#[derive(Clone, Debug)]
pub struct SearchOutcome<const N: usize> {
    pub leaves: Vec<HoughLeaf<N>>,
    pub stats: TreeStats,
}

#[derive(Default)]
struct ItemSlot {
    items: Vec<usize>,
    pending_children: usize,
}

#[derive(Default)]
struct SlotArena {
    slots: Vec<ItemSlot>,
    free_slots: Vec<usize>,
    free_buffers: Vec<Vec<usize>>,
}

impl SlotArena {
    fn buffer(&mut self) -> Vec<usize> {
        let mut buf = self.free_buffers.pop().unwrap_or_default();
        buf.clear();
        buf
    }

    fn recycle(&mut self, buf: Vec<usize>) {
        self.free_buffers.push(buf);
    }

    fn store(&mut self, items: Vec<usize>, pending_children: usize) -> usize {
        let slot = ItemSlot {
            items,
            pending_children,
        };
        match self.free_slots.pop() {
            Some(index) => {
                self.slots[index] = slot;
                index
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        }
    }

    fn items(&self, slot: usize) -> &[usize] {
        &self.slots[slot].items
    }

    fn child_done(&mut self, slot: usize) {
        let entry = &mut self.slots[slot];
        entry.pending_children = entry.pending_children.saturating_sub(1);
        if entry.pending_children == 0 {
            let buf = std::mem::take(&mut entry.items);
            self.free_buffers.push(buf);
            self.free_slots.push(slot);
        }
    }
}

/// Tree search over an N-dimensional box.
#[derive(Clone, Debug)]
pub struct HoughTree<const N: usize> {
    axes: [DiscreteAxis; N],
    divisions: [usize; N],
    max_level: u32,
    min_items: usize,
}

impl<const N: usize> HoughTree<N> {
    pub fn new(
        axes: [DiscreteAxis; N],
        divisions: [usize; N],
        max_level: u32,
        min_items: usize,
    ) -> Result<Self> {
        if axes.iter().any(DiscreteAxis::is_empty) {
            return Err(FinderError::invalid("Hough axes must not be empty"));
        }
        if divisions.iter().any(|&d| d < 2) {
            return Err(FinderError::invalid("Hough divisions must be at least 2"));
        }
        if min_items == 0 {
            return Err(FinderError::invalid("min_items_per_leaf must be at least 1"));
        }
        Ok(Self {
            axes,
            divisions,
            max_level,
            min_items,
        })
    }

    pub fn axes(&self) -> &[DiscreteAxis; N] {
        &self.axes
    }

    pub fn min_items(&self) -> usize {
        self.min_items
    }

    /// Searches the tree with the items `candidates` (indices into `items`).
    /// Returns the populated leaves in discovery order.
    pub fn search<P: HoughPredicate<N>>(
        &self,
        predicate: &P,
        items: &[P::Item],
        candidates: &[usize],
        deadline: &Deadline,
        stage: &'static str,
    ) -> Result<SearchOutcome<N>> {
        self.search_with_min_items(predicate, items, candidates, self.min_items, deadline, stage)
    }

    /// Like [`search`](Self::search) with a different population threshold.
    pub fn search_with_min_items<P: HoughPredicate<N>>(
        &self,
        predicate: &P,
        items: &[P::Item],
        candidates: &[usize],
        min_items: usize,
        deadline: &Deadline,
        stage: &'static str,
    ) -> Result<SearchOutcome<N>> {
        let min_items = min_items.max(1);
        let mut stats = TreeStats::default();
        let mut leaves = Vec::new();
        if candidates.len() < min_items {
            return Ok(SearchOutcome { leaves, stats });
        }

        let mut arena = SlotArena::default();
        let mut root_items = arena.buffer();
        root_items.extend_from_slice(candidates);
        let root_slot = arena.store(root_items, 1);
        let mut stack = vec![HoughNode {
            hough_box: HoughBox::full(&self.axes),
            level: 0,
            state: HoughNodeState::Unexpanded,
            parent_slot: root_slot,
        }];

        while let Some(mut node) = stack.pop() {
            deadline.check(stage)?;
            let bounds = node.hough_box.bounds(&self.axes);
            let mut kept = arena.buffer();
            let inherited = arena.items(node.parent_slot);
            stats.item_tests += inherited.len();
            kept.extend(
                inherited
                    .iter()
                    .copied()
                    .filter(|&i| predicate.contains(&items[i], &bounds)),
            );
            arena.child_done(node.parent_slot);
            node.state = HoughNodeState::Populated;

            if kept.len() < min_items {
                node.state = HoughNodeState::Pruned;
                arena.recycle(kept);
                stats.record(node.state, node.level);
                continue;
            }

            let children = if node.level < self.max_level {
                node.hough_box.children(&self.axes, &self.divisions)
            } else {
                None
            };
            match children {
                None => {
                    node.state = HoughNodeState::Leaf;
                    leaves.push(HoughLeaf {
                        hough_box: node.hough_box,
                        bounds,
                        level: node.level,
                        items: kept,
                    });
                }
                Some(children) => {
                    node.state = HoughNodeState::Expanded;
                    let slot = arena.store(kept, children.len());
                    for child in children.into_iter().rev() {
                        stack.push(HoughNode {
                            hough_box: child,
                            level: node.level + 1,
                            state: HoughNodeState::Unexpanded,
                            parent_slot: slot,
                        });
                    }
                }
            }
            stats.record(node.state, node.level);
        }
        Ok(SearchOutcome { leaves, stats })
    }
}
