//! Multi-pass cellular automaton over a weighted DAG.
//!
//! Each pass
//! 1. resets the weight of every usable node to its intrinsic weight,
//! 2. propagates `w(A) = max(w(A), i(A) + r(A,B) + w(B))` in reverse
//!    topological order, which reaches the fixed point in one sweep,
//! 3. harvests paths greedily from a max-heap of start nodes, skipping stale
//!    entries, and marks accepted nodes as taken (and their competitors as
//!    masked).
//!
//! Passes repeat until one harvests nothing or `max_passes` is reached.

use super::cell::AutomatonCell;
use super::relation::Relation;
use crate::deadline::Deadline;
use crate::error::{FinderError, Result};
use crate::hits::HitId;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

/// Node of a relation graph processed by the path finder.
pub trait AutomatonNode {
    fn cell(&self) -> &AutomatonCell;
    fn cell_mut(&mut self) -> &mut AutomatonCell;
    /// Weight contributed by the node itself.
    fn intrinsic_weight(&self) -> f64;
    /// Hits the node is built from; nodes sharing hits are competitors.
    fn hit_ids(&self) -> &[HitId];
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PathFinderParams {
    pub max_passes: usize,
    /// Minimum accumulated weight of an accepted path (> 0).
    pub min_path_weight: f64,
    /// Minimum number of nodes of an accepted path.
    pub min_path_length: usize,
    /// Mask every node sharing a hit with an accepted path.
    pub mask_competitors: bool,
}

impl Default for PathFinderParams {
    fn default() -> Self {
        Self {
            max_passes: 10,
            min_path_weight: 0.1,
            min_path_length: 1,
            mask_competitors: true,
        }
    }
}

impl PathFinderParams {
    pub fn validate(&self) -> Result<()> {
        if self.max_passes == 0 {
            return Err(FinderError::invalid("automaton max_passes must be at least 1"));
        }
        if !(self.min_path_weight > 0.0 && self.min_path_weight.is_finite()) {
            return Err(FinderError::invalid("automaton min_path_weight must be positive"));
        }
        if self.min_path_length == 0 {
            return Err(FinderError::invalid("automaton min_path_length must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
struct StartEntry {
    weight: f64,
    index: usize,
}

impl PartialEq for StartEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for StartEntry {}

impl PartialOrd for StartEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StartEntry {
    // Heavier first; equal weights favour the lower index.
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Extracts disjoint highest-weight paths from a relation graph.
#[derive(Clone, Debug)]
pub struct CellularPathFinder {
    params: PathFinderParams,
}

impl CellularPathFinder {
    pub fn new(params: PathFinderParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &PathFinderParams {
        &self.params
    }

    /// Returns the accepted paths as node index sequences, in harvest order.
    ///
    /// `relations` must be sorted by `(from, to)`; see
    /// [`build_relations`](super::relation::build_relations).
    pub fn find_paths<N: AutomatonNode>(
        &self,
        nodes: &mut [N],
        relations: &[Relation],
        deadline: &Deadline,
    ) -> Result<Vec<Vec<usize>>> {
        let n = nodes.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        let offsets = successor_offsets(n, relations);
        let order = topological_order(nodes, relations, &offsets)?;
        let competitors = if self.params.mask_competitors {
            hit_index(nodes)
        } else {
            Vec::new()
        };

        let mut paths = Vec::new();
        let mut best_successor: Vec<Option<usize>> = vec![None; n];
        let mut passes = 0usize;
        for _ in 0..self.params.max_passes {
            deadline.check("cellular automaton")?;
            passes += 1;
            propagate(nodes, relations, &offsets, &order, &mut best_successor);
            let harvested = self.harvest(nodes, &best_successor, &competitors, &mut paths)?;
            if harvested == 0 {
                break;
            }
        }
        debug!(
            "CellularPathFinder nodes={} relations={} passes={} paths={}",
            n,
            relations.len(),
            passes,
            paths.len()
        );
        Ok(paths)
    }

    fn harvest<N: AutomatonNode>(
        &self,
        nodes: &mut [N],
        best_successor: &[Option<usize>],
        competitors: &[Vec<usize>],
        paths: &mut Vec<Vec<usize>>,
    ) -> Result<usize> {
        let mut heap: BinaryHeap<StartEntry> = nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| {
                node.cell().is_usable() && node.cell().weight() >= self.params.min_path_weight
            })
            .map(|(index, node)| StartEntry {
                weight: node.cell().weight(),
                index,
            })
            .collect();

        let mut harvested = 0usize;
        while let Some(entry) = heap.pop() {
            if !nodes[entry.index].cell().is_usable() {
                continue;
            }
            let mut path = vec![entry.index];
            let mut current = entry.index;
            while let Some(next) = best_successor[current] {
                path.push(next);
                current = next;
            }
            // Paths running into a node taken or masked earlier in this pass
            // are stale; their start is retried after the next propagation.
            if path.iter().any(|&i| !nodes[i].cell().is_usable()) {
                continue;
            }
            if path.len() < self.params.min_path_length {
                continue;
            }

            // Guard only: stale paths were skipped above, so every node here
            // is usable. A hit means the successor table is corrupt.
            for &i in &path {
                let cell = nodes[i].cell_mut();
                if cell.is_taken() {
                    error!("automaton node {i} reused while taken");
                    return Err(FinderError::CellReused { index: i });
                }
                cell.take();
            }
            if !competitors.is_empty() {
                for &i in &path {
                    let hits: Vec<HitId> = nodes[i].hit_ids().to_vec();
                    for hit in hits {
                        for &other in &competitors[hit] {
                            if !nodes[other].cell().is_taken() {
                                nodes[other].cell_mut().set_masked();
                            }
                        }
                    }
                }
            }
            paths.push(path);
            harvested += 1;
        }
        Ok(harvested)
    }
}

fn successor_offsets(n: usize, relations: &[Relation]) -> Vec<usize> {
    let mut offsets = vec![0usize; n + 1];
    for rel in relations {
        offsets[rel.from + 1] += 1;
    }
    for i in 0..n {
        offsets[i + 1] += offsets[i];
    }
    offsets
}

/// Kahn's algorithm. A non-empty remainder means the graph has a cycle.
fn topological_order<N: AutomatonNode>(
    nodes: &mut [N],
    relations: &[Relation],
    offsets: &[usize],
) -> Result<Vec<usize>> {
    let n = nodes.len();
    let mut in_degree = vec![0usize; n];
    for rel in relations {
        in_degree[rel.to] += 1;
    }
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(i) = queue.pop_front() {
        order.push(i);
        for rel in &relations[offsets[i]..offsets[i + 1]] {
            in_degree[rel.to] -= 1;
            if in_degree[rel.to] == 0 {
                queue.push_back(rel.to);
            }
        }
    }
    if order.len() == n {
        return Ok(order);
    }

    let remaining = n - order.len();
    for (i, node) in nodes.iter_mut().enumerate() {
        node.cell_mut().set_cycle(in_degree[i] > 0);
    }
    error!("relation graph is not acyclic: {remaining} of {n} nodes remain after topological sort");
    Err(FinderError::RelationCycle { remaining, nodes: n })
}

fn propagate<N: AutomatonNode>(
    nodes: &mut [N],
    relations: &[Relation],
    offsets: &[usize],
    order: &[usize],
    best_successor: &mut [Option<usize>],
) {
    for &i in order.iter().rev() {
        best_successor[i] = None;
        if !nodes[i].cell().is_usable() {
            continue;
        }
        let intrinsic = nodes[i].intrinsic_weight();
        let mut weight = intrinsic;
        let mut successor = None;
        for rel in &relations[offsets[i]..offsets[i + 1]] {
            let target = nodes[rel.to].cell();
            if !target.is_usable() {
                continue;
            }
            let candidate = intrinsic + rel.weight + target.weight();
            if candidate > weight {
                weight = candidate;
                successor = Some(rel.to);
            }
        }
        nodes[i].cell_mut().set_weight(weight);
        best_successor[i] = successor;
    }
}

fn hit_index<N: AutomatonNode>(nodes: &[N]) -> Vec<Vec<usize>> {
    let size = nodes
        .iter()
        .flat_map(|node| node.hit_ids().iter().copied())
        .max()
        .map_or(0, |max| max + 1);
    let mut index = vec![Vec::new(); size];
    for (i, node) in nodes.iter().enumerate() {
        for &hit in node.hit_ids() {
            index[hit].push(i);
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::relation::{build_self_relations, LayerOrdered};

    #[derive(Clone, Debug)]
    struct TestNode {
        layer: u32,
        weight: f64,
        hits: Vec<HitId>,
        cell: AutomatonCell,
    }

    impl TestNode {
        fn new(layer: u32, hits: Vec<HitId>) -> Self {
            Self {
                layer,
                weight: 1.0,
                hits,
                cell: AutomatonCell::new(),
            }
        }
    }

    impl LayerOrdered for TestNode {
        fn layer(&self) -> u32 {
            self.layer
        }
    }

    impl AutomatonNode for TestNode {
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

    fn finder() -> CellularPathFinder {
        CellularPathFinder::new(PathFinderParams::default()).unwrap()
    }

    #[test]
    fn fully_connected_chain_yields_one_path() {
        let mut nodes: Vec<TestNode> = (0..10).map(|i| TestNode::new(i, vec![i as usize])).collect();
        let rels = build_self_relations(&nodes, 100, |_, _| Some(0.0));
        let paths = finder()
            .find_paths(&mut nodes, &rels, &Deadline::unlimited())
            .unwrap();
        assert_eq!(paths, vec![(0..10).collect::<Vec<_>>()]);
        assert!(nodes.iter().all(|n| n.cell.is_taken()));
    }

    #[test]
    fn two_disjoint_chains_share_no_node() {
        let mut nodes: Vec<TestNode> = (0..16)
            .map(|i| TestNode::new((i % 8) as u32, vec![i as usize]))
            .collect();
        // Chain A: nodes 0..8, chain B: nodes 8..16.
        let rels = build_self_relations(&nodes, 1, |a, b| {
            let same_chain = (a.hits[0] < 8) == (b.hits[0] < 8);
            (same_chain && b.layer == a.layer + 1).then_some(0.0)
        });
        let paths = finder()
            .find_paths(&mut nodes, &rels, &Deadline::unlimited())
            .unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0], (0..8).collect::<Vec<_>>());
        assert_eq!(paths[1], (8..16).collect::<Vec<_>>());
    }

    #[test]
    fn competitors_sharing_hits_are_masked() {
        // Node 3 shares hit 1 with the heavy path 0 -> 1 -> 2.
        let mut nodes = vec![
            TestNode::new(0, vec![0]),
            TestNode::new(1, vec![1]),
            TestNode::new(2, vec![2]),
            TestNode::new(1, vec![1, 9]),
        ];
        let rels = build_self_relations(&nodes, 1, |a, b| {
            (b.layer == a.layer + 1 && b.hits.len() == 1 && a.hits.len() == 1).then_some(0.0)
        });
        let paths = finder()
            .find_paths(&mut nodes, &rels, &Deadline::unlimited())
            .unwrap();
        assert_eq!(paths, vec![vec![0, 1, 2]]);
        assert!(nodes[3].cell.is_masked());
    }

    #[test]
    fn equal_weights_prefer_lower_index() {
        let mut nodes = vec![TestNode::new(0, vec![0]), TestNode::new(0, vec![0])];
        let paths = finder()
            .find_paths(&mut nodes, &[], &Deadline::unlimited())
            .unwrap();
        assert_eq!(paths, vec![vec![0]]);
        assert!(nodes[1].cell.is_masked());
    }

    #[test]
    fn later_passes_pick_up_broken_paths() {
        // Node 1 is the best successor of both 0 and 2; 2 loses it and must
        // be harvested on its own in a later pass.
        let mut nodes = vec![
            TestNode::new(0, vec![0]),
            TestNode::new(1, vec![1]),
            TestNode::new(0, vec![2]),
        ];
        nodes[0].weight = 2.0;
        let rels = vec![
            Relation { from: 0, to: 1, weight: 0.0 },
            Relation { from: 2, to: 1, weight: 0.0 },
        ];
        let params = PathFinderParams {
            mask_competitors: false,
            ..PathFinderParams::default()
        };
        let paths = CellularPathFinder::new(params)
            .unwrap()
            .find_paths(&mut nodes, &rels, &Deadline::unlimited())
            .unwrap();
        assert_eq!(paths, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn cycles_are_reported() {
        let mut nodes = vec![
            TestNode::new(0, vec![0]),
            TestNode::new(0, vec![1]),
            TestNode::new(0, vec![2]),
        ];
        let rels = vec![
            Relation { from: 0, to: 1, weight: 0.0 },
            Relation { from: 1, to: 2, weight: 0.0 },
            Relation { from: 2, to: 1, weight: 0.0 },
        ];
        let err = finder()
            .find_paths(&mut nodes, &rels, &Deadline::unlimited())
            .unwrap_err();
        assert!(matches!(err, FinderError::RelationCycle { remaining: 2, nodes: 3 }));
        assert!(nodes[1].cell.flags().contains(crate::automaton::CellFlags::CYCLE));
    }

    #[test]
    fn short_paths_are_rejected() {
        let mut nodes = vec![TestNode::new(0, vec![0])];
        let params = PathFinderParams {
            min_path_length: 2,
            ..PathFinderParams::default()
        };
        let paths = CellularPathFinder::new(params)
            .unwrap()
            .find_paths(&mut nodes, &[], &Deadline::unlimited())
            .unwrap();
        assert!(paths.is_empty());
        assert!(nodes[0].cell.is_usable());
    }

    #[test]
    fn passes_are_bounded() {
        let mut nodes: Vec<TestNode> = (0..5).map(|i| TestNode::new(0, vec![i])).collect();
        let params = PathFinderParams {
            max_passes: 1,
            ..PathFinderParams::default()
        };
        let paths = CellularPathFinder::new(params)
            .unwrap()
            .find_paths(&mut nodes, &[], &Deadline::unlimited())
            .unwrap();
        // Isolated nodes are all harvested in the single pass.
        assert_eq!(paths.len(), 5);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let params = PathFinderParams {
            min_path_weight: 0.0,
            ..PathFinderParams::default()
        };
        assert!(CellularPathFinder::new(params).is_err());
    }
}
