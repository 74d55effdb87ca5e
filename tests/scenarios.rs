mod common;

use cdc_seed_finder::automaton::{
    build_self_relations, AutomatonCell, AutomatonNode, LayerOrdered, Relation,
};
use cdc_seed_finder::deadline::Deadline;
use cdc_seed_finder::finder::axial_search::axial_item;
use cdc_seed_finder::finder::AxialHoughParams;
use cdc_seed_finder::hits::{build_wire_hits, HitId, RawHit, WireHit};
use cdc_seed_finder::hough::{select_candidates, AxialHitPredicate, HoughCandidate, HoughTree};
use cdc_seed_finder::stages::{CellularPathFinder, PathFinderParams};
use cdc_seed_finder::synthetic::TruthTrack;
use cdc_seed_finder::{FinderError, FinderParams, TrackFinder};
use common::synthetic_event::{axial_hits, layout};
use std::collections::BTreeSet;

fn truth(curvature: f64, phi0: f64) -> TruthTrack {
    TruthTrack {
        curvature,
        phi0,
        impact: 0.0,
        z0: 0.0,
        tan_lambda: 0.0,
    }
}

/// Axial Hough search with `min_items` hits per region on `raw`.
fn hough_regions(raw: &[RawHit], min_items: usize) -> Vec<HoughCandidate<3>> {
    let layout = layout();
    let hits = build_wire_hits(raw, &layout);
    let params = AxialHoughParams::default();
    let tree = HoughTree::new(
        [
            params.phi0.build("phi0").unwrap(),
            params.curvature.build("curvature").unwrap(),
            params.impact.build("impact").unwrap(),
        ],
        [params.phi0.divisions, params.curvature.divisions, params.impact.divisions],
        params.max_level,
        min_items,
    )
    .unwrap();
    let items: Vec<_> = hits.iter().map(axial_item).collect();
    let candidates: Vec<HitId> = hits.iter().map(WireHit::id).collect();
    let outcome = tree
        .search(
            &AxialHitPredicate {
                tolerance: params.tolerance,
            },
            &items,
            &candidates,
            &Deadline::unlimited(),
            "scenario",
        )
        .unwrap();
    let mut taken = vec![false; hits.len()];
    select_candidates(&outcome.leaves, min_items, &mut taken)
}

#[test]
fn empty_event_has_no_candidates() {
    let finder = TrackFinder::new(FinderParams::default()).unwrap();
    let result = finder.process_event(&[], &layout()).unwrap();
    assert!(result.tracks.is_empty());
    assert!(hough_regions(&[], 1).is_empty());
}

#[test]
fn single_hit_has_no_candidates() {
    let raw: Vec<RawHit> = axial_hits(&layout(), &truth(0.02, 0.7)).into_iter().take(1).collect();
    assert!(hough_regions(&raw, 2).is_empty());
}

#[test]
fn ten_hits_on_one_circle_form_one_region() {
    let raw: Vec<RawHit> = axial_hits(&layout(), &truth(0.02, 0.7)).into_iter().take(10).collect();
    assert_eq!(raw.len(), 10);
    let regions = hough_regions(&raw, 10);
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].items, (0..10).collect::<Vec<_>>());
    let [phi0, curvature, _] = regions[0].center();
    assert!((curvature - 0.02).abs() < 2e-3, "curvature {curvature}");
    assert!((phi0 - 0.7).abs() < 0.05, "phi0 {phi0}");
}

#[test]
fn two_separated_clusters_form_two_disjoint_regions() {
    let layout = layout();
    let mut raw: Vec<RawHit> = axial_hits(&layout, &truth(0.02, 0.7)).into_iter().take(8).collect();
    raw.extend(axial_hits(&layout, &truth(0.006, -1.5)).into_iter().take(8));
    assert_eq!(raw.len(), 16);

    let regions = hough_regions(&raw, 8);
    assert_eq!(regions.len(), 2);
    let first: BTreeSet<usize> = regions[0].items.iter().copied().collect();
    let second: BTreeSet<usize> = regions[1].items.iter().copied().collect();
    assert!(first.is_disjoint(&second));
    let mut clusters = [first, second];
    clusters.sort();
    assert_eq!(clusters[0], (0..8).collect::<BTreeSet<_>>());
    assert_eq!(clusters[1], (8..16).collect::<BTreeSet<_>>());
}

struct Block {
    layer: u32,
    hits: Vec<HitId>,
    cell: AutomatonCell,
}

impl Block {
    fn new(layer: u32, hits: Vec<HitId>) -> Self {
        Self {
            layer,
            hits,
            cell: AutomatonCell::new(),
        }
    }
}

impl LayerOrdered for Block {
    fn layer(&self) -> u32 {
        self.layer
    }
}

impl AutomatonNode for Block {
    fn cell(&self) -> &AutomatonCell {
        &self.cell
    }
    fn cell_mut(&mut self) -> &mut AutomatonCell {
        &mut self.cell
    }
    fn intrinsic_weight(&self) -> f64 {
        1.0
    }
    fn hit_ids(&self) -> &[HitId] {
        &self.hits
    }
}

fn path_finder() -> CellularPathFinder {
    CellularPathFinder::new(PathFinderParams::default()).unwrap()
}

#[test]
fn fully_connected_blocks_form_one_path() {
    let mut blocks: Vec<Block> = (0..10).map(|i| Block::new(i, vec![i as usize])).collect();
    let relations = build_self_relations(&blocks, 10, |_, _| Some(0.0));
    let paths = path_finder()
        .find_paths(&mut blocks, &relations, &Deadline::unlimited())
        .unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0], (0..10).collect::<Vec<_>>());
}

#[test]
fn separated_chains_form_two_paths_without_shared_hits() {
    let mut blocks: Vec<Block> = (0..16)
        .map(|i| Block::new((i % 8) as u32, vec![i as usize]))
        .collect();
    let relations = build_self_relations(&blocks, 1, |a, b| {
        ((a.hits[0] < 8) == (b.hits[0] < 8) && b.layer == a.layer + 1).then_some(0.0)
    });
    let paths = path_finder()
        .find_paths(&mut blocks, &relations, &Deadline::unlimited())
        .unwrap();
    assert_eq!(paths.len(), 2);
    let hits: Vec<BTreeSet<HitId>> = paths
        .iter()
        .map(|path| path.iter().flat_map(|&i| blocks[i].hits.clone()).collect())
        .collect();
    assert!(hits[0].is_disjoint(&hits[1]));
    assert_eq!(hits[0].len() + hits[1].len(), 16);
}

#[test]
fn cyclic_relations_are_reported() {
    let mut blocks: Vec<Block> = (0..3).map(|i| Block::new(i, vec![i as usize])).collect();
    let relations = vec![
        Relation { from: 0, to: 1, weight: 0.0 },
        Relation { from: 1, to: 2, weight: 0.0 },
        Relation { from: 2, to: 0, weight: 0.0 },
    ];
    let err = path_finder()
        .find_paths(&mut blocks, &relations, &Deadline::unlimited())
        .unwrap_err();
    assert!(matches!(err, FinderError::RelationCycle { .. }), "{err}");
}

#[test]
fn invalid_configuration_builds_no_finder() {
    let mut params = FinderParams::default();
    params.axial_hough.phi0.bins = 0;
    assert!(matches!(TrackFinder::new(params), Err(FinderError::InvalidConfig(_))));

    let mut params = FinderParams::default();
    params.stereo.z0.lower = 40.0;
    assert!(matches!(TrackFinder::new(params), Err(FinderError::InvalidConfig(_))));

    let mut params = FinderParams::default();
    params.automaton.max_passes = 0;
    assert!(TrackFinder::new(params).is_err());
}
