//! Local track search: facets → segments → segment pairs → tracks.

use super::params::LocalSearchParams;
use super::postprocess::{fit_hits, sort_radially};
use super::AxialTrack;
use crate::automaton::CellularPathFinder;
use crate::building::{
    build_facets, build_segment_pairs, build_segments, facet_relations, next_axial_superlayers,
    pair_relations, PairCuts,
};
use crate::deadline::Deadline;
use crate::diagnostics::LocalSearchStage;
use crate::error::Result;
use crate::hits::{HitId, HitNeighborhood, WireHit};
use crate::types::TrackOrigin;
use log::debug;
use std::collections::BTreeSet;

/// Runs both automata on the usable axial hits. Hits of the returned tracks
/// are taken; all other hits are left usable.
pub(crate) fn run(
    params: &LocalSearchParams,
    path_finder: &CellularPathFinder,
    relation_layer_window: u32,
    fit_iterations: usize,
    hits: &mut [WireHit],
    deadline: &Deadline,
) -> Result<(Vec<AxialTrack>, LocalSearchStage)> {
    let ids: Vec<HitId> = hits
        .iter()
        .filter(|hit| hit.is_axial() && hit.cell().is_usable())
        .map(WireHit::id)
        .collect();
    let mut stage = LocalSearchStage {
        input_hits: ids.len(),
        ..LocalSearchStage::default()
    };

    let neighborhood = HitNeighborhood::build(hits, &ids, params.neighbor_distance);
    let mut facets = build_facets(hits, &neighborhood, params.max_facet_chi2);
    let relations = facet_relations(&facets, relation_layer_window, params.max_facet_angle_change);
    stage.facets = facets.len();
    stage.facet_relations = relations.len();
    deadline.check("facet building")?;
    let facet_paths = path_finder.find_paths(&mut facets, &relations, deadline)?;

    let segments = build_segments(hits, &facets, &facet_paths, params.min_segment_hits);
    stage.segments = segments.len();
    for segment in &segments {
        for &h in segment.hits() {
            hits[h].cell_mut().take();
        }
    }

    let next_superlayer = next_axial_superlayers(hits);
    let cuts = PairCuts {
        max_reduced_chi2: params.max_pair_chi2,
        max_phi_gap: params.max_pair_phi_gap,
        fit_iterations,
    };
    let mut pairs = build_segment_pairs(hits, &segments, &next_superlayer, &cuts);
    let superlayer_window = next_superlayer
        .iter()
        .map(|(&a, &b)| u32::from(b - a))
        .max()
        .unwrap_or(1);
    let pair_links = pair_relations(
        &pairs,
        &segments,
        superlayer_window,
        params.max_curvature_difference,
    );
    stage.segment_pairs = pairs.len();
    stage.pair_relations = pair_links.len();
    deadline.check("segment pairing")?;
    let pair_paths = path_finder.find_paths(&mut pairs, &pair_links, deadline)?;

    let mut used_segments = BTreeSet::new();
    let mut tracks = Vec::new();
    for path in &pair_paths {
        let mut track_hits: Vec<HitId> = Vec::new();
        for &p in path {
            for segment in [pairs[p].inner(), pairs[p].outer()] {
                if used_segments.insert(segment) {
                    track_hits.extend_from_slice(segments[segment].hits());
                }
            }
        }
        let Some(&first) = path.first() else {
            continue;
        };
        let Some(fit) = fit_hits(hits, &track_hits, &pairs[first].fit().circle, fit_iterations) else {
            continue;
        };
        sort_radially(hits, &mut track_hits);
        tracks.push(AxialTrack {
            hits: track_hits,
            fit,
            origin: TrackOrigin::CellularAutomaton,
        });
    }

    let in_track: BTreeSet<HitId> = tracks.iter().flat_map(|t| t.hits.iter().copied()).collect();
    for segment in &segments {
        for &h in segment.hits() {
            if !in_track.contains(&h) {
                hits[h].cell_mut().release();
            }
        }
    }
    stage.tracks = tracks.len();
    debug!(
        "local search hits={} facets={} segments={} pairs={} tracks={}",
        stage.input_hits,
        stage.facets,
        stage.segments,
        stage.segment_pairs,
        stage.tracks
    );
    Ok((tracks, stage))
}
