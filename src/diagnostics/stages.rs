use crate::hits::WireHit;
use crate::hough::TreeStats;
use serde::Serialize;

/// Hit bookkeeping of one event.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HitCounts {
    pub total: usize,
    pub background: usize,
    pub axial: usize,
    pub stereo: usize,
    /// Hits attached to an output track.
    pub assigned: usize,
}

impl HitCounts {
    pub fn of(hits: &[WireHit]) -> Self {
        let usable = hits.iter().filter(|h| !h.cell().is_background());
        let axial = usable.clone().filter(|h| h.is_axial()).count();
        let stereo = usable.count() - axial;
        Self {
            total: hits.len(),
            background: hits.iter().filter(|h| h.cell().is_background()).count(),
            axial,
            stereo,
            assigned: 0,
        }
    }
}

/// Outcome of the axial Hough search.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxialHoughStage {
    pub input_hits: usize,
    /// Search passes run, one per hit threshold.
    pub passes: usize,
    /// Node counts summed over all passes.
    pub tree: TreeStats,
    pub candidates: usize,
    pub tracks: usize,
}

/// Outcome of the facet and segment-pair automata.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalSearchStage {
    pub input_hits: usize,
    pub facets: usize,
    pub facet_relations: usize,
    pub segments: usize,
    pub segment_pairs: usize,
    pub pair_relations: usize,
    pub tracks: usize,
}

/// Track merging and cleanup.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostprocessStage {
    pub input_tracks: usize,
    pub merged: usize,
    pub released_hits: usize,
    pub dropped_tracks: usize,
    pub appended_hits: usize,
}

/// Stereo assignment over all tracks.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StereoStage {
    pub tracks_with_stereo: usize,
    pub assigned_hits: usize,
    pub reconstructed_hits: usize,
    pub tree_nodes: usize,
}
