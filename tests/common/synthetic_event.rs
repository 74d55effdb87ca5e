use cdc_seed_finder::hits::{CylindricalLayout, LayoutParams, RawHit};
use cdc_seed_finder::synthetic::{track_hits, SyntheticEvent, TruthTrack};
use cdc_seed_finder::{EventResult, TrackCandidate};

/// Default Belle-II-like chamber.
pub fn layout() -> CylindricalLayout {
    CylindricalLayout::new(LayoutParams::default()).expect("default layout")
}

/// Axial hits of `track` in radial order.
pub fn axial_hits(layout: &CylindricalLayout, track: &TruthTrack) -> Vec<RawHit> {
    track_hits(layout, track)
        .into_iter()
        .filter(|hit| layout.superlayer_kind(hit.superlayer).map_or(false, |k| k.is_axial()))
        .collect()
}

/// Best matching candidate of a truth track.
pub struct TrackMatch<'a> {
    pub candidate: &'a TrackCandidate,
    /// Candidate hits produced by the truth track.
    pub shared: usize,
    /// `shared` over the candidate's hit count.
    pub purity: f64,
}

/// Candidate sharing the most hits with truth track `track`.
pub fn best_match<'a>(
    result: &'a EventResult,
    event: &SyntheticEvent,
    track: usize,
) -> Option<TrackMatch<'a>> {
    result
        .tracks
        .iter()
        .map(|candidate| {
            let shared = candidate
                .hits
                .iter()
                .filter(|&&h| event.truth[h] == Some(track))
                .count();
            TrackMatch {
                candidate,
                shared,
                purity: shared as f64 / candidate.hits.len().max(1) as f64,
            }
        })
        .filter(|m| m.shared > 0)
        .max_by_key(|m| m.shared)
}
