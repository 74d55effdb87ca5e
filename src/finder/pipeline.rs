//! Finder pipeline turning raw hits into seed track candidates.
//!
//! Typical usage:
//! ```no_run
//! use cdc_seed_finder::hits::{CylindricalLayout, LayoutParams, RawHit};
//! use cdc_seed_finder::{FinderParams, TrackFinder};
//!
//! # fn example(raw: Vec<RawHit>) -> cdc_seed_finder::Result<()> {
//! let layout = CylindricalLayout::new(LayoutParams::default())?;
//! let finder = TrackFinder::new(FinderParams::default())?;
//! let result = finder.process_event(&raw, &layout)?;
//! for track in &result.tracks {
//!     println!("{} hits, curvature {:.4}", track.hits.len(), track.parameters.curvature);
//! }
//! # Ok(())
//! # }
//! ```

// Stages
// - Hits: build WireHits, flag malformed input as background.
// - Axial Hough: (φ0, κ, d0) tree passes with a falling hit threshold; regions are fitted and taken.
// - Local search: facet automaton → segments → segment-pair automaton on the rest.
// - Postprocess: merge compatible tracks, drop outliers and short tracks, append unused hits.
// - Stereo: per track (largest first) reconstruct stereo hits and run a (z0, tanλ) tree.
// - Output: finalize hit cells and assemble candidates with diagnostics.

use super::params::FinderParams;
use super::postprocess::{append_unused_hits, clean_track, merge_tracks, sort_radially};
use super::stereo::{StereoAssigner, StereoAssignment};
use super::{local_search, AxialHoughSearch, AxialTrack};
use crate::automaton::CellularPathFinder;
use crate::deadline::Deadline;
use crate::diagnostics::{EventDiagnostics, HitCounts, PostprocessStage, StereoStage, TimingBreakdown};
use crate::error::Result;
use crate::hits::{build_wire_hits, RawHit, WireGeometry, WireHit};
use crate::types::{EventResult, FitQuality, TrackCandidate, TrackParameters};
use log::debug;
use rayon::prelude::*;
use std::time::Instant;

/// Seed track finder. Immutable after construction; events are independent.
#[derive(Clone, Debug)]
pub struct TrackFinder {
    params: FinderParams,
    axial: AxialHoughSearch,
    path_finder: CellularPathFinder,
    stereo: StereoAssigner,
}

impl TrackFinder {
    /// Validates `params` and prepares the Hough trees of both searches.
    pub fn new(params: FinderParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            axial: AxialHoughSearch::new(&params.axial_hough)?,
            path_finder: CellularPathFinder::new(params.automaton.clone())?,
            stereo: StereoAssigner::new(&params.stereo)?,
            params,
        })
    }

    pub fn params(&self) -> &FinderParams {
        &self.params
    }

    /// Runs every enabled stage on one event.
    pub fn process_event<G>(&self, raw: &[RawHit], geometry: &G) -> Result<EventResult>
    where
        G: WireGeometry + ?Sized,
    {
        let total_start = Instant::now();
        let deadline = Deadline::from_budget_ms(self.params.time_budget_ms);
        let mut timings = TimingBreakdown::default();
        let iterations = self.params.fit_iterations;

        let stage_start = Instant::now();
        let mut hits = build_wire_hits(raw, geometry);
        let mut counts = HitCounts::of(&hits);
        timings.record_since("hits", stage_start);

        let mut tracks: Vec<AxialTrack> = Vec::new();

        let axial_hough = if self.params.axial_hough.enabled {
            let stage_start = Instant::now();
            let (found, stage) = self.axial.run(
                &mut hits,
                &self.params.postprocess,
                iterations,
                &deadline,
            )?;
            let ms = timings.record_since("axial_hough", stage_start);
            debug!(
                "axial hough: {} hits -> {} tracks, {} nodes ({ms:.2} ms)",
                stage.input_hits, stage.tracks, stage.tree.nodes
            );
            tracks.extend(found);
            Some(stage)
        } else {
            None
        };

        let local = if self.params.local_search.enabled {
            let stage_start = Instant::now();
            let (found, stage) = local_search::run(
                &self.params.local_search,
                &self.path_finder,
                self.params.relation_layer_window,
                iterations,
                &mut hits,
                &deadline,
            )?;
            let ms = timings.record_since("local_search", stage_start);
            debug!("local search: {} tracks ({ms:.2} ms)", stage.tracks);
            tracks.extend(found);
            Some(stage)
        } else {
            None
        };

        let stage_start = Instant::now();
        let mut postprocess = PostprocessStage {
            input_tracks: tracks.len(),
            ..PostprocessStage::default()
        };
        let merged = merge_tracks(&hits, tracks, &self.params.postprocess, iterations, &mut postprocess);
        let mut tracks: Vec<AxialTrack> = merged
            .into_iter()
            .filter_map(|track| {
                clean_track(&mut hits, track, &self.params.postprocess, iterations, &mut postprocess)
            })
            .collect();
        if self.params.postprocess.append_unused_hits {
            append_unused_hits(
                &mut hits,
                &mut tracks,
                &self.params.postprocess,
                iterations,
                &mut postprocess,
            );
        }
        let ms = timings.record_since("postprocess", stage_start);
        debug!(
            "postprocess: {} -> {} tracks, {} merged, {} hits released, {} appended ({ms:.2} ms)",
            postprocess.input_tracks,
            tracks.len(),
            postprocess.merged,
            postprocess.released_hits,
            postprocess.appended_hits
        );

        let mut assignments: Vec<Option<StereoAssignment>> = vec![None; tracks.len()];
        let stereo = if self.params.stereo.enabled {
            let stage_start = Instant::now();
            let mut stage = StereoStage::default();
            let mut order: Vec<usize> = (0..tracks.len()).collect();
            order.sort_by(|&a, &b| tracks[b].hits.len().cmp(&tracks[a].hits.len()));
            for i in order {
                deadline.check("stereo assignment")?;
                assignments[i] = self.stereo.assign(&mut hits, &tracks[i].fit.circle, &deadline, &mut stage)?;
            }
            let ms = timings.record_since("stereo", stage_start);
            debug!(
                "stereo: {} of {} tracks, {} hits ({ms:.2} ms)",
                stage.tracks_with_stereo,
                tracks.len(),
                stage.assigned_hits
            );
            Some(stage)
        } else {
            None
        };

        let candidates = assemble_candidates(&mut hits, &tracks, &assignments);
        counts.assigned = candidates.iter().map(|c| c.hits.len()).sum();
        timings.total_ms = crate::diagnostics::elapsed_ms(total_start);
        debug!(
            "event: {} hits -> {} candidates in {:.2} ms",
            counts.total,
            candidates.len(),
            timings.total_ms
        );

        Ok(EventResult {
            tracks: candidates,
            diagnostics: EventDiagnostics {
                hits: counts,
                axial_hough,
                local_search: local,
                postprocess,
                stereo,
                timings,
            },
        })
    }

    /// Processes independent events in parallel. Results keep the input order.
    pub fn process_events<G>(&self, events: &[Vec<RawHit>], geometry: &G) -> Vec<Result<EventResult>>
    where
        G: WireGeometry + Sync + ?Sized,
    {
        events
            .par_iter()
            .map(|raw| self.process_event(raw, geometry))
            .collect()
    }
}

/// Final hit bookkeeping and conversion into output candidates.
fn assemble_candidates(
    hits: &mut [WireHit],
    tracks: &[AxialTrack],
    assignments: &[Option<StereoAssignment>],
) -> Vec<TrackCandidate> {
    tracks
        .iter()
        .zip(assignments)
        .map(|(track, assignment)| {
            let mut ids = track.hits.clone();
            let mut parameters = TrackParameters::from_circle(&track.fit.circle);
            let mut stereo_hit_count = 0;
            if let Some(assignment) = assignment {
                ids.extend_from_slice(&assignment.hits);
                stereo_hit_count = assignment.hits.len();
                parameters = parameters.with_sz(&assignment.line);
            }
            sort_radially(hits, &mut ids);
            for &h in &ids {
                hits[h].cell_mut().finalize();
            }
            TrackCandidate {
                hits: ids,
                stereo_hit_count,
                parameters,
                fit_quality: FitQuality {
                    chi2: track.fit.chi2,
                    ndf: track.fit.ndf,
                },
                origin: track.origin,
            }
        })
        .collect()
}
