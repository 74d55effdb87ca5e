//! Track merging and outlier removal.

use super::AxialTrack;
use crate::diagnostics::PostprocessStage;
use crate::fit::{fit_drift_circles, refit_with_drift, CircleFit, DriftObservation};
use crate::finder::params::PostprocessParams;
use crate::hits::{hit_key, HitId, WireHit};
use crate::trajectory::PerigeeCircle;
use crate::types::TrackOrigin;
use log::debug;

/// Drift-circle fit of `ids`, once from `start` and once from the
/// drift-corrected Karimäki refit around `start`. The lower χ² wins.
pub(crate) fn fit_hits(
    hits: &[WireHit],
    ids: &[HitId],
    start: &PerigeeCircle,
    iterations: usize,
) -> Option<CircleFit> {
    let observations: Vec<DriftObservation> = ids.iter().map(|&h| hits[h].drift_observation()).collect();
    let from_start = fit_drift_circles(&observations, start, iterations);
    let from_refit = refit_with_drift(&observations, start)
        .and_then(|seed| fit_drift_circles(&observations, &seed.circle, iterations));
    match (from_start, from_refit) {
        (Some(a), Some(b)) => Some(if b.chi2 < a.chi2 { b } else { a }),
        (a, b) => a.or(b),
    }
}

/// Sorts hit ids radially.
pub(crate) fn sort_radially(hits: &[WireHit], ids: &mut [HitId]) {
    ids.sort_by_key(|&h| hit_key(&hits[h]));
}

fn outlier_cut(obs: &DriftObservation, params: &PostprocessParams) -> f64 {
    params.outlier_factor * obs.variance.max(0.0).sqrt() + params.outlier_drift_window
}

/// Hits of `ids` whose residual against `circle` stays within
/// `outlier_factor·σ + outlier_drift_window`. Returns `ids` unchanged when
/// fewer than `min_track_hits` would survive.
pub fn remove_outliers(
    hits: &[WireHit],
    ids: &[HitId],
    circle: &PerigeeCircle,
    params: &PostprocessParams,
) -> Vec<HitId> {
    let kept: Vec<HitId> = ids
        .iter()
        .copied()
        .filter(|&h| {
            let obs = hits[h].drift_observation();
            obs.residual(circle).abs() <= outlier_cut(&obs, params)
        })
        .collect();
    if kept.len() >= params.min_track_hits {
        kept
    } else {
        ids.to_vec()
    }
}

/// Removes outliers and refits. Hits dropped from the track are released.
/// Returns `None` (releasing every hit) when the track ends up with fewer
/// than `min_track_hits` hits or the fit fails.
pub(crate) fn clean_track(
    hits: &mut [WireHit],
    track: AxialTrack,
    params: &PostprocessParams,
    iterations: usize,
    stage: &mut PostprocessStage,
) -> Option<AxialTrack> {
    let kept = remove_outliers(hits, &track.hits, &track.fit.circle, params);
    let refit = if kept.len() == track.hits.len() {
        Some(track.fit)
    } else {
        fit_hits(hits, &kept, &track.fit.circle, iterations)
    };

    let accepted = match refit {
        Some(fit) if kept.len() >= params.min_track_hits => Some((kept, fit)),
        _ => None,
    };
    let Some((kept, fit)) = accepted else {
        for &h in &track.hits {
            hits[h].cell_mut().release();
        }
        stage.released_hits += track.hits.len();
        stage.dropped_tracks += 1;
        return None;
    };

    for &h in track.hits.iter().filter(|h| !kept.contains(h)) {
        hits[h].cell_mut().release();
        stage.released_hits += 1;
    }
    Some(AxialTrack {
        hits: kept,
        fit,
        origin: track.origin,
    })
}

/// Attaches every usable axial hit to the track with the smallest residual,
/// provided it passes the outlier cut and lies ahead of the perigee, then
/// refits the grown tracks. New hits are taken only when the refit succeeds.
pub(crate) fn append_unused_hits(
    hits: &mut [WireHit],
    tracks: &mut [AxialTrack],
    params: &PostprocessParams,
    iterations: usize,
    stage: &mut PostprocessStage,
) {
    let mut additions: Vec<Vec<HitId>> = vec![Vec::new(); tracks.len()];
    for hit in hits.iter().filter(|h| h.is_axial() && h.cell().is_usable()) {
        let obs = hit.drift_observation();
        let cut = outlier_cut(&obs, params);
        let best = tracks
            .iter()
            .enumerate()
            .filter(|(_, track)| track.fit.circle.arc_length_to(&obs.position) > 0.0)
            .map(|(i, track)| (i, obs.residual(&track.fit.circle).abs()))
            .filter(|&(_, residual)| residual <= cut)
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((i, _)) = best {
            additions[i].push(hit.id());
        }
    }

    for (track, added) in tracks.iter_mut().zip(additions) {
        if added.is_empty() {
            continue;
        }
        let mut grown: Vec<HitId> = track.hits.iter().chain(&added).copied().collect();
        sort_radially(hits, &mut grown);
        let Some(fit) = fit_hits(hits, &grown, &track.fit.circle, iterations) else {
            continue;
        };
        for &h in &added {
            hits[h].cell_mut().take();
        }
        debug!("appended {} unused hits to a track of {} hits", added.len(), track.hits.len());
        stage.appended_hits += added.len();
        track.hits = grown;
        track.fit = fit;
    }
}

/// Greedy pairwise merging in discovery order: a later track is absorbed by
/// the first earlier track whose curvature agrees and whose joint fit passes.
pub(crate) fn merge_tracks(
    hits: &[WireHit],
    tracks: Vec<AxialTrack>,
    params: &PostprocessParams,
    iterations: usize,
    stage: &mut PostprocessStage,
) -> Vec<AxialTrack> {
    let mut merged: Vec<AxialTrack> = Vec::with_capacity(tracks.len());
    for track in tracks {
        let mut absorbed = false;
        for existing in merged.iter_mut() {
            let difference = (existing.fit.circle.curvature - track.fit.circle.curvature).abs();
            if difference > params.merge_curvature_difference {
                continue;
            }
            let mut union: Vec<HitId> = existing.hits.iter().chain(&track.hits).copied().collect();
            sort_radially(hits, &mut union);
            union.dedup();
            let start = if existing.hits.len() >= track.hits.len() {
                existing.fit.circle
            } else {
                track.fit.circle
            };
            let Some(fit) = fit_hits(hits, &union, &start, iterations) else {
                continue;
            };
            if fit.reduced_chi2() > params.merge_chi2 {
                continue;
            }
            debug!(
                "merging track ({} hits) into track ({} hits), reduced chi2 {:.3}",
                track.hits.len(),
                existing.hits.len(),
                fit.reduced_chi2()
            );
            existing.hits = union;
            existing.fit = fit;
            existing.origin = TrackOrigin::Merged;
            stage.merged += 1;
            absorbed = true;
            break;
        }
        if !absorbed {
            merged.push(track);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hits::{build_wire_hits, CylindricalLayout, LayoutParams, RawHit};

    fn layout() -> CylindricalLayout {
        CylindricalLayout::new(LayoutParams::default()).unwrap()
    }

    /// Axial hits of a circle through the origin in superlayers 0, 2 and 4.
    fn track_raw(layout: &CylindricalLayout, track: &PerigeeCircle) -> Vec<RawHit> {
        let k = track.curvature.abs();
        [0u8, 2, 4]
            .iter()
            .flat_map(|&sl| layout.layers_of_superlayer(sl))
            .map(|layer| {
                let r = layout.layer_radius(layer);
                let s = if k < 1e-9 { r } else { 2.0 / k * (0.5 * k * r).asin() };
                let line = layout
                    .nearest_wire(layer, &track.position_at(s), 0.0)
                    .expect("wire");
                RawHit {
                    layer,
                    wire: line.id.wire,
                    superlayer: line.superlayer,
                    position: [line.reference.x, line.reference.y],
                    drift_length: track.signed_distance(&line.reference).abs(),
                    drift_length_variance: 1e-4,
                    right_left: None,
                }
            })
            .collect()
    }

    fn axial_track(hits: &[WireHit], ids: Vec<HitId>, truth: &PerigeeCircle) -> AxialTrack {
        let fit = fit_hits(hits, &ids, truth, 10).expect("fit");
        AxialTrack {
            hits: ids,
            fit,
            origin: TrackOrigin::AxialHough,
        }
    }

    #[test]
    fn outlier_is_removed_and_released() {
        let layout = layout();
        let truth = PerigeeCircle::new(0.01, 0.4, 0.0);
        let mut raw = track_raw(&layout, &truth);
        // Misplaced drift length on one hit.
        raw[5].drift_length += 0.5;
        let mut hits = build_wire_hits(&raw, &layout);
        let ids: Vec<HitId> = (0..hits.len()).collect();
        for &h in &ids {
            hits[h].cell_mut().take();
        }
        let track = axial_track(&hits, ids, &truth);
        let mut stage = PostprocessStage::default();
        let cleaned = clean_track(&mut hits, track, &PostprocessParams::default(), 10, &mut stage)
            .expect("track survives");
        assert!(!cleaned.hits.contains(&5));
        assert_eq!(cleaned.hits.len(), raw.len() - 1);
        assert!(hits[5].cell().is_usable());
        assert_eq!(stage.released_hits, 1);
        assert!((cleaned.fit.circle.curvature - truth.curvature).abs() < 1e-4);
    }

    #[test]
    fn short_track_is_dropped() {
        let layout = layout();
        let truth = PerigeeCircle::new(-0.008, 2.0, 0.0);
        let raw = track_raw(&layout, &truth);
        let mut hits = build_wire_hits(&raw, &layout);
        let ids: Vec<HitId> = (0..6).collect();
        let track = axial_track(&hits, ids, &truth);
        let mut stage = PostprocessStage::default();
        assert!(clean_track(&mut hits, track, &PostprocessParams::default(), 10, &mut stage).is_none());
        assert_eq!(stage.dropped_tracks, 1);
    }

    #[test]
    fn halves_of_one_track_merge() {
        let layout = layout();
        let truth = PerigeeCircle::new(0.006, -1.5, 0.0);
        let raw = track_raw(&layout, &truth);
        let hits = build_wire_hits(&raw, &layout);
        let split = hits.len() / 2;
        let inner = axial_track(&hits, (0..split).collect(), &truth);
        let outer = axial_track(&hits, (split..hits.len()).collect(), &truth);

        let mut stage = PostprocessStage::default();
        let merged = merge_tracks(&hits, vec![inner, outer], &PostprocessParams::default(), 10, &mut stage);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].hits.len(), hits.len());
        assert_eq!(merged[0].origin, TrackOrigin::Merged);
        assert_eq!(stage.merged, 1);
    }

    #[test]
    fn unused_hits_join_their_track() {
        let layout = layout();
        let truth = PerigeeCircle::new(0.01, 0.4, 0.0);
        let mut raw = track_raw(&layout, &truth);
        let last = raw.len() - 1;
        // Off the trajectory by half a centimetre.
        raw[last].drift_length += 0.5;
        let mut hits = build_wire_hits(&raw, &layout);
        let kept: Vec<HitId> = (0..last).step_by(2).collect();
        for &h in &kept {
            hits[h].cell_mut().take();
        }
        let mut tracks = vec![axial_track(&hits, kept.clone(), &truth)];

        let mut stage = PostprocessStage::default();
        append_unused_hits(&mut hits, &mut tracks, &PostprocessParams::default(), 10, &mut stage);
        let expected = hits.len() - kept.len() - 1;
        assert_eq!(stage.appended_hits, expected);
        assert_eq!(tracks[0].hits.len(), kept.len() + expected);
        assert!(tracks[0].hits.windows(2).all(|w| hit_key(&hits[w[0]]) <= hit_key(&hits[w[1]])));
        assert!(!tracks[0].hits.contains(&last));
        assert!(hits[last].cell().is_usable());
        assert!(tracks[0].hits.iter().all(|&h| hits[h].cell().is_taken()));
        assert!((tracks[0].fit.circle.curvature - truth.curvature).abs() < 1e-4);
    }

    #[test]
    fn coarse_start_still_fits() {
        let layout = layout();
        let truth = PerigeeCircle::new(-0.012, 2.4, 0.0);
        let hits = build_wire_hits(&track_raw(&layout, &truth), &layout);
        let ids: Vec<HitId> = (0..hits.len()).collect();
        let start = PerigeeCircle::new(-0.009, 2.45, 0.0);
        let fit = fit_hits(&hits, &ids, &start, 10).expect("fit");
        assert!((fit.circle.curvature - truth.curvature).abs() < 1e-4, "{}", fit.circle.curvature);
        assert!(crate::angle::wrap_angle(fit.circle.phi0 - truth.phi0).abs() < 1e-3);
        assert!(fit.reduced_chi2() < 1.0);
    }

    #[test]
    fn different_tracks_stay_apart() {
        let layout = layout();
        let first = PerigeeCircle::new(0.006, -1.5, 0.0);
        let second = PerigeeCircle::new(0.0065, 1.5, 0.0);
        let mut raw = track_raw(&layout, &first);
        let split = raw.len();
        raw.extend(track_raw(&layout, &second));
        let hits = build_wire_hits(&raw, &layout);
        let a = axial_track(&hits, (0..split).collect(), &first);
        let b = axial_track(&hits, (split..hits.len()).collect(), &second);
        let mut stage = PostprocessStage::default();
        let merged = merge_tracks(&hits, vec![a, b], &PostprocessParams::default(), 10, &mut stage);
        assert_eq!(merged.len(), 2);
        assert_eq!(stage.merged, 0);
    }
}
