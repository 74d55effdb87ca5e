//! Track finder orchestrating the global and local searches.
//!
//! Overview
//! - Builds [`WireHit`](crate::hits::WireHit)s from raw hits, flagging
//!   malformed ones as background.
//! - Runs a (φ0, curvature, impact) Hough tree over the axial hits and fits
//!   every accepted region.
//! - Feeds the axial hits left over to the local search: facets, the facet
//!   automaton, segments, segment pairs and the pair automaton.
//! - Merges tracks of both searches, removes outlier hits and attaches stereo
//!   hits through a (z0, tanλ) Hough tree per track.
//!
//! Modules
//! - [`params`] – configuration types used by the finder and CLI.
//! - `pipeline` – the [`TrackFinder`] implementation.
//! - [`axial_search`], `local_search`, [`postprocess`], [`stereo`] – stages.
//!
//! Hits consumed by one stage are flagged taken on their automaton cell and
//! never reach a later stage; hits a stage gives up are released.

pub mod axial_search;
mod local_search;
pub mod params;
mod pipeline;
pub mod postprocess;
pub mod stereo;

pub use axial_search::AxialHoughSearch;
pub use params::{AxialHoughParams, FinderParams, LocalSearchParams, PostprocessParams, StereoParams};
pub use pipeline::TrackFinder;
pub use stereo::{StereoAssigner, StereoAssignment};

use crate::fit::CircleFit;
use crate::hits::HitId;
use crate::types::TrackOrigin;

/// Transverse track produced by one of the axial stages.
#[derive(Clone, Debug)]
pub struct AxialTrack {
    /// Radially ordered axial hits.
    pub hits: Vec<HitId>,
    pub fit: CircleFit,
    pub origin: TrackOrigin,
}
