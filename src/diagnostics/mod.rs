//! Diagnostics data model returned with every event.
//!
//! [`EventDiagnostics`] bundles hit counts, one report per executed stage and
//! the timing breakdown. Reports never influence the tracks.

pub mod stages;
pub mod timing;

pub use stages::{AxialHoughStage, HitCounts, LocalSearchStage, PostprocessStage, StereoStage};
pub use timing::{elapsed_ms, StageTiming, TimingBreakdown};

use serde::Serialize;

/// Stage-by-stage trace of one event.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDiagnostics {
    pub hits: HitCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axial_hough: Option<AxialHoughStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_search: Option<LocalSearchStage>,
    pub postprocess: PostprocessStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stereo: Option<StereoStage>,
    pub timings: TimingBreakdown,
}
