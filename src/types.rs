use crate::diagnostics::EventDiagnostics;
use crate::hits::HitId;
use crate::trajectory::{PerigeeCircle, SzLine};
use serde::{Deserialize, Serialize};

/// Stage that produced a track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackOrigin {
    AxialHough,
    CellularAutomaton,
    /// Union of two or more tracks from either stage.
    Merged,
}

/// Coarse helix parameters at the perigee.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackParameters {
    pub curvature: f64,
    pub phi0: f64,
    pub impact: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z0: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tan_lambda: Option<f64>,
}

impl TrackParameters {
    pub fn from_circle(circle: &PerigeeCircle) -> Self {
        Self {
            curvature: circle.curvature,
            phi0: circle.phi0,
            impact: circle.impact,
            z0: None,
            tan_lambda: None,
        }
    }

    pub fn circle(&self) -> PerigeeCircle {
        PerigeeCircle::new(self.curvature, self.phi0, self.impact)
    }

    pub fn with_sz(mut self, line: &SzLine) -> Self {
        self.z0 = Some(line.z0);
        self.tan_lambda = Some(line.tan_lambda);
        self
    }
}

/// Quality of the transverse fit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitQuality {
    pub chi2: f64,
    pub ndf: usize,
}

impl FitQuality {
    pub fn reduced_chi2(&self) -> f64 {
        if self.ndf == 0 {
            self.chi2
        } else {
            self.chi2 / self.ndf as f64
        }
    }
}

/// Seed track found in one event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackCandidate {
    /// Axial and stereo hits, radially ordered (layer, then hit id).
    pub hits: Vec<HitId>,
    pub stereo_hit_count: usize,
    pub parameters: TrackParameters,
    pub fit_quality: FitQuality,
    pub origin: TrackOrigin,
}

/// Output of [`TrackFinder::process_event`](crate::TrackFinder::process_event).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResult {
    pub tracks: Vec<TrackCandidate>,
    pub diagnostics: EventDiagnostics,
}
