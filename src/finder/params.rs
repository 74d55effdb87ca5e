//! Parameter types configuring the finder stages.
//!
//! The pipeline runs an axial Hough search first, a local cellular-automaton
//! search on the remaining axial hits second, then merges and cleans the
//! axial tracks and finally attaches stereo hits.
//!
//! Defaults are tuned for the Belle-II-like [`CylindricalLayout`] with drift
//! lengths in cm. When tuning, start with the Hough tolerances and
//! `min_items_per_leaf`.
//!
//! [`CylindricalLayout`]: crate::hits::CylindricalLayout

use crate::automaton::PathFinderParams;
use crate::error::{FinderError, Result};
use crate::hough::AxisParams;
use serde::{Deserialize, Serialize};

/// Finder-wide parameters controlling the multi-stage pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderParams {
    pub axial_hough: AxialHoughParams,
    pub local_search: LocalSearchParams,
    /// Cellular automaton used for facets and segment pairs.
    pub automaton: PathFinderParams,
    /// Forward layer window offered to the facet relation filter (>= 1).
    pub relation_layer_window: u32,
    pub postprocess: PostprocessParams,
    pub stereo: StereoParams,
    /// Per-event time budget in milliseconds; `None` disables the deadline.
    pub time_budget_ms: Option<f64>,
    /// Gauss-Newton iterations of every drift-circle fit.
    pub fit_iterations: usize,
}

impl Default for FinderParams {
    fn default() -> Self {
        Self {
            axial_hough: AxialHoughParams::default(),
            local_search: LocalSearchParams::default(),
            automaton: PathFinderParams::default(),
            relation_layer_window: 2,
            postprocess: PostprocessParams::default(),
            stereo: StereoParams::default(),
            time_budget_ms: None,
            fit_iterations: 10,
        }
    }
}

impl FinderParams {
    /// Checks every contract; a finder is only built from valid parameters.
    pub fn validate(&self) -> Result<()> {
        self.axial_hough.validate()?;
        self.local_search.validate()?;
        self.automaton.validate()?;
        if self.relation_layer_window == 0 {
            return Err(FinderError::invalid("relation_layer_window must be at least 1"));
        }
        self.postprocess.validate()?;
        self.stereo.validate()?;
        if let Some(budget) = self.time_budget_ms {
            if !(budget.is_finite() && budget > 0.0) {
                return Err(FinderError::invalid("time_budget_ms must be positive"));
            }
        }
        if self.fit_iterations == 0 {
            return Err(FinderError::invalid("fit_iterations must be at least 1"));
        }
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FinderError::invalid(format!("{name} must be positive, got {value}")))
    }
}

fn tree_limits(stage: &str, max_level: u32, min_items: usize) -> Result<()> {
    if max_level == 0 {
        return Err(FinderError::invalid(format!("{stage} max_level must be at least 1")));
    }
    if min_items == 0 {
        return Err(FinderError::invalid(format!(
            "{stage} min_items_per_leaf must be at least 1"
        )));
    }
    Ok(())
}

/// Hough search over (φ0, curvature, impact) for axial hits.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AxialHoughParams {
    pub enabled: bool,
    pub phi0: AxisParams,
    /// Signed curvature in 1/cm.
    pub curvature: AxisParams,
    /// Impact parameter in cm; fixed to zero by default (origin tracks).
    pub impact: AxisParams,
    /// Maximal tree depth.
    pub max_level: u32,
    /// Minimal hits of a populated node and of an accepted region in the
    /// last search pass.
    pub min_items_per_leaf: usize,
    /// Hit threshold of the first search pass. Each further pass scales the
    /// threshold by `threshold_step` until `min_items_per_leaf` is reached.
    pub initial_min_items: usize,
    /// Factor in (0, 1) applied to the threshold between passes.
    pub threshold_step: f64,
    /// Slack of the sign-consistency test in cm.
    pub tolerance: f64,
}

impl Default for AxialHoughParams {
    fn default() -> Self {
        Self {
            enabled: true,
            phi0: AxisParams::new(-std::f64::consts::PI, std::f64::consts::PI, 1 << 12),
            curvature: AxisParams::new(-0.05, 0.05, 1 << 12),
            impact: AxisParams::fixed(0.0),
            max_level: 13,
            min_items_per_leaf: 14,
            initial_min_items: 24,
            threshold_step: 0.5,
            tolerance: 0.03,
        }
    }
}

impl AxialHoughParams {
    pub fn validate(&self) -> Result<()> {
        self.phi0.validate("phi0")?;
        self.curvature.validate("curvature")?;
        self.impact.validate("impact")?;
        tree_limits("axial_hough", self.max_level, self.min_items_per_leaf)?;
        if self.initial_min_items < self.min_items_per_leaf {
            return Err(FinderError::invalid(
                "axial_hough initial_min_items must not be below min_items_per_leaf",
            ));
        }
        if !(self.threshold_step > 0.0 && self.threshold_step < 1.0) {
            return Err(FinderError::invalid("axial_hough threshold_step must lie in (0, 1)"));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(FinderError::invalid("axial_hough tolerance must be non-negative"));
        }
        Ok(())
    }

    /// Decreasing hit thresholds of the search passes, ending at
    /// `min_items_per_leaf`.
    pub fn thresholds(&self) -> Vec<usize> {
        let floor = self.min_items_per_leaf.max(1);
        let mut limits = Vec::new();
        let mut limit = self.initial_min_items.max(floor);
        while limit > floor {
            limits.push(limit);
            let next = (limit as f64 * self.threshold_step).floor() as usize;
            limit = next.clamp(floor, limit - 1);
        }
        limits.push(floor);
        limits
    }
}

/// Facet, segment and segment-pair thresholds of the local search.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSearchParams {
    pub enabled: bool,
    /// Maximal wire distance of neighbouring hits in cm.
    pub neighbor_distance: f64,
    /// Maximal residual sum of squares of a facet tangent line in cm².
    pub max_facet_chi2: f64,
    /// Maximal direction change between related facets in rad.
    pub max_facet_angle_change: f64,
    pub min_segment_hits: usize,
    pub max_pair_chi2: f64,
    /// Maximal azimuth gap between the inner segment's end and the outer
    /// segment's start in rad.
    pub max_pair_phi_gap: f64,
    /// Maximal curvature change along a segment triple in 1/cm.
    pub max_curvature_difference: f64,
}

impl Default for LocalSearchParams {
    fn default() -> Self {
        Self {
            enabled: true,
            neighbor_distance: 3.5,
            max_facet_chi2: 0.01,
            max_facet_angle_change: 0.3,
            min_segment_hits: 4,
            max_pair_chi2: 100.0,
            max_pair_phi_gap: 0.6,
            max_curvature_difference: 0.004,
        }
    }
}

impl LocalSearchParams {
    pub fn validate(&self) -> Result<()> {
        positive("neighbor_distance", self.neighbor_distance)?;
        positive("max_facet_chi2", self.max_facet_chi2)?;
        positive("max_facet_angle_change", self.max_facet_angle_change)?;
        positive("max_pair_chi2", self.max_pair_chi2)?;
        positive("max_pair_phi_gap", self.max_pair_phi_gap)?;
        positive("max_curvature_difference", self.max_curvature_difference)?;
        if self.min_segment_hits < 3 {
            return Err(FinderError::invalid("min_segment_hits must be at least 3"));
        }
        Ok(())
    }
}

/// Track merging and outlier removal.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PostprocessParams {
    /// Maximal reduced χ² of the joint fit of two merged tracks.
    pub merge_chi2: f64,
    /// Maximal curvature difference of merged tracks in 1/cm.
    pub merge_curvature_difference: f64,
    /// Residual cut in units of the drift-length error.
    pub outlier_factor: f64,
    /// Constant residual allowance in cm added to the outlier cut.
    pub outlier_drift_window: f64,
    /// Tracks with fewer hits are dropped and their hits released.
    pub min_track_hits: usize,
    /// Attach unused axial hits passing the outlier cut to the closest track.
    pub append_unused_hits: bool,
}

impl Default for PostprocessParams {
    fn default() -> Self {
        Self {
            merge_chi2: 20.0,
            merge_curvature_difference: 0.002,
            outlier_factor: 5.0,
            outlier_drift_window: 0.1,
            min_track_hits: 8,
            append_unused_hits: true,
        }
    }
}

impl PostprocessParams {
    pub fn validate(&self) -> Result<()> {
        positive("merge_chi2", self.merge_chi2)?;
        positive("merge_curvature_difference", self.merge_curvature_difference)?;
        positive("outlier_factor", self.outlier_factor)?;
        if !(self.outlier_drift_window.is_finite() && self.outlier_drift_window >= 0.0) {
            return Err(FinderError::invalid("outlier_drift_window must be non-negative"));
        }
        if self.min_track_hits < 3 {
            return Err(FinderError::invalid("min_track_hits must be at least 3"));
        }
        Ok(())
    }
}

/// Stereo hit assignment through a (z0, tanλ) Hough search per track.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StereoParams {
    pub enabled: bool,
    /// z at the perigee in cm.
    pub z0: AxisParams,
    pub tan_lambda: AxisParams,
    pub max_level: u32,
    /// Minimal stereo hits attached to a track.
    pub min_items_per_leaf: usize,
    /// Slack of the s-z residual test in cm.
    pub tolerance: f64,
    /// Newton iterations of the stereo hit reconstruction.
    pub reconstruction_iterations: usize,
}

impl Default for StereoParams {
    fn default() -> Self {
        Self {
            enabled: true,
            z0: AxisParams::new(-30.0, 30.0, 1 << 8),
            tan_lambda: AxisParams::new(-1.5, 1.5, 1 << 8),
            max_level: 8,
            min_items_per_leaf: 5,
            tolerance: 1.0,
            reconstruction_iterations: 10,
        }
    }
}

impl StereoParams {
    pub fn validate(&self) -> Result<()> {
        self.z0.validate("z0")?;
        self.tan_lambda.validate("tan_lambda")?;
        tree_limits("stereo", self.max_level, self.min_items_per_leaf)?;
        positive("stereo tolerance", self.tolerance)?;
        if self.reconstruction_iterations == 0 {
            return Err(FinderError::invalid(
                "stereo reconstruction_iterations must be at least 1",
            ));
        }
        Ok(())
    }
}
