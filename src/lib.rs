#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod diagnostics;
pub mod error;
pub mod finder;
pub mod hits;
pub mod io;
pub mod types;

// Building blocks of the two searches. Public for tools, tests and benches.
pub mod angle;
pub mod automaton;
pub mod building;
pub mod deadline;
pub mod fit;
pub mod hough;
pub mod trajectory;

// Tool support.
pub mod config;
pub mod synthetic;

// --- High-level re-exports -------------------------------------------------

// Main entry points: finder + results.
pub use crate::error::{FinderError, Result};
pub use crate::finder::{FinderParams, TrackFinder};
pub use crate::types::{EventResult, TrackCandidate, TrackOrigin, TrackParameters};

// Diagnostics returned with every event.
pub use crate::diagnostics::{EventDiagnostics, TimingBreakdown};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use cdc_seed_finder::prelude::*;
///
/// # fn main() -> Result<(), FinderError> {
/// let layout = CylindricalLayout::new(LayoutParams::default())?;
/// let finder = TrackFinder::new(FinderParams::default())?;
/// let result = finder.process_event(&[], &layout)?;
/// println!("tracks={} total_ms={:.3}", result.tracks.len(), result.diagnostics.timings.total_ms);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::hits::{CylindricalLayout, LayoutParams, RawHit, WireGeometry};
    pub use crate::{EventResult, FinderError, FinderParams, TrackCandidate, TrackFinder};
}

// --- Stage-level API (for tools & advanced users) --------------------------

pub mod stages {
    // Stage runners.
    pub use crate::finder::{AxialHoughSearch, StereoAssigner, StereoAssignment};
    pub use crate::finder::postprocess::remove_outliers;
    pub use crate::automaton::{CellularPathFinder, PathFinderParams};
    pub use crate::hough::{select_candidates, HoughCandidate, HoughTree};

    // Structured diagnostics types.
    pub use crate::diagnostics::{
        AxialHoughStage, HitCounts, LocalSearchStage, PostprocessStage, StageTiming,
        StereoStage, TimingBreakdown,
    };
    pub use crate::hough::TreeStats;
}
