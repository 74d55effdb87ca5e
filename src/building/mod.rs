//! Track building blocks for the local search.
//!
//! Hits of one superlayer combine into [`Facet`]s, facet paths into
//! [`Segment`]s, segments of consecutive axial superlayers into
//! [`SegmentPair`]s, and pair paths into axial tracks.

pub mod facets;
pub mod segment_pairs;
pub mod segments;

pub use facets::{build_facets, facet_relations, fit_tangent_line, Facet};
pub use segment_pairs::{
    build_segment_pairs, fit_segment_pair, next_axial_superlayers, pair_relations, PairCuts,
    SegmentPair,
};
pub use segments::{build_segments, Segment};
