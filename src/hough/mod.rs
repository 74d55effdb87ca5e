//! Recursive parameter-space search.
//!
//! A [`HoughTree`] subdivides a box of discretised parameter axes, keeping in
//! every node only the items a [`HoughPredicate`] finds compatible with it.
//! [`select_candidates`] turns the populated leaves into non-overlapping
//! candidate regions.

pub mod axis;
pub mod boxes;
pub mod candidates;
pub mod predicates;
pub mod tree;

pub use axis::{AxisParams, DiscreteAxis, DiscreteRange};
pub use boxes::{HoughBox, ParamBounds};
pub use candidates::{select_candidates, select_candidates_with, HoughCandidate};
pub use predicates::{
    max_forward_projection, signed_distance_range, AxialHitItem, AxialHitPredicate,
    HoughPredicate, StereoHitItem, StereoHitPredicate, SzPoint,
};
pub use tree::{HoughLeaf, HoughNode, HoughNodeState, HoughTree, SearchOutcome, TreeStats};
