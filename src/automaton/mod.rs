//! Cellular automaton machinery shared by every building-block level.
//!
//! Facets, segments and segment pairs all implement [`AutomatonNode`] and are
//! linked by [`Relation`]s; the same [`CellularPathFinder`] extracts paths at
//! each level.

pub mod cell;
pub mod path_finder;
pub mod relation;

pub use cell::{AutomatonCell, CellFlags, CellStatus};
pub use path_finder::{AutomatonNode, CellularPathFinder, PathFinderParams};
pub use relation::{build_relations, build_self_relations, LayerOrdered, Relation};
