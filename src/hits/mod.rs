//! Hit and geometry model.
//!
//! - `wire`: wire ids, stereo kinds and the `WireGeometry` lookup trait.
//! - `layout`: `CylindricalLayout`, a synthetic chamber implementing it.
//! - `wirehit`: `RawHit` input records and `WireHit`s with automaton state.
//! - `neighborhood`: per-superlayer neighbour lists for facet building.

pub mod layout;
pub mod neighborhood;
pub mod wire;
pub mod wirehit;

pub use layout::{CylindricalLayout, LayoutParams};
pub use neighborhood::{hit_key, HitNeighborhood};
pub use wire::{StereoKind, WireGeometry, WireId, WireLine};
pub use wirehit::{build_wire_hits, HitId, RawHit, RightLeft, WireHit};
