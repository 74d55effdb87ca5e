//! Wire identifiers and the read-only geometry interface.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Wire address: layer counted from the innermost layer, wire within layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WireId {
    pub layer: u16,
    pub wire: u16,
}

impl WireId {
    pub fn new(layer: u16, wire: u16) -> Self {
        Self { layer, wire }
    }
}

/// Stereo orientation of a superlayer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StereoKind {
    Axial,
    U,
    V,
}

impl StereoKind {
    #[inline]
    pub fn is_axial(self) -> bool {
        self == StereoKind::Axial
    }
}

/// Straight wire between its backward and forward endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct WireLine {
    pub id: WireId,
    pub superlayer: u8,
    pub stereo_kind: StereoKind,
    /// Transverse position at z = 0.
    pub reference: Vector2<f64>,
    /// Transverse displacement per unit z.
    pub skew: Vector2<f64>,
    pub z_backward: f64,
    pub z_forward: f64,
}

impl WireLine {
    #[inline]
    pub fn position_at(&self, z: f64) -> Vector2<f64> {
        self.reference + self.skew * z
    }

    #[inline]
    pub fn contains_z(&self, z: f64) -> bool {
        z >= self.z_backward && z <= self.z_forward
    }
}

/// Read-only lookup of the chamber geometry. Must not change during an event.
pub trait WireGeometry {
    fn wire(&self, id: WireId) -> Option<WireLine>;
    fn superlayer_of(&self, layer: u16) -> Option<u8>;
}
