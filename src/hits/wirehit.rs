use super::wire::{StereoKind, WireGeometry, WireId, WireLine};
use crate::automaton::AutomatonCell;
use crate::fit::DriftObservation;
use log::warn;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Index of a hit in the event's hit vector.
pub type HitId = usize;

/// Side of the track on which the wire lies, seen in the direction of flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RightLeft {
    Left,
    Right,
}

impl RightLeft {
    /// +1 for `Left`, -1 for `Right`: the sign of the trajectory's signed
    /// distance at the wire.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            RightLeft::Left => 1.0,
            RightLeft::Right => -1.0,
        }
    }

    #[inline]
    pub fn from_sign(value: f64) -> Self {
        if value >= 0.0 {
            RightLeft::Left
        } else {
            RightLeft::Right
        }
    }

    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            RightLeft::Left => RightLeft::Right,
            RightLeft::Right => RightLeft::Left,
        }
    }
}

/// Calibrated hit as delivered by the unpacking stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    pub layer: u16,
    pub wire: u16,
    pub superlayer: u8,
    /// Wire position at z = 0 in cm.
    pub position: [f64; 2],
    pub drift_length: f64,
    pub drift_length_variance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_left: Option<RightLeft>,
}

/// One drift-chamber measurement with its automaton state.
#[derive(Clone, Debug)]
pub struct WireHit {
    id: HitId,
    wire: WireId,
    superlayer: u8,
    stereo_kind: StereoKind,
    reference: Vector2<f64>,
    skew: Vector2<f64>,
    z_range: (f64, f64),
    drift_length: f64,
    drift_length_variance: f64,
    right_left: Option<RightLeft>,
    cell: AutomatonCell,
}

impl WireHit {
    /// Builds the hit, flagging it as background when the measurement or its
    /// wire is malformed. Never fails.
    pub fn from_raw<G: WireGeometry + ?Sized>(id: HitId, raw: &RawHit, geometry: &G) -> Self {
        let wire_id = WireId::new(raw.layer, raw.wire);
        let line = geometry.wire(wire_id);
        let reference = Vector2::new(raw.position[0], raw.position[1]);
        let (stereo_kind, skew, z_range) = match &line {
            Some(l) => (l.stereo_kind, l.skew, (l.z_backward, l.z_forward)),
            None => (StereoKind::Axial, Vector2::zeros(), (0.0, 0.0)),
        };
        let mut hit = Self {
            id,
            wire: wire_id,
            superlayer: raw.superlayer,
            stereo_kind,
            reference,
            skew,
            z_range,
            drift_length: raw.drift_length,
            drift_length_variance: raw.drift_length_variance,
            right_left: raw.right_left,
            cell: AutomatonCell::new(),
        };
        if let Some(reason) = Self::defect(raw, line.as_ref(), geometry) {
            warn!(
                "hit {id} (layer {} wire {}) flagged as background: {reason}",
                raw.layer, raw.wire
            );
            hit.cell.set_background();
        }
        hit
    }

    fn defect<G: WireGeometry + ?Sized>(
        raw: &RawHit,
        line: Option<&WireLine>,
        geometry: &G,
    ) -> Option<&'static str> {
        if !raw.drift_length.is_finite() || raw.drift_length < 0.0 {
            return Some("drift length is not a finite non-negative number");
        }
        if !raw.drift_length_variance.is_finite() || raw.drift_length_variance < 0.0 {
            return Some("drift length variance is not a finite non-negative number");
        }
        if !raw.position.iter().all(|v| v.is_finite()) {
            return Some("reference position is not finite");
        }
        if line.is_none() {
            return Some("wire unknown to the geometry");
        }
        if geometry.superlayer_of(raw.layer) != Some(raw.superlayer) {
            return Some("superlayer inconsistent with layer");
        }
        None
    }

    #[inline]
    pub fn id(&self) -> HitId {
        self.id
    }

    #[inline]
    pub fn wire_id(&self) -> WireId {
        self.wire
    }

    #[inline]
    pub fn layer(&self) -> u16 {
        self.wire.layer
    }

    #[inline]
    pub fn superlayer(&self) -> u8 {
        self.superlayer
    }

    #[inline]
    pub fn stereo_kind(&self) -> StereoKind {
        self.stereo_kind
    }

    #[inline]
    pub fn is_axial(&self) -> bool {
        self.stereo_kind.is_axial()
    }

    /// Wire position at z = 0.
    #[inline]
    pub fn reference_position(&self) -> Vector2<f64> {
        self.reference
    }

    #[inline]
    pub fn position_at_z(&self, z: f64) -> Vector2<f64> {
        self.reference + self.skew * z
    }

    #[inline]
    pub fn skew(&self) -> Vector2<f64> {
        self.skew
    }

    #[inline]
    pub fn z_range(&self) -> (f64, f64) {
        self.z_range
    }

    #[inline]
    pub fn drift_length(&self) -> f64 {
        self.drift_length
    }

    #[inline]
    pub fn drift_length_variance(&self) -> f64 {
        self.drift_length_variance
    }

    #[inline]
    pub fn right_left(&self) -> Option<RightLeft> {
        self.right_left
    }

    /// Drift length signed by the known passage, `None` when it is ambiguous.
    pub fn signed_drift_length(&self) -> Option<f64> {
        self.right_left.map(|rl| rl.sign() * self.drift_length)
    }

    /// Drift circle around the wire at z = 0, as used by the circle fits.
    pub fn drift_observation(&self) -> DriftObservation {
        DriftObservation {
            position: self.reference,
            drift_length: self.drift_length,
            variance: self.drift_length_variance,
        }
    }

    #[inline]
    pub fn cell(&self) -> &AutomatonCell {
        &self.cell
    }

    #[inline]
    pub fn cell_mut(&mut self) -> &mut AutomatonCell {
        &mut self.cell
    }
}

/// Converts an event's raw hits. Output index equals input index.
pub fn build_wire_hits<G: WireGeometry + ?Sized>(raw: &[RawHit], geometry: &G) -> Vec<WireHit> {
    raw.iter()
        .enumerate()
        .map(|(id, r)| WireHit::from_raw(id, r, geometry))
        .collect()
}
