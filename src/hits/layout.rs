//! Synthetic cylindrical chamber layout.
//!
//! Concentric layers grouped into superlayers. Wires of odd layers are
//! staggered by half a cell. Stereo wires connect endpoints rotated by
//! `∓Δφ/2` at the backward and forward end plates, with
//! `Δφ = ±(z_forward − z_backward)·tan(stereo_angle)/r`.

use super::wire::{StereoKind, WireGeometry, WireId, WireLine};
use crate::error::{FinderError, Result};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::ops::Range;

/// Shape of the chamber. Defaults follow a Belle-II-like central drift
/// chamber: 9 superlayers, 56 layers, alternating axial and stereo.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    /// Radius of the innermost layer in cm.
    pub inner_radius: f64,
    /// Radial distance between consecutive layers in cm.
    pub layer_spacing: f64,
    pub layers_per_superlayer: Vec<u16>,
    pub wires_per_superlayer: Vec<u16>,
    pub superlayer_kinds: Vec<StereoKind>,
    /// Stereo angle magnitude in radians.
    pub stereo_angle: f64,
    pub z_backward: f64,
    pub z_forward: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        use StereoKind::{Axial, U, V};
        Self {
            inner_radius: 16.8,
            layer_spacing: 1.7,
            layers_per_superlayer: vec![8, 6, 6, 6, 6, 6, 6, 6, 6],
            wires_per_superlayer: vec![160, 160, 192, 224, 256, 288, 320, 352, 384],
            superlayer_kinds: vec![Axial, U, Axial, V, Axial, U, Axial, V, Axial],
            stereo_angle: 0.06,
            z_backward: -60.0,
            z_forward: 100.0,
        }
    }
}

/// Geometry provider for the synthetic chamber.
#[derive(Clone, Debug)]
pub struct CylindricalLayout {
    params: LayoutParams,
    layer_superlayer: Vec<u8>,
    superlayer_first_layer: Vec<u16>,
}

impl CylindricalLayout {
    pub fn new(params: LayoutParams) -> Result<Self> {
        let n_sl = params.layers_per_superlayer.len();
        if n_sl == 0 || n_sl > u8::MAX as usize {
            return Err(FinderError::invalid("layout needs between 1 and 255 superlayers"));
        }
        if params.wires_per_superlayer.len() != n_sl || params.superlayer_kinds.len() != n_sl {
            return Err(FinderError::invalid(
                "layers_per_superlayer, wires_per_superlayer and superlayer_kinds differ in length",
            ));
        }
        if params.layers_per_superlayer.iter().any(|&n| n == 0)
            || params.wires_per_superlayer.iter().any(|&n| n == 0)
        {
            return Err(FinderError::invalid("superlayers need at least one layer and one wire"));
        }
        if !(params.inner_radius > 0.0 && params.layer_spacing > 0.0) {
            return Err(FinderError::invalid("layer radii must be positive"));
        }
        if !(params.z_forward > params.z_backward) || !params.stereo_angle.is_finite() {
            return Err(FinderError::invalid("invalid wire z extent or stereo angle"));
        }

        let mut layer_superlayer = Vec::new();
        let mut superlayer_first_layer = Vec::with_capacity(n_sl);
        for (sl, &count) in params.layers_per_superlayer.iter().enumerate() {
            superlayer_first_layer.push(layer_superlayer.len() as u16);
            layer_superlayer.extend(std::iter::repeat(sl as u8).take(count as usize));
        }
        if layer_superlayer.len() > u16::MAX as usize {
            return Err(FinderError::invalid("too many layers"));
        }
        Ok(Self {
            params,
            layer_superlayer,
            superlayer_first_layer,
        })
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    pub fn layer_count(&self) -> u16 {
        self.layer_superlayer.len() as u16
    }

    pub fn superlayer_count(&self) -> u8 {
        self.superlayer_first_layer.len() as u8
    }

    pub fn layers_of_superlayer(&self, superlayer: u8) -> Range<u16> {
        let sl = superlayer as usize;
        match self.superlayer_first_layer.get(sl) {
            Some(&first) => first..first + self.params.layers_per_superlayer[sl],
            None => 0..0,
        }
    }

    pub fn superlayer_kind(&self, superlayer: u8) -> Option<StereoKind> {
        self.params.superlayer_kinds.get(superlayer as usize).copied()
    }

    pub fn layer_radius(&self, layer: u16) -> f64 {
        self.params.inner_radius + self.params.layer_spacing * layer as f64
    }

    pub fn outer_radius(&self) -> f64 {
        self.layer_radius(self.layer_count().saturating_sub(1))
    }

    pub fn wires_in_layer(&self, layer: u16) -> Option<u16> {
        let sl = self.superlayer_of(layer)?;
        self.params.wires_per_superlayer.get(sl as usize).copied()
    }

    /// Azimuth of the wire at the middle of its stereo twist.
    fn wire_azimuth(&self, layer: u16, wire: u16, wires: u16) -> f64 {
        let stagger = if layer % 2 == 1 { 0.5 } else { 0.0 };
        TAU * (wire as f64 + stagger) / wires as f64
    }

    fn stereo_twist(&self, kind: StereoKind, radius: f64) -> f64 {
        let sign = match kind {
            StereoKind::Axial => return 0.0,
            StereoKind::U => 1.0,
            StereoKind::V => -1.0,
        };
        sign * (self.params.z_forward - self.params.z_backward) * self.params.stereo_angle.tan()
            / radius
    }

    /// Wire of `layer` passing closest to `point` at height `z`.
    pub fn nearest_wire(&self, layer: u16, point: &Vector2<f64>, z: f64) -> Option<WireLine> {
        let wires = self.wires_in_layer(layer)?;
        let sl = self.superlayer_of(layer)?;
        let kind = self.superlayer_kind(sl)?;
        let radius = self.layer_radius(layer);
        let span = self.params.z_forward - self.params.z_backward;
        let frac = (z - self.params.z_backward) / span;
        let twist = (frac - 0.5) * self.stereo_twist(kind, radius);
        let stagger = if layer % 2 == 1 { 0.5 } else { 0.0 };
        let azimuth = point.y.atan2(point.x) - twist;
        let estimate = (azimuth * wires as f64 / TAU - stagger).round() as i64;

        let mut best: Option<(f64, WireLine)> = None;
        for k in estimate - 2..=estimate + 2 {
            let wire = k.rem_euclid(wires as i64) as u16;
            let Some(line) = self.wire(WireId::new(layer, wire)) else {
                continue;
            };
            let dist = (line.position_at(z) - point).norm();
            if best.as_ref().map_or(true, |(d, _)| dist < *d) {
                best = Some((dist, line));
            }
        }
        best.map(|(_, line)| line)
    }
}

impl WireGeometry for CylindricalLayout {
    fn wire(&self, id: WireId) -> Option<WireLine> {
        let wires = self.wires_in_layer(id.layer)?;
        if id.wire >= wires {
            return None;
        }
        let superlayer = self.superlayer_of(id.layer)?;
        let stereo_kind = self.superlayer_kind(superlayer)?;
        let radius = self.layer_radius(id.layer);
        let phi = self.wire_azimuth(id.layer, id.wire, wires);
        let twist = self.stereo_twist(stereo_kind, radius);
        let backward = Vector2::new(
            radius * (phi - 0.5 * twist).cos(),
            radius * (phi - 0.5 * twist).sin(),
        );
        let forward = Vector2::new(
            radius * (phi + 0.5 * twist).cos(),
            radius * (phi + 0.5 * twist).sin(),
        );
        let span = self.params.z_forward - self.params.z_backward;
        let skew = (forward - backward) / span;
        Some(WireLine {
            id,
            superlayer,
            stereo_kind,
            reference: backward - skew * self.params.z_backward,
            skew,
            z_backward: self.params.z_backward,
            z_forward: self.params.z_forward,
        })
    }

    fn superlayer_of(&self, layer: u16) -> Option<u8> {
        self.layer_superlayer.get(layer as usize).copied()
    }
}
