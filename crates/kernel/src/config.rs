//! Tunables of the faceted modeller.

use serde::{Deserialize, Serialize};

/// Resolution and tolerance settings shared by every kernel operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Facets around a full circle. Multiples of 12 keep hexagon corners and
    /// 30° junctions on cylinder vertices.
    pub circle_segments: u32,
    /// Facets across one fillet arc.
    pub fillet_segments: u32,
    /// Points closer than this are welded into one vertex (mm).
    pub weld_tolerance: f64,
    /// Plane offset below which facets count as coplanar (mm).
    pub coplanar_tolerance: f64,
    /// Turn between consecutive segments that ends an edge chain (radians).
    pub chain_break_angle: f64,
    /// Dihedral below which an edge is tangent and cannot be filleted (radians).
    pub min_fillet_angle: f64,
    /// Distance fillet tools reach past the faces they trim (mm).
    pub fillet_overshoot: f64,
    /// Margin around the smaller operand inside which booleans classify (mm).
    pub locality_margin: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            circle_segments: 48,
            fillet_segments: 8,
            weld_tolerance: 1e-4,
            coplanar_tolerance: 1e-6,
            chain_break_angle: 45f64.to_radians(),
            min_fillet_angle: 2f64.to_radians(),
            fillet_overshoot: 0.01,
            locality_margin: 0.5,
        }
    }
}

impl KernelConfig {
    /// Lower resolution preset for quick previews and tests.
    pub fn coarse() -> Self {
        Self {
            circle_segments: 24,
            fillet_segments: 4,
            ..Self::default()
        }
    }
}
