//! Fixed modelling constants, in millimetres.

/// Round applied to every edge of the T handle.
pub const HANDLE_FILLET_RADIUS: f64 = 4.5;

/// Round where the shaft leaves the handle.
pub const JUNCTION_FILLET_RADIUS: f64 = 3.5;

/// Lift of the handle so the shaft's bottom face sits inside it instead of
/// coplanar with its top face.
pub const BOOLEAN_CLEARANCE_HANDLE: f64 = 0.1;

/// Overlap of the hex drive into the round shaft.
pub const BOOLEAN_CLEARANCE_SEAM: f64 = 0.01;

/// Clearance hole for an M5 bolt through the handle.
pub const BOLT_HOLE_DIAMETER: f64 = 4.9;
pub const BOLT_HOLE_LENGTH: f64 = 50.0;

/// Chordal tolerance requested for STL tessellation. The faceted kernel
/// meshes at `KernelConfig::circle_segments` and does not refine to it.
pub const TESSELLATION_TOLERANCE: f64 = 0.01;

/// File stem of the part the binary builds.
pub const DEFAULT_PART_KEY: &str = "tap_handle_m3";
