use serde::{Deserialize, Serialize};

pub use cad_kernel::{Anchor, Convexity, KernelConfig, ShapeKind};

/// Opaque handle to a solid in the geometry kernel.
/// NEVER persisted. Valid only for the current kernel session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSolidHandle(pub(crate) u64);

impl KernelSolidHandle {
    pub(crate) fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for KernelSolidHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "solid#{}", self.0)
    }
}

/// Transient kernel-internal entity identifier.
/// Stable within a single kernel session but NOT across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KernelId(pub u64);

/// Errors from kernel operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KernelError {
    #[error("boolean operation failed: {reason}")]
    BooleanFailed { reason: String },

    #[error("fillet failed: {reason}")]
    FilletFailed { reason: String },

    #[error("tessellation failed: {reason}")]
    TessellationFailed { reason: String },

    #[error("entity not found: {id:?}")]
    EntityNotFound { id: KernelId },

    #[error("invalid primitive: {reason}")]
    InvalidPrimitive { reason: String },

    #[error("operation not supported: {operation}")]
    NotSupported { operation: String },

    #[error("kernel error: {message}")]
    Other { message: String },
}

impl From<cad_kernel::OperationError> for KernelError {
    fn from(err: cad_kernel::OperationError) -> Self {
        use cad_kernel::OperationError;
        match err {
            OperationError::InvalidPrimitive { .. } => KernelError::InvalidPrimitive {
                reason: err.to_string(),
            },
            OperationError::EdgeNotFound => KernelError::FilletFailed {
                reason: err.to_string(),
            },
            OperationError::FilletFailed { reason } => KernelError::FilletFailed { reason },
        }
    }
}

/// Kind of topological entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopoKind {
    Vertex,
    Edge,
    Face,
}

/// Geometric signature of a topological entity.
/// Used to match entities between the inputs and the result of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopoSignature {
    /// Surface type of faces (planar, cylindrical, blend).
    pub surface_type: Option<String>,
    /// Surface area (for faces).
    pub area: Option<f64>,
    /// Centroid position [x, y, z].
    pub centroid: Option<[f64; 3]>,
    /// Outward-pointing area-weighted normal (for faces).
    pub normal: Option<[f64; 3]>,
    /// Axis-aligned bounding box [min_x, min_y, min_z, max_x, max_y, max_z].
    pub bbox: Option<[f64; 6]>,
    /// Arc length (for edges).
    pub length: Option<f64>,
}

impl TopoSignature {
    pub fn empty() -> Self {
        Self {
            surface_type: None,
            area: None,
            centroid: None,
            normal: None,
            bbox: None,
            length: None,
        }
    }
}

/// Tessellated triangle mesh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderMesh {
    /// Flat array of vertex positions [x0, y0, z0, x1, y1, z1, ...].
    pub vertices: Vec<f32>,
    /// Flat array of vertex normals [nx0, ny0, nz0, nx1, ny1, nz1, ...].
    pub normals: Vec<f32>,
    /// Triangle indices into the vertex array.
    pub indices: Vec<u32>,
    /// Mapping from triangle ranges to logical faces.
    pub face_ranges: Vec<FaceRange>,
}

impl RenderMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Corner positions of triangle `index`.
    pub fn triangle(&self, index: usize) -> [[f32; 3]; 3] {
        let corner = |k: usize| {
            let v = self.indices[index * 3 + k] as usize * 3;
            [self.vertices[v], self.vertices[v + 1], self.vertices[v + 2]]
        };
        [corner(0), corner(1), corner(2)]
    }

    /// Normal of the first corner of triangle `index`.
    pub fn triangle_normal(&self, index: usize) -> [f32; 3] {
        let v = self.indices[index * 3] as usize * 3;
        [self.normals[v], self.normals[v + 1], self.normals[v + 2]]
    }
}

/// Maps a contiguous range of triangles to a logical face.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceRange {
    /// The KernelId of the face this range belongs to.
    pub face_id: KernelId,
    /// Start index in the indices array (inclusive).
    pub start_index: u32,
    /// End index in the indices array (exclusive).
    pub end_index: u32,
}

/// Planar polygon boundary of a solid, as written to faceted B-rep formats.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacetedShell {
    /// Shared vertex positions.
    pub points: Vec<[f64; 3]>,
    /// One counter-clockwise loop of point indices per planar facet.
    pub polygons: Vec<Vec<u32>>,
}

impl FacetedShell {
    /// Signed enclosed volume, fanning each polygon from its first point.
    pub fn volume(&self) -> f64 {
        let mut six_v = 0.0;
        for polygon in &self.polygons {
            let p0 = self.points[polygon[0] as usize];
            for w in polygon[1..].windows(2) {
                let (a, b) = (self.points[w[0] as usize], self.points[w[1] as usize]);
                six_v += p0[0] * (a[1] * b[2] - a[2] * b[1])
                    + p0[1] * (a[2] * b[0] - a[0] * b[2])
                    + p0[2] * (a[0] * b[1] - a[1] * b[0]);
            }
        }
        six_v / 6.0
    }
}

// Custom Serialize/Deserialize for KernelId (needed for FaceRange serialization)
impl Serialize for KernelId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for KernelId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u64::deserialize(deserializer).map(KernelId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_id_serializes_as_number() {
        let json = serde_json::to_string(&KernelId(42)).unwrap();
        assert_eq!(json, "42");
        let back: KernelId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, KernelId(42));
    }

    #[test]
    fn unit_cube_shell_volume() {
        let shell = FacetedShell {
            points: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
                [1.0, 0.0, 1.0],
                [1.0, 1.0, 1.0],
                [0.0, 1.0, 1.0],
            ],
            polygons: vec![
                vec![0, 3, 2, 1],
                vec![4, 5, 6, 7],
                vec![0, 1, 5, 4],
                vec![2, 3, 7, 6],
                vec![0, 4, 7, 3],
                vec![1, 2, 6, 5],
            ],
        };
        assert!((shell.volume() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn operation_errors_map_to_kernel_errors() {
        let err: KernelError = cad_kernel::OperationError::EdgeNotFound.into();
        assert!(matches!(err, KernelError::FilletFailed { .. }));
        let err: KernelError = cad_kernel::OperationError::InvalidPrimitive {
            parameter: "radius",
            value: -1.0,
        }
        .into();
        assert!(err.to_string().contains("radius"));
    }
}
