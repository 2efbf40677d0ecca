pub mod boolean;
pub mod config;
pub mod geometry;
pub mod mesh;
pub mod operations;
pub mod primitives;
pub mod tessellation;
pub mod topology;
pub mod validation;

// Re-export key types at crate root for convenience.
pub use boolean::{BoolOp, BooleanEngine, BspBooleanEngine};
pub use config::KernelConfig;
pub use geometry::{BoundingBox, Plane, Point3, Vector3};
pub use mesh::{FacetedSolid, Polygon, Surface, SurfaceAllocator, SurfaceKind};
pub use operations::OperationError;
pub use primitives::Anchor;
pub use tessellation::{Tessellation, tessellate};
pub use topology::{Convexity, EdgeId, FaceId, ShapeKind, Topology, VertexId};
