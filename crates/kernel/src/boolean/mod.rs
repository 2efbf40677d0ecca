mod bsp;
pub mod engine;

pub use engine::{BoolOp, boolean_op};

use crate::config::KernelConfig;
use crate::mesh::FacetedSolid;

/// Trait for Boolean operations on faceted solids.
///
/// Provides `union`, `subtract`, and `intersect` operations. Implement this
/// trait to provide alternative Boolean backends or mock implementations.
pub trait BooleanEngine {
    /// Compute the union of two solids.
    fn union(&self, a: &FacetedSolid, b: &FacetedSolid) -> FacetedSolid;

    /// Subtract solid `b` from solid `a`.
    fn subtract(&self, a: &FacetedSolid, b: &FacetedSolid) -> FacetedSolid;

    /// Compute the intersection of two solids.
    fn intersect(&self, a: &FacetedSolid, b: &FacetedSolid) -> FacetedSolid;
}

/// BSP engine backed by [`boolean_op`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BspBooleanEngine {
    pub config: KernelConfig,
}

impl BspBooleanEngine {
    pub fn new(config: KernelConfig) -> Self {
        Self { config }
    }
}

impl BooleanEngine for BspBooleanEngine {
    fn union(&self, a: &FacetedSolid, b: &FacetedSolid) -> FacetedSolid {
        boolean_op(a, b, BoolOp::Union, &self.config)
    }

    fn subtract(&self, a: &FacetedSolid, b: &FacetedSolid) -> FacetedSolid {
        boolean_op(a, b, BoolOp::Difference, &self.config)
    }

    fn intersect(&self, a: &FacetedSolid, b: &FacetedSolid) -> FacetedSolid {
        boolean_op(a, b, BoolOp::Intersection, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vector3;
    use crate::mesh::SurfaceAllocator;
    use crate::primitives::{Anchor, make_box, make_cylinder};
    use crate::topology::Topology;
    use approx::assert_relative_eq;

    fn cube(s: &mut SurfaceAllocator, size: f64, offset: [f64; 3]) -> FacetedSolid {
        make_box(s, [size, size, size], Anchor::Center)
            .expect("box")
            .translated(&Vector3::new(offset[0], offset[1], offset[2]))
    }

    #[test]
    fn union_of_overlapping_cubes() {
        let mut s = SurfaceAllocator::new();
        let engine = BspBooleanEngine::default();
        let a = cube(&mut s, 2.0, [0.0, 0.0, 0.0]);
        let b = cube(&mut s, 2.0, [1.0, 1.0, 1.0]);
        let u = engine.union(&a, &b);
        assert_relative_eq!(u.volume(), 8.0 + 8.0 - 1.0, epsilon = 1e-9);
        assert!(Topology::build(&u, &engine.config).is_closed());
    }

    #[test]
    fn subtract_and_intersect_overlapping_cubes() {
        let mut s = SurfaceAllocator::new();
        let engine = BspBooleanEngine::default();
        let a = cube(&mut s, 2.0, [0.0, 0.0, 0.0]);
        let b = cube(&mut s, 2.0, [1.0, 1.0, 1.0]);
        let d = engine.subtract(&a, &b);
        let i = engine.intersect(&a, &b);
        assert_relative_eq!(d.volume(), 7.0, epsilon = 1e-9);
        assert_relative_eq!(i.volume(), 1.0, epsilon = 1e-9);
        assert!(Topology::build(&d, &engine.config).is_closed());
        assert!(Topology::build(&i, &engine.config).is_closed());
    }

    #[test]
    fn disjoint_union_keeps_both() {
        let mut s = SurfaceAllocator::new();
        let engine = BspBooleanEngine::default();
        let a = cube(&mut s, 1.0, [0.0, 0.0, 0.0]);
        let b = cube(&mut s, 1.0, [5.0, 0.0, 0.0]);
        let u = engine.union(&a, &b);
        assert_eq!(u.polygons.len(), 12);
        assert_relative_eq!(u.volume(), 2.0, epsilon = 1e-9);
        assert_eq!(engine.intersect(&a, &b).volume(), 0.0);
    }

    #[test]
    fn stacked_boxes_merge_their_shared_face() {
        let mut s = SurfaceAllocator::new();
        let engine = BspBooleanEngine::default();
        let lower = make_box(&mut s, [4.0, 4.0, 1.0], Anchor::Top).expect("box");
        let upper = make_box(&mut s, [2.0, 2.0, 1.0], Anchor::Bottom).expect("box");
        let u = engine.union(&lower, &upper);
        assert_relative_eq!(u.volume(), 16.0 + 4.0, epsilon = 1e-9);
        let topo = Topology::build(&u, &engine.config);
        assert!(topo.is_closed());
        // 6 + 5 faces: the upper box's bottom disappears into the lower top.
        assert_eq!(topo.faces.len(), 11);
    }

    #[test]
    fn subtract_through_hole() {
        let mut s = SurfaceAllocator::new();
        let engine = BspBooleanEngine::default();
        let plate = make_box(&mut s, [10.0, 10.0, 2.0], Anchor::Center).expect("box");
        let pin = make_cylinder(&mut s, 1.0, 4.0, 24, Anchor::Center).expect("cylinder");
        let holed = engine.subtract(&plate, &pin);
        let expected = plate.volume() - pin.volume() / 2.0;
        assert_relative_eq!(holed.volume(), expected, epsilon = 1e-9);
        assert!(Topology::build(&holed, &engine.config).is_closed());
    }

    #[test]
    fn empty_operands() {
        let mut s = SurfaceAllocator::new();
        let engine = BspBooleanEngine::default();
        let a = cube(&mut s, 1.0, [0.0, 0.0, 0.0]);
        let empty = FacetedSolid::default();
        assert_eq!(engine.union(&empty, &a).polygons.len(), 6);
        assert_eq!(engine.subtract(&a, &empty).polygons.len(), 6);
        assert!(engine.intersect(&a, &empty).is_empty());
        assert!(engine.subtract(&a, &a).volume().abs() < 1e-9);
    }
}
