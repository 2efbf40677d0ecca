//! Arena BSP tree over polygons.

use crate::geometry::{BoundingBox, Plane, PolygonSplit, Vector3};
use crate::mesh::Polygon;

/// Candidate splitters scored per node.
const SPLITTER_SAMPLES: usize = 20;
const SPAN_WEIGHT: i64 = 8;

/// Where a fragment lying in a node plane continues its descent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CoplanarRule {
    /// Same-facing fragments go front, opposite-facing go back.
    SameFacingFront,
    /// Opposite-facing fragments go front, same-facing go back.
    OppositeFacingFront,
    AlwaysFront,
    AlwaysBack,
}

impl CoplanarRule {
    fn goes_front(self, same_facing: bool) -> bool {
        match self {
            CoplanarRule::SameFacingFront => same_facing,
            CoplanarRule::OppositeFacingFront => !same_facing,
            CoplanarRule::AlwaysFront => true,
            CoplanarRule::AlwaysBack => false,
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    plane: Plane,
    front: Option<usize>,
    back: Option<usize>,
}

/// Solid-leaf BSP tree. A missing front child is outside the solid, a missing
/// back child is inside.
#[derive(Debug, Clone, Default)]
pub(crate) struct BspTree {
    nodes: Vec<Node>,
}

enum Link {
    Root,
    Front(usize),
    Back(usize),
}

impl BspTree {
    pub fn build(polygons: Vec<Polygon>) -> Self {
        let mut nodes: Vec<Node> = Vec::new();
        if polygons.is_empty() {
            return Self { nodes };
        }
        let mut stack = vec![(Link::Root, polygons)];
        while let Some((link, polygons)) = stack.pop() {
            let plane = pick_splitting_plane(&polygons);
            let idx = nodes.len();
            nodes.push(Node {
                plane,
                front: None,
                back: None,
            });
            match link {
                Link::Root => {}
                Link::Front(parent) => nodes[parent].front = Some(idx),
                Link::Back(parent) => nodes[parent].back = Some(idx),
            }

            let mut front = Vec::new();
            let mut back = Vec::new();
            for polygon in polygons {
                match plane.split_polygon(&polygon) {
                    PolygonSplit::CoplanarFront | PolygonSplit::CoplanarBack => {}
                    PolygonSplit::Front => front.push(polygon),
                    PolygonSplit::Back => back.push(polygon),
                    PolygonSplit::Spanning { front: f, back: b } => {
                        front.extend(f);
                        back.extend(b);
                    }
                }
            }
            if !front.is_empty() {
                stack.push((Link::Front(idx), front));
            }
            if !back.is_empty() {
                stack.push((Link::Back(idx), back));
            }
        }
        Self { nodes }
    }

    /// Push `polygon` down the tree, collecting the fragments that end outside
    /// and inside the solid.
    pub fn partition(
        &self,
        polygon: Polygon,
        rule: CoplanarRule,
        outside: &mut Vec<Polygon>,
        inside: &mut Vec<Polygon>,
    ) {
        if self.nodes.is_empty() {
            outside.push(polygon);
            return;
        }
        let mut stack = vec![(0usize, polygon)];
        while let Some((idx, polygon)) = stack.pop() {
            let node = &self.nodes[idx];
            let (front, back) = match node.plane.split_polygon(&polygon) {
                PolygonSplit::CoplanarFront => {
                    if rule.goes_front(true) {
                        (Some(polygon), None)
                    } else {
                        (None, Some(polygon))
                    }
                }
                PolygonSplit::CoplanarBack => {
                    if rule.goes_front(false) {
                        (Some(polygon), None)
                    } else {
                        (None, Some(polygon))
                    }
                }
                PolygonSplit::Front => (Some(polygon), None),
                PolygonSplit::Back => (None, Some(polygon)),
                PolygonSplit::Spanning { front, back } => (front, back),
            };
            // Back first so the front fragment is popped next; keeps output in
            // a stable front-to-back order.
            if let Some(b) = back {
                match node.back {
                    Some(child) => stack.push((child, b)),
                    None => inside.push(b),
                }
            }
            if let Some(f) = front {
                match node.front {
                    Some(child) => stack.push((child, f)),
                    None => outside.push(f),
                }
            }
        }
    }
}

/// Score up to [`SPLITTER_SAMPLES`] candidate planes, favouring few spanning
/// polygons and then balance.
fn pick_splitting_plane(polygons: &[Polygon]) -> Plane {
    let mut best = polygons[0].plane;
    let mut best_score = i64::MAX;
    for candidate in polygons.iter().take(SPLITTER_SAMPLES) {
        let plane = candidate.plane;
        let mut spans = 0i64;
        let mut balance = 0i64;
        for polygon in polygons {
            let mask = plane.classify_polygon(polygon);
            if Plane::is_spanning(mask) {
                spans += 1;
            } else {
                balance += i64::from(Plane::side_of(mask));
            }
        }
        let score = spans * SPAN_WEIGHT + balance.abs();
        if score < best_score {
            best_score = score;
            best = plane;
        }
    }
    best
}

/// Clip a convex polygon to an axis-aligned box. `None` when nothing remains.
pub(crate) fn clip_to_box(polygon: &Polygon, region: &BoundingBox) -> Option<Polygon> {
    let walls = [
        Plane { normal: Vector3::x(), w: region.max.x },
        Plane { normal: -Vector3::x(), w: -region.min.x },
        Plane { normal: Vector3::y(), w: region.max.y },
        Plane { normal: -Vector3::y(), w: -region.min.y },
        Plane { normal: Vector3::z(), w: region.max.z },
        Plane { normal: -Vector3::z(), w: -region.min.z },
    ];
    let mut current = polygon.clone();
    for wall in &walls {
        current = match wall.split_polygon(&current) {
            PolygonSplit::Front => return None,
            PolygonSplit::Back | PolygonSplit::CoplanarFront | PolygonSplit::CoplanarBack => current,
            PolygonSplit::Spanning { back, .. } => back?,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::SurfaceAllocator;
    use crate::primitives::{Anchor, make_box};
    use approx::assert_relative_eq;

    #[test]
    fn empty_tree_treats_everything_as_outside() {
        let mut s = SurfaceAllocator::new();
        let b = make_box(&mut s, [1.0, 1.0, 1.0], Anchor::Center).expect("box");
        let tree = BspTree::build(Vec::new());
        assert!(tree.nodes.is_empty());
        let (mut outside, mut inside) = (Vec::new(), Vec::new());
        tree.partition(b.polygons[0].clone(), CoplanarRule::AlwaysBack, &mut outside, &mut inside);
        assert_eq!(outside.len(), 1);
        assert!(inside.is_empty());
    }

    #[test]
    fn partition_splits_polygon_at_solid_boundary() {
        let mut s = SurfaceAllocator::new();
        let cube = make_box(&mut s, [2.0, 2.0, 2.0], Anchor::Center).expect("box");
        let tree = BspTree::build(cube.polygons.clone());

        // Horizontal square reaching from x = 0 to x = 2 through the cube wall.
        let probe = Polygon::new(
            vec![
                crate::geometry::Point3::new(0.0, -0.5, 0.0),
                crate::geometry::Point3::new(2.0, -0.5, 0.0),
                crate::geometry::Point3::new(2.0, 0.5, 0.0),
                crate::geometry::Point3::new(0.0, 0.5, 0.0),
            ],
            s.allocate(crate::mesh::SurfaceKind::Planar),
        )
        .expect("probe");
        let (mut outside, mut inside) = (Vec::new(), Vec::new());
        tree.partition(probe, CoplanarRule::AlwaysBack, &mut outside, &mut inside);
        let out_area: f64 = outside.iter().map(Polygon::area).sum();
        let in_area: f64 = inside.iter().map(Polygon::area).sum();
        assert_relative_eq!(out_area, 1.0, epsilon = 1e-9);
        assert_relative_eq!(in_area, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn clip_to_box_trims_polygon() {
        let mut s = SurfaceAllocator::new();
        let cube = make_box(&mut s, [4.0, 4.0, 4.0], Anchor::Center).expect("box");
        let region = BoundingBox::new(
            crate::geometry::Point3::new(-1.0, -1.0, -3.0),
            crate::geometry::Point3::new(1.0, 1.0, 3.0),
        );
        // Top face (z = 2) clipped to the 2 x 2 column.
        let top = &cube.polygons[1];
        let clipped = clip_to_box(top, &region).expect("overlap");
        assert_relative_eq!(clipped.area(), 4.0, epsilon = 1e-9);

        let far = BoundingBox::new(
            crate::geometry::Point3::new(10.0, 10.0, 10.0),
            crate::geometry::Point3::new(11.0, 11.0, 11.0),
        );
        assert!(clip_to_box(top, &far).is_none());
    }
}
