//! Constant-radius edge rounds.
//!
//! Every selected edge gets a sweep tool: the rolling-ball cross-section
//! (corner, tangent points and arc) carried along the edge chain. Convex tools
//! are subtracted and concave tools are unioned. Concave rounds go first;
//! the convex creases they leave behind are rounded together with the
//! selected convex edges.

use std::f64::consts::PI;

use tracing::{debug, info, instrument};

use super::OperationError;
use crate::boolean::{BoolOp, boolean_op};
use crate::config::KernelConfig;
use crate::geometry::{Point3, Vector3, angle_between};
use crate::mesh::{FacetedSolid, Polygon, Surface, SurfaceAllocator, SurfaceKind};
use crate::topology::{Convexity, Edge, EdgeId, Topology};

/// Smallest wedge angle (radians) a profile can be built for.
const MIN_WEDGE: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    /// Material is removed; the tool reaches outwards.
    Convex,
    /// Material is added; the tool reaches into the solid.
    Concave,
}

impl Side {
    fn sign(self) -> f64 {
        match self {
            Side::Convex => 1.0,
            Side::Concave => -1.0,
        }
    }
}

/// Frame of the sweep at one chain vertex.
struct Station {
    point: Point3,
    tangent: Vector3,
    normal_a: Vector3,
    normal_b: Vector3,
    /// Bend direction and stretch factor across a mitred joint.
    miter: Option<(Vector3, f64)>,
}

/// Round `edges` of `solid` with `radius`.
#[instrument(skip(solid, topology, edges, config, surfaces), fields(edges = edges.len()))]
pub fn fillet_edges(
    solid: &FacetedSolid,
    topology: &Topology,
    edges: &[EdgeId],
    radius: f64,
    config: &KernelConfig,
    surfaces: &mut SurfaceAllocator,
) -> Result<FacetedSolid, OperationError> {
    if !(radius.is_finite() && radius > 0.0) {
        return Err(OperationError::FilletFailed {
            reason: format!("radius must be positive, got {radius}"),
        });
    }

    let mut selected: Vec<EdgeId> = Vec::with_capacity(edges.len());
    for &id in edges {
        let edge = topology.edges.get(id).ok_or(OperationError::EdgeNotFound)?;
        if edge.convexity == Convexity::Tangent {
            return Err(OperationError::FilletFailed {
                reason: format!(
                    "edge is tangent ({:.2} degrees between faces), nothing to round",
                    edge.dihedral.to_degrees()
                ),
            });
        }
        if !selected.contains(&id) {
            selected.push(id);
        }
    }
    let (convex, concave): (Vec<EdgeId>, Vec<EdgeId>) = selected
        .iter()
        .copied()
        .partition(|id| topology.edges[*id].convexity == Convexity::Convex);
    info!(radius, convex = convex.len(), concave = concave.len(), "filleting edges");

    let mut current = solid.clone();
    let mut blends: Vec<u32> = Vec::new();
    for &id in &concave {
        let (tool, blend) = sweep_tool(topology, &topology.edges[id], radius, Side::Concave, config, surfaces)?;
        blends.push(blend.id);
        current = boolean_op(&current, &tool, BoolOp::Union, config);
    }

    if convex.is_empty() {
        return Ok(current);
    }

    if concave.is_empty() {
        for &id in &convex {
            let (tool, _) = sweep_tool(topology, &topology.edges[id], radius, Side::Convex, config, surfaces)?;
            current = boolean_op(&current, &tool, BoolOp::Difference, config);
        }
        return Ok(current);
    }

    // Concave blends changed the creases: pick the convex edges again on the
    // blended solid.
    let polylines: Vec<Vec<(Point3, Point3)>> = convex
        .iter()
        .map(|&id| {
            topology.edges[id]
                .segments
                .iter()
                .map(|s| (topology.points[s.start as usize], topology.points[s.end as usize]))
                .collect()
        })
        .collect();
    let blended = Topology::build(&current, config);
    let reach = config.weld_tolerance * 10.0;
    let reselected: Vec<EdgeId> = blended
        .edges
        .iter()
        .filter(|(_, e)| e.convexity == Convexity::Convex)
        .filter(|(_, e)| {
            let touches_blend = e
                .faces
                .iter()
                .any(|f| blends.contains(&blended.faces[*f].surface.id));
            touches_blend
                || polylines
                    .iter()
                    .flatten()
                    .any(|(a, b)| distance_to_segment(&e.center, a, b) <= reach)
        })
        .map(|(id, _)| id)
        .collect();
    debug!(selected = convex.len(), reselected = reselected.len(), "convex edges after blending");

    for id in reselected {
        let (tool, _) = sweep_tool(&blended, &blended.edges[id], radius, Side::Convex, config, surfaces)?;
        current = boolean_op(&current, &tool, BoolOp::Difference, config);
    }
    Ok(current)
}

fn distance_to_segment(p: &Point3, a: &Point3, b: &Point3) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 <= f64::MIN_POSITIVE {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Stations at every chain vertex, with averaged frames at the joints.
fn stations(topology: &Topology, edge: &Edge, side: Side, config: &KernelConfig) -> Vec<Station> {
    let segs = &edge.segments;
    let m = segs.len();
    let tangents: Vec<Vector3> = segs
        .iter()
        .map(|s| (topology.points[s.end as usize] - topology.points[s.start as usize]).normalize())
        .collect();
    let normals: Vec<(Vector3, Vector3)> = segs
        .iter()
        .map(|s| (topology.loops[s.left].plane.normal, topology.loops[s.right].plane.normal))
        .collect();

    let count = if edge.closed { m } else { m + 1 };
    (0..count)
        .map(|j| {
            let (incoming, outgoing) = if edge.closed {
                (Some((j + m - 1) % m), Some(j))
            } else {
                (j.checked_sub(1), (j < m).then_some(j))
            };
            let point = match outgoing {
                Some(k) => topology.points[segs[k].start as usize],
                None => topology.points[segs[m - 1].end as usize],
            };
            let adjacent: Vec<usize> = incoming.into_iter().chain(outgoing).collect();
            let tangent = adjacent
                .iter()
                .fold(Vector3::zeros(), |acc, &k| acc + tangents[k])
                .normalize();
            let average = |pick: fn(&(Vector3, Vector3)) -> Vector3| {
                let n = adjacent.iter().fold(Vector3::zeros(), |acc, &k| acc + pick(&normals[k]));
                (n - tangent * n.dot(&tangent)).normalize()
            };
            let normal_a = average(|n| n.0);
            let normal_b = average(|n| n.1);

            let miter = match (incoming, outgoing) {
                (Some(i), Some(o)) => {
                    let bend = tangents[o] - tangents[i];
                    let alpha = angle_between(&tangents[i], &tangents[o]);
                    (bend.norm() > 1e-9).then(|| (bend.normalize(), 1.0 / (alpha / 2.0).cos()))
                }
                _ => None,
            };

            // Open convex chains reach past their end faces.
            let point = match (side, edge.closed, incoming, outgoing) {
                (Side::Convex, false, None, _) => point - tangent * config.fillet_overshoot,
                (Side::Convex, false, _, None) => point + tangent * config.fillet_overshoot,
                _ => point,
            };
            Station {
                point,
                tangent,
                normal_a,
                normal_b,
                miter,
            }
        })
        .collect()
}

/// Closed cross-section at a station: pushed corner, pushed tangent point on
/// face A, the arc from A to B, pushed tangent point on face B.
fn profile(station: &Station, radius: f64, side: Side, config: &KernelConfig) -> Option<Vec<Point3>> {
    let p = station.point;
    let u_a = station.normal_a.cross(&station.tangent).try_normalize(1e-12)?;
    let u_b = station.tangent.cross(&station.normal_b).try_normalize(1e-12)?;
    let phi = angle_between(&u_a, &u_b);
    if !(MIN_WEDGE..=PI - MIN_WEDGE).contains(&phi) {
        return None;
    }

    let d = radius / (phi / 2.0).tan();
    let h = radius / (phi / 2.0).sin();
    let center = p + (u_a + u_b).normalize() * h;
    let t_a = p + u_a * d;
    let t_b = p + u_b * d;
    let v_a = (t_a - center) / radius;
    let v_b = (t_b - center) / radius;
    let beta = angle_between(&v_a, &v_b);
    let sin_beta = beta.sin();

    let push = side.sign() * config.fillet_overshoot;
    let n = config.fillet_segments.max(1) as usize;
    let mut points = Vec::with_capacity(n + 4);
    let cos_nn = station.normal_a.dot(&station.normal_b);
    points.push(p + (station.normal_a + station.normal_b) * (push / (1.0 + cos_nn)));
    points.push(t_a + station.normal_a * push);
    for i in 0..=n {
        let s = i as f64 / n as f64;
        let q = if sin_beta.abs() < 1e-12 {
            t_a + (t_b - t_a) * s
        } else {
            center + (v_a * ((1.0 - s) * beta).sin() + v_b * (s * beta).sin()) * (radius / sin_beta)
        };
        points.push(q);
    }
    points.push(t_b + station.normal_b * push);

    if let Some((bend, stretch)) = station.miter {
        for q in &mut points {
            let offset = *q - p;
            *q += bend * (offset.dot(&bend) * (stretch - 1.0));
        }
    }
    Some(points)
}

/// Sweep tool for one edge. Returns the tool and the surface of its arc side.
fn sweep_tool(
    topology: &Topology,
    edge: &Edge,
    radius: f64,
    side: Side,
    config: &KernelConfig,
    surfaces: &mut SurfaceAllocator,
) -> Result<(FacetedSolid, Surface), OperationError> {
    let stations = stations(topology, edge, side, config);
    let profiles: Vec<Vec<Point3>> = stations
        .iter()
        .enumerate()
        .map(|(i, s)| profile(s, radius, side, config).ok_or(OperationError::FilletFailed {
            reason: format!("profile degenerates at station {i}"),
        }))
        .collect::<Result<_, _>>()?;

    let k = profiles[0].len();
    let arc_edges = 2..k - 2;
    let first = &stations[0];
    let winding: f64 = (0..k)
        .map(|i| {
            (profiles[0][i] - first.point)
                .cross(&(profiles[0][(i + 1) % k] - first.point))
                .dot(&first.tangent)
        })
        .sum();
    let flip = winding < 0.0;

    let blend = surfaces.allocate(SurfaceKind::Blend);
    let flats: Vec<Surface> = (0..k).map(|_| surfaces.allocate(SurfaceKind::Planar)).collect();
    let mut polygons = Vec::new();
    let mut emit = |mut vertices: Vec<Point3>, surface: Surface| {
        if flip {
            vertices.reverse();
        }
        if let Some(p) = Polygon::new(vertices, surface) {
            polygons.push(p);
        }
    };

    let spans = if edge.closed { stations.len() } else { stations.len() - 1 };
    for s in 0..spans {
        let (here, there) = (&profiles[s], &profiles[(s + 1) % stations.len()]);
        for i in 0..k {
            let j = (i + 1) % k;
            let surface = if arc_edges.contains(&i) { blend } else { flats[i] };
            emit(vec![here[i], here[j], there[j]], surface);
            emit(vec![here[i], there[j], there[i]], surface);
        }
    }

    if !edge.closed {
        let start_cap = surfaces.allocate(SurfaceKind::Planar);
        let end_cap = surfaces.allocate(SurfaceKind::Planar);
        let last = stations.len() - 1;
        for i in 0..k {
            let j = (i + 1) % k;
            emit(vec![stations[0].point, profiles[0][j], profiles[0][i]], start_cap);
            emit(vec![stations[last].point, profiles[last][i], profiles[last][j]], end_cap);
        }
    }

    debug!(
        ?side,
        stations = stations.len(),
        closed = edge.closed,
        polygons = polygons.len(),
        "built fillet tool"
    );
    Ok((FacetedSolid::new(polygons), blend))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{Anchor, make_box, make_cylinder};
    use approx::assert_relative_eq;

    /// Area between a right-angle corner and an `n`-segment inscribed arc.
    fn corner_area(radius: f64, n: u32) -> f64 {
        let sector = 0.5 * f64::from(n) * radius * radius * (PI / 2.0 / f64::from(n)).sin();
        radius * radius - sector
    }

    fn edge_near(topology: &Topology, point: [f64; 3]) -> EdgeId {
        let target = Point3::new(point[0], point[1], point[2]);
        topology
            .edges
            .iter()
            .min_by(|a, b| {
                (a.1.center - target)
                    .norm()
                    .total_cmp(&(b.1.center - target).norm())
            })
            .map(|(id, _)| id)
            .expect("solid has edges")
    }

    #[test]
    fn convex_box_edge_removes_corner_strip() {
        let cfg = KernelConfig::default();
        let mut s = SurfaceAllocator::new();
        let cube = make_box(&mut s, [10.0, 10.0, 10.0], Anchor::Center).expect("box");
        let topo = Topology::build(&cube, &cfg);
        let edge = edge_near(&topo, [0.0, -5.0, 5.0]);

        let rounded = fillet_edges(&cube, &topo, &[edge], 2.0, &cfg, &mut s).expect("fillet");
        let expected = 1000.0 - corner_area(2.0, cfg.fillet_segments) * 10.0;
        assert_relative_eq!(rounded.volume(), expected, epsilon = 1e-6);

        let after = Topology::build(&rounded, &cfg);
        assert!(after.is_closed());
        assert!(after.faces.values().any(|f| f.surface.kind == SurfaceKind::Blend));
    }

    #[test]
    fn concave_edge_adds_material() {
        let cfg = KernelConfig::default();
        let mut s = SurfaceAllocator::new();
        let base = make_box(&mut s, [20.0, 10.0, 10.0], Anchor::Bottom)
            .expect("box")
            .translated(&Vector3::new(10.0, 5.0, 0.0));
        let post = make_box(&mut s, [10.0, 10.0, 10.0], Anchor::Bottom)
            .expect("box")
            .translated(&Vector3::new(5.0, 5.0, 10.0));
        let l = boolean_op(&base, &post, BoolOp::Union, &cfg);
        let topo = Topology::build(&l, &cfg);
        let concave: Vec<EdgeId> = topo
            .edges
            .iter()
            .filter(|(_, e)| e.convexity == Convexity::Concave)
            .map(|(id, _)| id)
            .collect();
        assert_eq!(concave.len(), 1);

        let rounded = fillet_edges(&l, &topo, &concave, 2.0, &cfg, &mut s).expect("fillet");
        let expected = 3000.0 + corner_area(2.0, cfg.fillet_segments) * 10.0;
        assert_relative_eq!(rounded.volume(), expected, epsilon = 1e-6);
        assert!(Topology::build(&rounded, &cfg).is_closed());
    }

    #[test]
    fn all_box_edges_round_every_crease() {
        let cfg = KernelConfig::coarse();
        let mut s = SurfaceAllocator::new();
        let cube = make_box(&mut s, [10.0, 10.0, 10.0], Anchor::Center).expect("box");
        let topo = Topology::build(&cube, &cfg);
        let all: Vec<EdgeId> = topo.edges.keys().collect();

        let rounded = fillet_edges(&cube, &topo, &all, 1.0, &cfg, &mut s).expect("fillet");
        let strip = corner_area(1.0, cfg.fillet_segments) * 10.0;
        assert!(rounded.volume() < 1000.0 - 6.0 * strip);
        assert!(rounded.volume() > 1000.0 - 12.0 * strip);
    }

    #[test]
    fn cylinder_rim_is_a_closed_sweep() {
        let cfg = KernelConfig::coarse();
        let mut s = SurfaceAllocator::new();
        let cyl = make_cylinder(&mut s, 5.0, 4.0, cfg.circle_segments, Anchor::Bottom).expect("cylinder");
        let topo = Topology::build(&cyl, &cfg);
        let top = topo
            .edges
            .iter()
            .max_by(|a, b| a.1.centroid.z.total_cmp(&b.1.centroid.z))
            .map(|(id, _)| id)
            .expect("rim edge");
        assert!(topo.edges[top].closed);

        let rounded = fillet_edges(&cyl, &topo, &[top], 1.0, &cfg, &mut s).expect("fillet");
        let removed = cyl.volume() - rounded.volume();
        let ring = corner_area(1.0, cfg.fillet_segments) * std::f64::consts::TAU * 5.0;
        assert!(removed > 0.5 * ring && removed < 1.5 * ring, "removed {removed}, ring {ring}");
        assert!(Topology::build(&rounded, &cfg).is_closed());
    }

    #[test]
    fn rejects_bad_radius_and_unknown_edge() {
        let cfg = KernelConfig::default();
        let mut s = SurfaceAllocator::new();
        let cube = make_box(&mut s, [1.0, 1.0, 1.0], Anchor::Center).expect("box");
        let topo = Topology::build(&cube, &cfg);
        let edge = topo.edges.keys().next().expect("edge");
        assert!(matches!(
            fillet_edges(&cube, &topo, &[edge], 0.0, &cfg, &mut s),
            Err(OperationError::FilletFailed { .. })
        ));
        assert_eq!(
            fillet_edges(&cube, &topo, &[EdgeId::default()], 0.1, &cfg, &mut s).unwrap_err(),
            OperationError::EdgeNotFound
        );
    }
}
