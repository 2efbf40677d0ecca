use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::{Edge, FaceId, Loop, Topology, Vertex, VertexId};
use crate::config::KernelConfig;
use crate::geometry::{BoundingBox, Point3, Vector3, angle_between};

/// Partner of each half-edge as `(loop, position)`.
pub(crate) type Twins = Vec<Vec<Option<(usize, usize)>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Convexity {
    Convex,
    Concave,
    Tangent,
}

/// One crease segment between two loops of different faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeSegment {
    pub start: u32,
    pub end: u32,
    /// Loop that runs `start -> end` (on the edge's first face).
    pub left: usize,
    /// Loop that runs `end -> start`.
    pub right: usize,
}

pub(crate) fn pair_half_edges(loops: &[Loop]) -> Twins {
    let mut by_key: HashMap<(u32, u32), Vec<(usize, usize)>> = HashMap::new();
    for (li, l) in loops.iter().enumerate() {
        let n = l.points.len();
        for i in 0..n {
            by_key.entry((l.points[i], l.points[(i + 1) % n])).or_default().push((li, i));
        }
    }

    let mut twins: Twins = loops.iter().map(|l| vec![None; l.points.len()]).collect();
    for (li, l) in loops.iter().enumerate() {
        let n = l.points.len();
        for i in 0..n {
            if twins[li][i].is_some() {
                continue;
            }
            let Some(candidates) = by_key.get(&(l.points[(i + 1) % n], l.points[i])) else {
                continue;
            };
            if let Some(&(lj, j)) = candidates
                .iter()
                .find(|&&(lj, j)| (lj, j) != (li, i) && twins[lj][j].is_none())
            {
                twins[li][i] = Some((lj, j));
                twins[lj][j] = Some((li, i));
            }
        }
    }
    twins
}

fn direction(points: &[Point3], seg: &EdgeSegment) -> Vector3 {
    points[seg.end as usize] - points[seg.start as usize]
}

/// Split the segments of one face pair into chains. Returns segment indices
/// in walking order and whether the chain closes on itself.
fn chain_segments(points: &[Point3], segments: &[EdgeSegment], break_angle: f64) -> Vec<(Vec<usize>, bool)> {
    let mut outgoing: HashMap<u32, Vec<usize>> = HashMap::new();
    let mut incoming: HashMap<u32, usize> = HashMap::new();
    for (i, seg) in segments.iter().enumerate() {
        outgoing.entry(seg.start).or_default().push(i);
        *incoming.entry(seg.end).or_default() += 1;
    }

    let mut next: Vec<Option<usize>> = vec![None; segments.len()];
    let mut has_prev = vec![false; segments.len()];
    for (i, seg) in segments.iter().enumerate() {
        let Some(out) = outgoing.get(&seg.end) else {
            continue;
        };
        if out.len() != 1 || incoming.get(&seg.end).copied() != Some(1) {
            continue;
        }
        let follower = out[0];
        if follower == i {
            continue;
        }
        let turn = angle_between(&direction(points, seg), &direction(points, &segments[follower]));
        if turn <= break_angle {
            next[i] = Some(follower);
            has_prev[follower] = true;
        }
    }

    let mut visited = vec![false; segments.len()];
    let mut chains = Vec::new();
    for start in 0..segments.len() {
        if has_prev[start] || visited[start] {
            continue;
        }
        let mut chain = vec![start];
        visited[start] = true;
        let mut cur = start;
        while let Some(n) = next[cur] {
            if visited[n] {
                break;
            }
            visited[n] = true;
            chain.push(n);
            cur = n;
        }
        chains.push((chain, false));
    }
    // Whatever is left forms cycles.
    for start in 0..segments.len() {
        if visited[start] {
            continue;
        }
        let mut chain = vec![start];
        visited[start] = true;
        let mut cur = start;
        while let Some(n) = next[cur] {
            if visited[n] {
                break;
            }
            visited[n] = true;
            chain.push(n);
            cur = n;
        }
        // Start the cycle at its lowest point index.
        if let Some(pos) = (0..chain.len()).min_by_key(|&k| segments[chain[k]].start) {
            chain.rotate_left(pos);
        }
        chains.push((chain, true));
    }
    chains
}

pub(crate) fn build_edges(topology: &mut Topology, twins: &Twins, face_order: &[FaceId], config: &KernelConfig) {
    let face_rank: HashMap<FaceId, usize> = face_order.iter().enumerate().map(|(i, f)| (*f, i)).collect();
    let rank = |f: FaceId| face_rank.get(&f).copied().unwrap_or(usize::MAX);

    let mut groups: BTreeMap<(usize, usize), Vec<EdgeSegment>> = BTreeMap::new();
    for (li, l) in topology.loops.iter().enumerate() {
        let n = l.points.len();
        for (i, twin) in twins[li].iter().enumerate() {
            let Some((lj, _)) = *twin else {
                continue;
            };
            let (ra, rb) = (rank(l.face), rank(topology.loops[lj].face));
            if ra >= rb {
                continue;
            }
            groups.entry((ra, rb)).or_default().push(EdgeSegment {
                start: l.points[i],
                end: l.points[(i + 1) % n],
                left: li,
                right: lj,
            });
        }
    }

    let mut vertex_of_point: Vec<Option<VertexId>> = vec![None; topology.points.len()];
    for ((ra, rb), segments) in groups {
        let faces = [face_order[ra], face_order[rb]];
        for (chain, closed) in chain_segments(&topology.points, &segments, config.chain_break_angle) {
            let chain: Vec<EdgeSegment> = chain.into_iter().map(|i| segments[i]).collect();
            let mut edge = measure_edge(topology, faces, chain, closed, config);
            if !closed {
                let ends = [edge.segments[0].start, edge.segments[edge.segments.len() - 1].end];
                let ids = ends.map(|p| {
                    *vertex_of_point[p as usize].get_or_insert_with(|| {
                        topology.vertices.insert(Vertex {
                            point: topology.points[p as usize],
                            index: p,
                        })
                    })
                });
                edge.vertices = Some(ids);
            }
            topology.edges.insert(edge);
        }
    }
}

fn measure_edge(
    topology: &Topology,
    faces: [FaceId; 2],
    segments: Vec<EdgeSegment>,
    closed: bool,
    config: &KernelConfig,
) -> Edge {
    let points = &topology.points;
    let mut length = 0.0;
    let mut weighted = Vector3::zeros();
    let mut bbox = BoundingBox::empty();
    let mut dihedral = 0.0;
    let mut votes = [0.0f64; 3];
    for seg in &segments {
        let a = points[seg.start as usize];
        let b = points[seg.end as usize];
        bbox.expand_to_include(&a);
        bbox.expand_to_include(&b);
        let len = (b - a).norm();
        length += len;
        weighted += (a.coords + b.coords) * 0.5 * len;

        let n_a = topology.loops[seg.left].plane.normal;
        let n_b = topology.loops[seg.right].plane.normal;
        let angle = angle_between(&n_a, &n_b);
        dihedral += angle * len;
        let vote = if angle < config.min_fillet_angle {
            2
        } else if (b - a).cross(&n_b).dot(&n_a) < 0.0 {
            0
        } else {
            1
        };
        votes[vote] += len;
    }

    let convexity = if votes[0] >= votes[1] && votes[0] >= votes[2] {
        Convexity::Convex
    } else if votes[1] >= votes[2] {
        Convexity::Concave
    } else {
        Convexity::Tangent
    };

    let (centroid, dihedral) = if length > 0.0 {
        (Point3::from(weighted / length), dihedral / length)
    } else {
        (points[segments[0].start as usize], 0.0)
    };

    Edge {
        faces,
        center: point_at_half_length(points, &segments, length),
        segments,
        closed,
        length,
        centroid,
        convexity,
        dihedral,
        bbox,
        vertices: None,
    }
}

fn point_at_half_length(points: &[Point3], segments: &[EdgeSegment], length: f64) -> Point3 {
    let half = length * 0.5;
    let mut walked = 0.0;
    for seg in segments {
        let a = points[seg.start as usize];
        let b = points[seg.end as usize];
        let len = (b - a).norm();
        if walked + len >= half && len > 0.0 {
            let t = (half - walked) / len;
            return a + (b - a) * t;
        }
        walked += len;
    }
    points[segments[segments.len() - 1].end as usize]
}
