use kernel_api::{KernelId, KernelIntrospect, KernelSolidHandle, TopoKind, TopoSignature};
use serde::{Deserialize, Serialize};

use crate::types::EntityRecord;

/// A snapshot of the topology of one or more solids at a point in time.
#[derive(Debug, Clone, Default)]
pub struct TopoSnapshot {
    pub faces: Vec<(KernelId, TopoSignature)>,
    pub edges: Vec<(KernelId, TopoSignature)>,
    pub vertices: Vec<(KernelId, TopoSignature)>,
}

impl TopoSnapshot {
    /// Append another snapshot, keeping this one's entities first.
    pub fn extend(&mut self, other: TopoSnapshot) {
        self.faces.extend(other.faces);
        self.edges.extend(other.edges);
        self.vertices.extend(other.vertices);
    }

    pub fn len(&self) -> usize {
        self.faces.len() + self.edges.len() + self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Take a topology snapshot of a solid for diffing.
pub fn snapshot(introspect: &dyn KernelIntrospect, solid: &KernelSolidHandle) -> TopoSnapshot {
    TopoSnapshot {
        faces: introspect.compute_all_signatures(solid, TopoKind::Face),
        edges: introspect.compute_all_signatures(solid, TopoKind::Edge),
        vertices: introspect.compute_all_signatures(solid, TopoKind::Vertex),
    }
}

/// How close two signatures must be to count as the same entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffTolerance {
    /// Centroid and bounding-box distance (mm).
    pub position: f64,
    /// Relative difference of lengths and areas.
    pub relative: f64,
}

impl Default for DiffTolerance {
    fn default() -> Self {
        Self {
            position: 1e-3,
            relative: 1e-3,
        }
    }
}

/// Result of diffing two topology snapshots.
#[derive(Debug, Clone, Default)]
pub struct DiffResult {
    /// Entities present in `after` but not in `before`.
    pub created: Vec<EntityRecord>,
    /// Entities present in `before` but not in `after`.
    pub deleted: Vec<EntityRecord>,
    /// (before, after) pairs that matched by signature.
    pub survived: Vec<(KernelId, KernelId)>,
}

/// Diff two topology snapshots to find created, deleted, and surviving entities.
///
/// Kernel ids are never reused between solids, so entities are paired purely
/// by signature. Each `after` entity claims the most similar unclaimed `before`
/// entity that matches within `tolerance`.
pub fn diff(before: &TopoSnapshot, after: &TopoSnapshot, tolerance: &DiffTolerance) -> DiffResult {
    let mut result = DiffResult::default();
    diff_kind(&before.faces, &after.faces, TopoKind::Face, tolerance, &mut result);
    diff_kind(&before.edges, &after.edges, TopoKind::Edge, tolerance, &mut result);
    diff_kind(&before.vertices, &after.vertices, TopoKind::Vertex, tolerance, &mut result);
    result
}

fn diff_kind(
    before: &[(KernelId, TopoSignature)],
    after: &[(KernelId, TopoSignature)],
    kind: TopoKind,
    tolerance: &DiffTolerance,
    result: &mut DiffResult,
) {
    let mut claimed = vec![false; before.len()];

    for (after_id, after_sig) in after {
        let best = before
            .iter()
            .enumerate()
            .filter(|(i, (_, sig))| !claimed[*i] && signatures_match(sig, after_sig, tolerance))
            .map(|(i, (_, sig))| (i, signature_similarity(sig, after_sig)))
            .fold(None::<(usize, f64)>, |best, (i, score)| match best {
                Some((_, s)) if s >= score => best,
                _ => Some((i, score)),
            });

        match best {
            Some((i, _)) => {
                claimed[i] = true;
                result.survived.push((before[i].0, *after_id));
            }
            None => result.created.push(EntityRecord {
                kernel_id: *after_id,
                kind,
                signature: after_sig.clone(),
            }),
        }
    }

    for ((id, sig), taken) in before.iter().zip(claimed) {
        if !taken {
            result.deleted.push(EntityRecord {
                kernel_id: *id,
                kind,
                signature: sig.clone(),
            });
        }
    }
}

fn within_relative(a: f64, b: f64, relative: f64) -> bool {
    let scale = a.abs().max(b.abs());
    scale < 1e-12 || (a - b).abs() <= relative * scale
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}

/// True when two signatures describe the same entity within `tolerance`.
///
/// Every property present on both sides must agree. A signature without a
/// centroid never matches.
pub fn signatures_match(a: &TopoSignature, b: &TopoSignature, tolerance: &DiffTolerance) -> bool {
    let (Some(ca), Some(cb)) = (a.centroid, b.centroid) else {
        return false;
    };
    if distance(ca, cb) > tolerance.position {
        return false;
    }
    if a.surface_type != b.surface_type {
        return false;
    }
    if let (Some(x), Some(y)) = (a.length, b.length) {
        if !within_relative(x, y, tolerance.relative) {
            return false;
        }
    }
    if let (Some(x), Some(y)) = (a.area, b.area) {
        if !within_relative(x, y, tolerance.relative) {
            return false;
        }
    }
    if let (Some(x), Some(y)) = (a.bbox, b.bbox) {
        if x.iter().zip(y).any(|(p, q)| (p - q).abs() > tolerance.position) {
            return false;
        }
    }
    true
}

/// Compute similarity between two topology signatures (0.0 to 1.0).
/// Higher means more similar. Used to rank candidate matches.
pub fn signature_similarity(a: &TopoSignature, b: &TopoSignature) -> f64 {
    let mut score = 0.0;
    let mut weight = 0.0;

    // Surface type match (high weight)
    if let (Some(st_a), Some(st_b)) = (&a.surface_type, &b.surface_type) {
        weight += 3.0;
        if st_a == st_b {
            score += 3.0;
        }
    }

    // Area similarity (medium weight)
    if let (Some(area_a), Some(area_b)) = (a.area, b.area) {
        weight += 2.0;
        let max_area = area_a.max(area_b);
        if max_area > 1e-12 {
            let diff = (area_a - area_b).abs() / max_area;
            score += 2.0 * (1.0 - diff.min(1.0));
        } else {
            score += 2.0;
        }
    }

    // Centroid proximity, falling to zero at 10 mm
    if let (Some(c_a), Some(c_b)) = (a.centroid, b.centroid) {
        weight += 2.0;
        score += 2.0 * (1.0 - (distance(c_a, c_b) / 10.0).min(1.0));
    }

    // Normal alignment (medium weight)
    if let (Some(n_a), Some(n_b)) = (a.normal, b.normal) {
        weight += 2.0;
        let dot = n_a[0] * n_b[0] + n_a[1] * n_b[1] + n_a[2] * n_b[2];
        score += 2.0 * ((dot + 1.0) / 2.0).clamp(0.0, 1.0);
    }

    // Length similarity (for edges)
    if let (Some(len_a), Some(len_b)) = (a.length, b.length) {
        weight += 2.0;
        let max_len = len_a.max(len_b);
        if max_len > 1e-12 {
            let diff = (len_a - len_b).abs() / max_len;
            score += 2.0 * (1.0 - diff.min(1.0));
        } else {
            score += 2.0;
        }
    }

    if weight > 0.0 {
        score / weight
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(centroid: [f64; 3], length: f64) -> TopoSignature {
        TopoSignature {
            centroid: Some(centroid),
            length: Some(length),
            ..TopoSignature::empty()
        }
    }

    #[test]
    fn matching_respects_tolerances() {
        let tol = DiffTolerance::default();
        let a = edge([0.0, 0.0, 0.0], 10.0);
        assert!(signatures_match(&a, &edge([0.0, 0.0, 5e-4], 10.005), &tol));
        assert!(!signatures_match(&a, &edge([0.0, 0.0, 0.1], 10.0), &tol));
        assert!(!signatures_match(&a, &edge([0.0, 0.0, 0.0], 10.1), &tol));
        assert!(!signatures_match(&a, &TopoSignature::empty(), &tol));
    }

    #[test]
    fn surface_types_must_agree() {
        let tol = DiffTolerance::default();
        let planar = TopoSignature {
            surface_type: Some("planar".to_string()),
            area: Some(4.0),
            centroid: Some([0.0; 3]),
            ..TopoSignature::empty()
        };
        let blend = TopoSignature {
            surface_type: Some("blend".to_string()),
            ..planar.clone()
        };
        assert!(signatures_match(&planar, &planar, &tol));
        assert!(!signatures_match(&planar, &blend, &tol));
    }

    #[test]
    fn diff_pairs_closest_candidate() {
        let before = TopoSnapshot {
            edges: vec![
                (KernelId(1), edge([0.0, 0.0, 0.0], 5.0)),
                (KernelId(2), edge([0.0, 0.0, 0.0004], 5.0)),
            ],
            ..TopoSnapshot::default()
        };
        let after = TopoSnapshot {
            edges: vec![
                (KernelId(10), edge([0.0, 0.0, 0.0004], 5.0)),
                (KernelId(11), edge([7.0, 0.0, 0.0], 2.0)),
            ],
            ..TopoSnapshot::default()
        };
        let result = diff(&before, &after, &DiffTolerance::default());
        assert_eq!(result.survived, vec![(KernelId(2), KernelId(10))]);
        assert_eq!(result.created.len(), 1);
        assert_eq!(result.created[0].kernel_id, KernelId(11));
        assert_eq!(result.deleted.len(), 1);
        assert_eq!(result.deleted[0].kernel_id, KernelId(1));
    }
}
