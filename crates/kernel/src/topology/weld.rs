//! Vertex welding and loop clean-up.

use std::collections::HashMap;

use crate::geometry::{BoundingBox, Point3, newell_normal};

type Cell = (i64, i64, i64);

/// Uniform hash grid over point indices. The map is only ever probed by key.
#[derive(Debug, Default)]
pub(crate) struct PointGrid {
    cell_size: f64,
    cells: HashMap<Cell, Vec<u32>>,
}

impl PointGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    fn cell_of(&self, p: &Point3) -> Cell {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
            (p.z / self.cell_size).floor() as i64,
        )
    }

    pub fn insert(&mut self, index: u32, p: &Point3) {
        let cell = self.cell_of(p);
        self.cells.entry(cell).or_default().push(index);
    }

    /// Indices stored in the 27 cells around `p`.
    pub fn neighbours(&self, p: &Point3, out: &mut Vec<u32>) {
        let (cx, cy, cz) = self.cell_of(p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if let Some(found) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) {
                        out.extend_from_slice(found);
                    }
                }
            }
        }
    }
}

/// Merges points closer than the tolerance; first come is the representative.
pub(crate) struct Welder {
    tolerance: f64,
    grid: PointGrid,
    points: Vec<Point3>,
    scratch: Vec<u32>,
}

impl Welder {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            grid: PointGrid::new(tolerance),
            points: Vec::new(),
            scratch: Vec::new(),
        }
    }

    pub fn insert(&mut self, p: &Point3) -> u32 {
        self.scratch.clear();
        self.grid.neighbours(p, &mut self.scratch);
        let tol2 = self.tolerance * self.tolerance;
        let hit = self
            .scratch
            .iter()
            .copied()
            .filter(|&i| (self.points[i as usize] - p).norm_squared() <= tol2)
            .min();
        if let Some(existing) = hit {
            return existing;
        }
        let index = self.points.len() as u32;
        self.points.push(*p);
        self.grid.insert(index, p);
        index
    }

    pub fn into_points(self) -> Vec<Point3> {
        self.points
    }
}

/// Remove repeated points and back-and-forth spikes. Returns `false` when
/// fewer than three points survive.
pub(crate) fn clean_loop(points: &mut Vec<u32>) -> bool {
    'scan: loop {
        let n = points.len();
        if n < 3 {
            return false;
        }
        for i in 0..n {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            if points[i] == next || prev == next {
                points.remove(i);
                continue 'scan;
            }
        }
        return true;
    }
}

pub(crate) fn loop_area(points: &[Point3], indices: &[u32]) -> f64 {
    let pts: Vec<Point3> = indices.iter().map(|&i| points[i as usize]).collect();
    newell_normal(&pts).norm() * 0.5
}

/// Insert welded points lying on unmatched loop edges into those edges, so
/// that neighbouring loops share identical vertex sequences.
pub(crate) fn repair_t_junctions(points: &[Point3], loops: &mut [Vec<u32>], tolerance: f64) -> usize {
    if points.is_empty() {
        return 0;
    }
    let mut directed: HashMap<(u32, u32), u32> = HashMap::new();
    for indices in loops.iter() {
        let n = indices.len();
        for i in 0..n {
            *directed.entry((indices[i], indices[(i + 1) % n])).or_default() += 1;
        }
    }

    let bounds = BoundingBox::from_points(points);
    let cell = (bounds.size().norm() / 128.0).max(tolerance * 10.0);
    let mut grid = PointGrid::new(cell);
    for (i, p) in points.iter().enumerate() {
        grid.insert(i as u32, p);
    }

    let mut inserted = 0usize;
    let mut candidates = Vec::new();
    let mut on_edge: Vec<(f64, u32)> = Vec::new();
    for indices in loops.iter_mut() {
        let n = indices.len();
        let mut rebuilt = Vec::with_capacity(n);
        for i in 0..n {
            let a = indices[i];
            let b = indices[(i + 1) % n];
            rebuilt.push(a);
            if directed.contains_key(&(b, a)) {
                continue;
            }

            let pa = points[a as usize];
            let ab = points[b as usize] - pa;
            let len = ab.norm();
            if len <= tolerance {
                continue;
            }
            let dir = ab / len;

            // Samples one cell apart; each probes its 27 neighbouring cells.
            candidates.clear();
            let steps = (len / cell).ceil().max(1.0) as usize;
            for s in 0..=steps {
                let sample = pa + ab * (s as f64 / steps as f64);
                grid.neighbours(&sample, &mut candidates);
            }
            candidates.sort_unstable();
            candidates.dedup();

            on_edge.clear();
            for &c in &candidates {
                if c == a || c == b {
                    continue;
                }
                let ap = points[c as usize] - pa;
                let along = ap.dot(&dir);
                if along <= tolerance || along >= len - tolerance {
                    continue;
                }
                if (ap - dir * along).norm() <= tolerance {
                    on_edge.push((along, c));
                }
            }
            on_edge.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));
            inserted += on_edge.len();
            rebuilt.extend(on_edge.iter().map(|&(_, c)| c));
        }
        *indices = rebuilt;
    }
    inserted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welder_merges_close_points() {
        let mut w = Welder::new(1e-4);
        let a = w.insert(&Point3::new(1.0, 1.0, 1.0));
        let b = w.insert(&Point3::new(1.0 + 5e-5, 1.0, 1.0));
        let c = w.insert(&Point3::new(1.1, 1.0, 1.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(w.into_points().len(), 2);
    }

    #[test]
    fn welder_checks_neighbour_cells() {
        let mut w = Welder::new(1e-4);
        // Straddles a cell boundary at x = 0.
        let a = w.insert(&Point3::new(-1e-6, 0.0, 0.0));
        let b = w.insert(&Point3::new(1e-6, 0.0, 0.0));
        assert_eq!(a, b);
    }

    #[test]
    fn clean_loop_drops_spikes_and_duplicates() {
        let mut pts = vec![0, 1, 1, 2, 3];
        assert!(clean_loop(&mut pts));
        assert_eq!(pts, vec![0, 1, 2, 3]);

        let mut spike = vec![0, 1, 2, 1];
        assert!(!clean_loop(&mut spike));
    }

    #[test]
    fn t_junction_inserts_midpoint() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ];
        let mut loops = vec![vec![0, 1, 2]];
        let inserted = repair_t_junctions(&points, &mut loops, 1e-4);
        assert_eq!(inserted, 1);
        assert_eq!(loops[0], vec![0, 3, 1, 2]);
    }
}
