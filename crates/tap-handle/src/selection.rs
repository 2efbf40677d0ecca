use kernel_api::{Convexity, KernelId, KernelIntrospect};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::spec::TapHandleSpec;

/// Geometric band around the shaft/handle seam.
///
/// An edge passes when its centre lies within `z_tolerance` of Z=0 and its
/// radial distance from the shaft axis lies between the shaft radius and the
/// handle base radius, both widened by `radial_tolerance` (on the squared
/// radius). With `concave_only` set, the edge must also be a concave crease;
/// the convex rims of the handle top fall inside the same band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JunctionEdgeFilter {
    pub z_tolerance: f64,
    pub radial_tolerance: f64,
    pub concave_only: bool,
}

impl Default for JunctionEdgeFilter {
    fn default() -> Self {
        Self {
            z_tolerance: 0.2,
            radial_tolerance: 1.0,
            concave_only: true,
        }
    }
}

impl JunctionEdgeFilter {
    pub fn accepts(&self, center: [f64; 3], spec: &TapHandleSpec) -> bool {
        let r2 = center[0] * center[0] + center[1] * center[1];
        let inner = (spec.shaft_od / 2.0).powi(2) - self.radial_tolerance;
        let outer = (spec.handle_base_diameter / 2.0).powi(2) + self.radial_tolerance;
        center[2].abs() < self.z_tolerance && inner < r2 && r2 < outer
    }
}

/// Which edges the junction filter is applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JunctionSelection {
    /// Only edges the combining union created.
    #[default]
    Provenance,
    /// Every edge of the combined solid.
    ToleranceBand,
}

/// Candidates whose centre (and crease, when required) passes `filter`, in
/// candidate order.
pub fn select_junction_edges(
    introspect: &dyn KernelIntrospect,
    candidates: &[KernelId],
    spec: &TapHandleSpec,
    filter: &JunctionEdgeFilter,
) -> Vec<KernelId> {
    let selected: Vec<KernelId> = candidates
        .iter()
        .copied()
        .filter(|&edge| {
            introspect
                .edge_center(edge)
                .is_some_and(|c| filter.accepts(c, spec))
        })
        .filter(|&edge| {
            !filter.concave_only
                || introspect.edge_convexity(edge) == Some(Convexity::Concave)
        })
        .collect();
    debug!(
        candidates = candidates.len(),
        selected = selected.len(),
        "junction edge selection"
    );
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_limits() {
        let spec = TapHandleSpec::default();
        let filter = JunctionEdgeFilter::default();

        // Shaft radius 6.25, base radius 15.
        assert!(filter.accepts([6.25, 0.0, 0.1], &spec));
        assert!(filter.accepts([0.0, -10.0, -0.19], &spec));
        assert!(filter.accepts([15.0, 0.0, 0.0], &spec));
        assert!(!filter.accepts([6.25, 0.0, 0.2], &spec));
        assert!(!filter.accepts([6.0, 0.0, 0.0], &spec));
        assert!(!filter.accepts([15.1, 0.0, 0.0], &spec));
        assert!(!filter.accepts([0.0, 0.0, 0.0], &spec));
    }

    #[test]
    fn only_concave_creases_by_default() {
        use kernel_api::{Anchor, Kernel, MockKernel};

        let spec = TapHandleSpec::default();
        let mut kernel = MockKernel::new();
        let base = kernel.make_cylinder(15.0, 10.0, Anchor::Top).unwrap();
        let post = kernel.make_cylinder(6.25, 20.0, Anchor::Bottom).unwrap();
        let post = kernel.translate(&post, [0.0, 0.0, -0.1]).unwrap();
        let joined = kernel.boolean_union(&base, &post).unwrap();
        let edges = kernel.list_edges(&joined);

        let strict = select_junction_edges(&kernel, &edges, &spec, &JunctionEdgeFilter::default());
        assert!(!strict.is_empty());
        for &edge in &strict {
            assert_eq!(kernel.edge_convexity(edge), Some(Convexity::Concave));
        }

        let loose = JunctionEdgeFilter {
            concave_only: false,
            ..JunctionEdgeFilter::default()
        };
        let any = select_junction_edges(&kernel, &edges, &spec, &loose);
        assert!(any.len() > strict.len());
    }

    #[test]
    fn band_follows_spec() {
        let spec = TapHandleSpec {
            shaft_od: 20.0,
            ..TapHandleSpec::default()
        };
        let filter = JunctionEdgeFilter::default();
        assert!(!filter.accepts([6.25, 0.0, 0.1], &spec));
        assert!(filter.accepts([10.0, 0.0, 0.1], &spec));
    }
}
