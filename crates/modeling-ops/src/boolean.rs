use std::time::Instant;

use kernel_api::{KernelSolidHandle, ShapeKind, TopoKind};
use tracing::{debug, warn};

use crate::diff::{self, DiffTolerance};
use crate::kernel_ext::KernelBundle;
use crate::types::{Diagnostics, OpError, OpResult, Provenance};

/// Boolean operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanKind {
    Union,
    Subtract,
    Intersect,
}

/// Execute a boolean operation between two solids.
pub fn execute_boolean(
    kb: &mut dyn KernelBundle,
    body_a: &KernelSolidHandle,
    body_b: &KernelSolidHandle,
    kind: BooleanKind,
) -> Result<OpResult, OpError> {
    execute_boolean_with_tolerance(kb, body_a, body_b, kind, &DiffTolerance::default())
}

/// [`execute_boolean`] with an explicit signature matching tolerance.
pub fn execute_boolean_with_tolerance(
    kb: &mut dyn KernelBundle,
    body_a: &KernelSolidHandle,
    body_b: &KernelSolidHandle,
    kind: BooleanKind,
    tolerance: &DiffTolerance,
) -> Result<OpResult, OpError> {
    // Both inputs together form the "before" state.
    let mut before = diff::snapshot(kb.as_introspect(), body_a);
    before.extend(diff::snapshot(kb.as_introspect(), body_b));

    let start = Instant::now();
    let handle = match kind {
        BooleanKind::Union => kb.boolean_union(body_a, body_b)?,
        BooleanKind::Subtract => kb.boolean_subtract(body_a, body_b)?,
        BooleanKind::Intersect => kb.boolean_intersect(body_a, body_b)?,
    };
    let kernel_time_ms = start.elapsed().as_secs_f64() * 1000.0;

    let after = diff::snapshot(kb.as_introspect(), &handle);
    let diff_result = diff::diff(&before, &after, tolerance);

    let mut diagnostics = Diagnostics {
        kernel_time_ms,
        ..Diagnostics::default()
    };
    match kb.shape_kind(&handle)? {
        ShapeKind::Empty => diagnostics
            .warnings
            .push(format!("{kind:?} produced an empty result")),
        ShapeKind::Shell => diagnostics
            .warnings
            .push(format!("{kind:?} produced a shell without volume")),
        ShapeKind::Solid | ShapeKind::Compound => {}
    }
    if !kb.is_closed(&handle)? {
        diagnostics
            .warnings
            .push(format!("{kind:?} result has an open boundary"));
    }
    for w in &diagnostics.warnings {
        warn!(%handle, "{w}");
    }

    let provenance = Provenance {
        created: diff_result.created,
        deleted: diff_result.deleted,
        survived: diff_result.survived,
    };
    debug!(
        ?kind,
        %handle,
        created_edges = provenance.created_ids(TopoKind::Edge).len(),
        deleted_edges = provenance.deleted_count(TopoKind::Edge),
        kernel_time_ms,
        "boolean finished"
    );

    Ok(OpResult {
        handle,
        provenance,
        diagnostics,
    })
}
