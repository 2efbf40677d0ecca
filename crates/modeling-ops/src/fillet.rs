use std::time::Instant;

use kernel_api::{KernelId, KernelSolidHandle, TopoKind};
use tracing::{debug, warn};

use crate::diff::{self, DiffTolerance};
use crate::kernel_ext::KernelBundle;
use crate::types::{Diagnostics, OpError, OpResult, Provenance};

/// Execute a fillet operation on specified edges of a solid.
pub fn execute_fillet(
    kb: &mut dyn KernelBundle,
    solid: &KernelSolidHandle,
    edges: &[KernelId],
    radius: f64,
) -> Result<OpResult, OpError> {
    execute_fillet_with_tolerance(kb, solid, edges, radius, &DiffTolerance::default())
}

/// [`execute_fillet`] with an explicit signature matching tolerance.
pub fn execute_fillet_with_tolerance(
    kb: &mut dyn KernelBundle,
    solid: &KernelSolidHandle,
    edges: &[KernelId],
    radius: f64,
    tolerance: &DiffTolerance,
) -> Result<OpResult, OpError> {
    if !(radius.is_finite() && radius > 0.0) {
        return Err(OpError::InvalidParameter {
            reason: format!("fillet radius must be positive, got {radius}"),
        });
    }
    if edges.is_empty() {
        return Err(OpError::InvalidParameter {
            reason: "no edges to fillet".to_string(),
        });
    }

    let before = diff::snapshot(kb.as_introspect(), solid);

    let start = Instant::now();
    let handle = kb.fillet_edges(solid, edges, radius)?;
    let kernel_time_ms = start.elapsed().as_secs_f64() * 1000.0;

    let after = diff::snapshot(kb.as_introspect(), &handle);
    let diff_result = diff::diff(&before, &after, tolerance);

    let mut diagnostics = Diagnostics {
        kernel_time_ms,
        ..Diagnostics::default()
    };
    if !kb.is_closed(&handle)? {
        let message = format!("fillet of {} edges left an open boundary", edges.len());
        warn!(%handle, "{message}");
        diagnostics.warnings.push(message);
    }

    let provenance = Provenance {
        created: diff_result.created,
        deleted: diff_result.deleted,
        survived: diff_result.survived,
    };
    debug!(
        %handle,
        edges = edges.len(),
        radius,
        created_faces = provenance.created_ids(TopoKind::Face).len(),
        kernel_time_ms,
        "fillet finished"
    );

    Ok(OpResult {
        handle,
        provenance,
        diagnostics,
    })
}
