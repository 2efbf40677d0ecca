//! Constructive build of the tap handle.
//!
//! The model is a filleted T handle with a round shaft standing on it. The
//! shaft ends in a hex drive with a square socket for the tap, and a bolt
//! clearance hole runs up through the handle.

use kernel_api::{Anchor, KernelId, KernelSolidHandle, TopoKind};
use modeling_ops::{
    execute_boolean_with_tolerance, execute_fillet_with_tolerance, BooleanKind, KernelBundle,
    OpResult,
};
use tracing::{debug, info, instrument, warn};

use crate::config::BuildConfig;
use crate::constants::{
    BOLT_HOLE_DIAMETER, BOLT_HOLE_LENGTH, BOOLEAN_CLEARANCE_HANDLE, BOOLEAN_CLEARANCE_SEAM,
    HANDLE_FILLET_RADIUS, JUNCTION_FILLET_RADIUS,
};
use crate::error::BuildError;
use crate::selection::{select_junction_edges, JunctionSelection};
use crate::spec::TapHandleSpec;

/// Named points in the build sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    /// Rounded T handle, lifted by the handle clearance.
    Handle,
    /// Round shaft with the hex drive on top.
    Shaft,
    Combined,
    JunctionFillet,
    Socket,
    ReliefBore,
    BoltHole,
}

/// Result of [`build_tap_handle`].
#[derive(Debug, Clone)]
pub struct TapHandleBuild {
    /// The finished solid.
    pub solid: KernelSolidHandle,
    /// Edges of the combined solid that received the junction fillet.
    pub junction_edges: Vec<KernelId>,
    /// Solid after each stage, in build order.
    pub stages: Vec<(BuildStage, KernelSolidHandle)>,
    /// Warnings reported by the modelling operations.
    pub warnings: Vec<String>,
}

impl TapHandleBuild {
    pub fn stage(&self, stage: BuildStage) -> Option<&KernelSolidHandle> {
        self.stages.iter().find(|(s, _)| *s == stage).map(|(_, h)| h)
    }
}

/// Build the tap handle solid with the default [`BuildConfig`].
pub fn make_tap_handle<K: KernelBundle>(
    kernel: &mut K,
    spec: &TapHandleSpec,
) -> Result<KernelSolidHandle, BuildError> {
    build_tap_handle(kernel, spec, &BuildConfig::default()).map(|build| build.solid)
}

/// Build the tap handle solid.
///
/// The spec is validated before any kernel call. Kernel failures are not
/// retried.
#[instrument(skip_all)]
pub fn build_tap_handle<K: KernelBundle>(
    kernel: &mut K,
    spec: &TapHandleSpec,
    config: &BuildConfig,
) -> Result<TapHandleBuild, BuildError> {
    spec.validate()?;
    if let Ok(json) = serde_json::to_string(spec) {
        debug!(spec = %json, "building tap handle");
    }

    let mut session = Session {
        kb: kernel,
        config,
        stages: Vec::new(),
        warnings: Vec::new(),
    };

    let handle = session.handle(spec)?;
    let shaft = session.shaft(spec)?;

    let combined = session.boolean(&handle, &shaft, BooleanKind::Union)?;
    session.record(BuildStage::Combined, &combined.handle);

    let candidates = match config.junction_selection {
        JunctionSelection::Provenance => combined.provenance.created_ids(TopoKind::Edge),
        JunctionSelection::ToleranceBand => session.kb.list_edges(&combined.handle),
    };
    let junction_edges = select_junction_edges(
        session.kb.as_introspect(),
        &candidates,
        spec,
        &config.junction_filter,
    );
    if junction_edges.is_empty() {
        return Err(BuildError::NoJunctionEdges {
            candidates: candidates.len(),
        });
    }
    info!(
        selection = ?config.junction_selection,
        candidates = candidates.len(),
        edges = junction_edges.len(),
        "filleting shaft junction"
    );
    let solid = session
        .fillet(&combined.handle, &junction_edges, JUNCTION_FILLET_RADIUS)?
        .handle;
    if !session.kb.is_closed(&solid)? {
        return Err(BuildError::OpenJunction {
            edges: junction_edges.len(),
        });
    }
    session.record(BuildStage::JunctionFillet, &solid);

    let solid = session.cutouts(spec, solid)?;

    info!(
        %solid,
        junction_edges = junction_edges.len(),
        warnings = session.warnings.len(),
        "tap handle built"
    );
    Ok(TapHandleBuild {
        solid,
        junction_edges,
        stages: session.stages,
        warnings: session.warnings,
    })
}

struct Session<'a> {
    kb: &'a mut dyn KernelBundle,
    config: &'a BuildConfig,
    stages: Vec<(BuildStage, KernelSolidHandle)>,
    warnings: Vec<String>,
}

impl Session<'_> {
    fn record(&mut self, stage: BuildStage, solid: &KernelSolidHandle) {
        debug!(?stage, %solid, "stage complete");
        self.stages.push((stage, solid.clone()));
    }

    fn collect(&mut self, result: OpResult) -> OpResult {
        for w in &result.diagnostics.warnings {
            warn!(handle = %result.handle, "{w}");
        }
        self.warnings.extend(result.diagnostics.warnings.iter().cloned());
        result
    }

    fn boolean(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
        kind: BooleanKind,
    ) -> Result<OpResult, BuildError> {
        let result =
            execute_boolean_with_tolerance(self.kb, a, b, kind, &self.config.diff_tolerance)?;
        Ok(self.collect(result))
    }

    fn fillet(
        &mut self,
        solid: &KernelSolidHandle,
        edges: &[KernelId],
        radius: f64,
    ) -> Result<OpResult, BuildError> {
        let result = execute_fillet_with_tolerance(
            self.kb,
            solid,
            edges,
            radius,
            &self.config.diff_tolerance,
        )?;
        Ok(self.collect(result))
    }

    /// Base disc plus two crossing bars, every edge rounded, top at Z=0 before
    /// the clearance lift.
    #[instrument(skip_all)]
    fn handle(&mut self, spec: &TapHandleSpec) -> Result<KernelSolidHandle, BuildError> {
        let height = spec.handle_t_height;
        let base = self
            .kb
            .make_cylinder(spec.handle_base_diameter / 2.0, height, Anchor::Top)?;
        let bar = self.kb.make_box(
            [spec.handle_t_length, spec.handle_t_width, height],
            Anchor::Top,
        )?;
        let cross = self.kb.make_box(
            [spec.handle_t_width, spec.handle_t_length_2, height],
            Anchor::Top,
        )?;

        let t = self.boolean(&base, &bar, BooleanKind::Union)?.handle;
        let t = self.boolean(&t, &cross, BooleanKind::Union)?.handle;

        let edges = self.kb.list_edges(&t);
        debug!(handle = %t, edges = edges.len(), "rounding every handle edge");
        let rounded = self.fillet(&t, &edges, HANDLE_FILLET_RADIUS)?.handle;

        let lifted = self
            .kb
            .translate(&rounded, [0.0, 0.0, BOOLEAN_CLEARANCE_HANDLE])?;
        self.record(BuildStage::Handle, &lifted);
        Ok(lifted)
    }

    /// Round shaft from Z=0 with the hex drive overlapping its top.
    #[instrument(skip_all)]
    fn shaft(&mut self, spec: &TapHandleSpec) -> Result<KernelSolidHandle, BuildError> {
        let radius = spec.shaft_od / 2.0;
        let round_length = spec.shaft_length - spec.shaft_hex_length;
        let body = self
            .kb
            .make_cylinder(radius, round_length, Anchor::Bottom)?;
        let hex = self
            .kb
            .make_prism(6, radius, spec.shaft_hex_length, Anchor::Bottom)?;
        let hex = self
            .kb
            .translate(&hex, [0.0, 0.0, round_length - BOOLEAN_CLEARANCE_SEAM])?;

        let shaft = self.boolean(&body, &hex, BooleanKind::Union)?.handle;
        self.record(BuildStage::Shaft, &shaft);
        Ok(shaft)
    }

    /// Square socket and relief bore down from the shaft top, then the bolt
    /// hole up through the handle.
    #[instrument(skip_all)]
    fn cutouts(
        &mut self,
        spec: &TapHandleSpec,
        solid: KernelSolidHandle,
    ) -> Result<KernelSolidHandle, BuildError> {
        let top = [0.0, 0.0, spec.shaft_length];
        let side = spec.tap_square_side_length();

        let socket = self
            .kb
            .make_box([side, side, spec.tap_square_length], Anchor::Top)?;
        let socket = self.kb.translate(&socket, top)?;
        let solid = self.boolean(&solid, &socket, BooleanKind::Subtract)?.handle;
        self.record(BuildStage::Socket, &solid);

        let bore = self.kb.make_cylinder(
            spec.tap_diameter / 2.0,
            spec.tap_round_length,
            Anchor::Top,
        )?;
        let bore = self.kb.translate(&bore, top)?;
        let solid = self.boolean(&solid, &bore, BooleanKind::Subtract)?.handle;
        self.record(BuildStage::ReliefBore, &solid);

        let bolt = self.kb.make_cylinder(
            BOLT_HOLE_DIAMETER / 2.0,
            BOLT_HOLE_LENGTH,
            Anchor::Bottom,
        )?;
        let bolt = self.kb.translate(
            &bolt,
            [0.0, 0.0, -spec.handle_t_height - BOOLEAN_CLEARANCE_HANDLE],
        )?;
        let solid = self.boolean(&solid, &bolt, BooleanKind::Subtract)?.handle;
        self.record(BuildStage::BoltHole, &solid);
        Ok(solid)
    }
}
