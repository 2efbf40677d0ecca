use approx::assert_relative_eq;
use kernel_api::{Convexity, KernelIntrospect, MockCall, MockKernel, ShapeKind};
use modeling_ops::OpError;
use tap_handle::{
    build_tap_handle, make_tap_handle, BuildConfig, BuildError, BuildStage, JunctionEdgeFilter,
    JunctionSelection, SpecError, TapHandleSpec,
};

fn mock_build(config: &BuildConfig) -> (MockKernel, tap_handle::TapHandleBuild) {
    let mut kernel = MockKernel::new();
    let build = build_tap_handle(&mut kernel, &TapHandleSpec::default(), config).unwrap();
    (kernel, build)
}

// ── Build sequence ─────────────────────────────────────────────────────────

#[test]
fn default_spec_builds_a_solid() {
    let mut kernel = MockKernel::new();
    let solid = make_tap_handle(&mut kernel, &TapHandleSpec::new()).unwrap();
    assert_eq!(kernel.shape_kind(&solid).unwrap(), ShapeKind::Solid);
    assert!(kernel.is_closed(&solid).unwrap());
}

#[test]
fn operations_run_in_build_order() {
    let (kernel, _) = mock_build(&BuildConfig::default());
    let ops: Vec<&str> = kernel.operations().iter().map(MockCall::operation).collect();
    assert_eq!(
        ops,
        [
            // handle
            "make_cylinder",
            "make_box",
            "make_box",
            "boolean_union",
            "boolean_union",
            "fillet_edges",
            "translate",
            // shaft
            "make_cylinder",
            "make_prism",
            "translate",
            "boolean_union",
            // combine and junction
            "boolean_union",
            "fillet_edges",
            // socket, relief bore, bolt hole
            "make_box",
            "translate",
            "boolean_subtract",
            "make_cylinder",
            "translate",
            "boolean_subtract",
            "make_cylinder",
            "translate",
            "boolean_subtract",
        ]
    );
}

#[test]
fn primitives_follow_the_spec() {
    let spec = TapHandleSpec::default();
    let (kernel, _) = mock_build(&BuildConfig::default());
    let calls = kernel.operations();

    match &calls[0] {
        MockCall::MakeCylinder { radius, height, .. } => {
            assert_eq!(*radius, spec.handle_base_diameter / 2.0);
            assert_eq!(*height, spec.handle_t_height);
        }
        other => panic!("expected handle base, got {other:?}"),
    }
    match &calls[1] {
        MockCall::MakeBox { size, .. } => assert_eq!(*size, [120.0, 15.0, 10.0]),
        other => panic!("expected main bar, got {other:?}"),
    }
    match &calls[2] {
        MockCall::MakeBox { size, .. } => assert_eq!(*size, [15.0, 60.0, 10.0]),
        other => panic!("expected cross bar, got {other:?}"),
    }
    match &calls[8] {
        MockCall::MakePrism {
            sides,
            circumradius,
            height,
            ..
        } => {
            assert_eq!(*sides, 6);
            assert_eq!(*circumradius, spec.shaft_od / 2.0);
            assert_eq!(*height, spec.shaft_hex_length);
        }
        other => panic!("expected hex drive, got {other:?}"),
    }
    match &calls[9] {
        MockCall::Translate { offset, .. } => assert_relative_eq!(offset[2], 129.99),
        other => panic!("expected hex lift, got {other:?}"),
    }
    match &calls[13] {
        MockCall::MakeBox { size, .. } => {
            let side = spec.tap_square_side_length();
            assert_eq!(*size, [side, side, spec.tap_square_length]);
        }
        other => panic!("expected socket, got {other:?}"),
    }
    match &calls[20] {
        MockCall::Translate { offset, .. } => assert_relative_eq!(offset[2], -10.1),
        other => panic!("expected bolt hole placement, got {other:?}"),
    }
}

#[test]
fn fillet_radii() {
    let (kernel, build) = mock_build(&BuildConfig::default());
    let fillets: Vec<(usize, f64)> = kernel
        .operations()
        .iter()
        .filter_map(|c| match c {
            MockCall::Fillet { edges, radius, .. } => Some((*edges, *radius)),
            _ => None,
        })
        .collect();
    assert_eq!(fillets.len(), 2);
    assert!(fillets[0].0 > 0, "handle fillet should round every edge");
    assert_eq!(fillets[0].1, 4.5);
    assert_eq!(fillets[1], (build.junction_edges.len(), 3.5));
}

#[test]
fn stages_are_recorded_in_order() {
    let (_, build) = mock_build(&BuildConfig::default());
    let stages: Vec<BuildStage> = build.stages.iter().map(|(s, _)| *s).collect();
    assert_eq!(
        stages,
        [
            BuildStage::Handle,
            BuildStage::Shaft,
            BuildStage::Combined,
            BuildStage::JunctionFillet,
            BuildStage::Socket,
            BuildStage::ReliefBore,
            BuildStage::BoltHole,
        ]
    );
    assert_eq!(build.stage(BuildStage::BoltHole), Some(&build.solid));
    assert!(build.warnings.is_empty(), "{:?}", build.warnings);
}

#[test]
fn cutouts_remove_material() {
    let (kernel, build) = mock_build(&BuildConfig::default());
    let volume = |stage| {
        kernel
            .volume(build.stage(stage).unwrap())
            .unwrap()
    };
    let junction = volume(BuildStage::JunctionFillet);
    let socket = volume(BuildStage::Socket);
    let bore = volume(BuildStage::ReliefBore);
    let bolt = volume(BuildStage::BoltHole);
    assert!(junction > socket, "{junction} > {socket}");
    assert!(socket > bore, "{socket} > {bore}");
    assert!(bore > bolt, "{bore} > {bolt}");
}

#[test]
fn handle_sits_below_the_shaft() {
    let (kernel, build) = mock_build(&BuildConfig::default());
    let handle = kernel
        .bounding_box(build.stage(BuildStage::Handle).unwrap())
        .unwrap();
    assert!((handle[5] - 0.1).abs() < 1e-12, "handle top {}", handle[5]);
    assert!((handle[2] + 9.9).abs() < 1e-12, "handle bottom {}", handle[2]);

    let b = kernel.bounding_box(&build.solid).unwrap();
    assert!(b[5] - b[2] >= 140.0);
    assert!(b[3] - b[0] <= 120.0 + 1e-6);
    assert!(b[4] - b[1] <= 120.0 + 1e-6);
}

// ── Junction selection ─────────────────────────────────────────────────────

#[test]
fn junction_edges_come_from_the_seam() {
    let spec = TapHandleSpec::default();
    let filter = JunctionEdgeFilter::default();
    let (kernel, build) = mock_build(&BuildConfig::default());

    assert!(!build.junction_edges.is_empty());
    for &edge in &build.junction_edges {
        let center = kernel.edge_center(edge).unwrap();
        assert!(filter.accepts(center, &spec), "edge at {center:?}");
    }
}

#[test]
fn tolerance_band_selects_a_superset() {
    let (_, by_provenance) = mock_build(&BuildConfig::default());
    let (kernel, by_band) = mock_build(&BuildConfig {
        junction_selection: JunctionSelection::ToleranceBand,
        ..BuildConfig::default()
    });

    assert!(by_band.junction_edges.len() >= by_provenance.junction_edges.len());
    let spec = TapHandleSpec::default();
    let filter = JunctionEdgeFilter::default();
    for &edge in &by_band.junction_edges {
        assert!(filter.accepts(kernel.edge_center(edge).unwrap(), &spec));
        assert_eq!(kernel.edge_convexity(edge), Some(Convexity::Concave));
    }
}

#[test]
fn open_junction_fillet_is_an_error() {
    let mut kernel = MockKernel::new();
    kernel.force_open_shells();
    let err = make_tap_handle(&mut kernel, &TapHandleSpec::default()).unwrap_err();
    match err {
        BuildError::OpenJunction { edges } => assert!(edges > 0),
        other => panic!("expected OpenJunction, got {other:?}"),
    }
    assert_eq!(
        kernel.operations().last().map(MockCall::operation),
        Some("fillet_edges")
    );
}

#[test]
fn tight_band_finds_no_junction() {
    let mut kernel = MockKernel::new();
    let config = BuildConfig {
        junction_filter: JunctionEdgeFilter {
            z_tolerance: 0.05,
            ..JunctionEdgeFilter::default()
        },
        ..BuildConfig::default()
    };
    let err = build_tap_handle(&mut kernel, &TapHandleSpec::default(), &config).unwrap_err();
    match err {
        BuildError::NoJunctionEdges { candidates } => assert!(candidates > 0),
        other => panic!("expected NoJunctionEdges, got {other:?}"),
    }
    assert!(!kernel
        .operations()
        .iter()
        .any(|c| matches!(c, MockCall::Fillet { radius, .. } if *radius == 3.5)));
}

// ── Failures ───────────────────────────────────────────────────────────────

#[test]
fn invalid_spec_makes_no_kernel_calls() {
    let mut kernel = MockKernel::new();
    let spec = TapHandleSpec::with_tap_diameter(18.0);
    let err = make_tap_handle(&mut kernel, &spec).unwrap_err();
    assert!(matches!(
        err,
        BuildError::InvalidSpec(SpecError::SocketWiderThanShaft { .. })
    ));
    assert!(kernel.operations().is_empty());
}

#[test]
fn primitive_failure_is_a_kernel_error() {
    let mut kernel = MockKernel::new().failing_on("make_box");
    let err = make_tap_handle(&mut kernel, &TapHandleSpec::default()).unwrap_err();
    assert!(matches!(err, BuildError::Kernel(_)), "{err:?}");
    assert_eq!(kernel.operations().len(), 2);
}

#[test]
fn boolean_failure_is_a_geometry_error() {
    let mut kernel = MockKernel::new().failing_on("boolean_subtract");
    let err = make_tap_handle(&mut kernel, &TapHandleSpec::default()).unwrap_err();
    assert!(matches!(err, BuildError::Geometry(OpError::Kernel(_))), "{err:?}");
    assert_eq!(
        kernel.operations().last().map(MockCall::operation),
        Some("boolean_subtract")
    );
}

#[test]
fn builds_are_repeatable() {
    let (first_kernel, first) = mock_build(&BuildConfig::default());
    let (second_kernel, second) = mock_build(&BuildConfig::default());
    assert_eq!(first_kernel.operations(), second_kernel.operations());
    assert_eq!(
        first_kernel.volume(&first.solid).unwrap(),
        second_kernel.volume(&second.solid).unwrap()
    );
}

// ── Faceted kernel ─────────────────────────────────────────────────────────

fn faceted_build(config: &BuildConfig) -> (kernel_api::FacetKernel, tap_handle::TapHandleBuild) {
    let mut kernel = config.session();
    let build = build_tap_handle(&mut kernel, &TapHandleSpec::default(), config).unwrap();
    (kernel, build)
}

#[test]
fn faceted_build_is_a_closed_solid() {
    let spec = TapHandleSpec::default();
    let (kernel, build) = faceted_build(&BuildConfig::coarse());

    assert_eq!(kernel.shape_kind(&build.solid).unwrap(), ShapeKind::Solid);
    assert!(kernel.is_closed(&build.solid).unwrap());
    let b = kernel.bounding_box(&build.solid).unwrap();
    assert!(b[5] - b[2] >= spec.shaft_length);
    assert!(b[3] - b[0] <= spec.handle_t_length + 1e-6);

    let volume = |stage| kernel.volume(build.stage(stage).unwrap()).unwrap();
    assert!(volume(BuildStage::JunctionFillet) > volume(BuildStage::Socket));
    assert!(volume(BuildStage::Socket) > volume(BuildStage::ReliefBore));
    assert!(volume(BuildStage::ReliefBore) > volume(BuildStage::BoltHole));
}

#[test]
fn faceted_builds_are_repeatable() {
    let (first_kernel, first) = faceted_build(&BuildConfig::coarse());
    let (second_kernel, second) = faceted_build(&BuildConfig::coarse());
    assert_eq!(first.junction_edges.len(), second.junction_edges.len());
    assert_eq!(
        first_kernel.volume(&first.solid).unwrap(),
        second_kernel.volume(&second.solid).unwrap()
    );
}

#[test]
fn faceted_tolerance_band_fillets_only_the_seam() {
    let config = BuildConfig::coarse();
    let (provenance_kernel, by_provenance) = faceted_build(&config);
    let (kernel, by_band) = faceted_build(&BuildConfig {
        junction_selection: JunctionSelection::ToleranceBand,
        ..config
    });

    assert_eq!(by_band.junction_edges.len(), by_provenance.junction_edges.len());
    for &edge in &by_band.junction_edges {
        assert_eq!(kernel.edge_convexity(edge), Some(Convexity::Concave));
    }
    let filleted = by_band.stage(BuildStage::JunctionFillet).unwrap();
    assert!(kernel.is_closed(filleted).unwrap());
    assert_relative_eq!(
        kernel.volume(&by_band.solid).unwrap(),
        provenance_kernel.volume(&by_provenance.solid).unwrap(),
        max_relative = 1e-9
    );
}
