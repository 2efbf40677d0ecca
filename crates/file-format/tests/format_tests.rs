use std::io::Cursor;

use approx::assert_relative_eq;
use chrono::{TimeZone, Utc};
use file_format::step::{faceted_shells, read_step_file, StepValue};
use file_format::stl::read_stl_file;
use file_format::{
    faceted_volume, mesh_volume, parse_step, read_stl, write_binary_stl, write_step,
    write_step_file, write_stl_file, ExportError,
};
use kernel_api::{
    Anchor, FacetKernel, Kernel, KernelConfig, KernelIntrospect, KernelSolidHandle, MockKernel,
};

// ── Helpers ────────────────────────────────────────────────────────────────

fn kernel() -> FacetKernel {
    FacetKernel::with_config(KernelConfig::coarse())
}

/// Plate with a round post, so the boundary has both planar and faceted
/// cylindrical faces.
fn plate_with_post(kernel: &mut FacetKernel) -> KernelSolidHandle {
    let plate = kernel.make_box([30.0, 20.0, 5.0], Anchor::Top).unwrap();
    let post = kernel.make_cylinder(4.0, 12.0, Anchor::Bottom).unwrap();
    let post = kernel.translate(&post, [0.0, 0.0, -1.0]).unwrap();
    kernel.boolean_union(&plate, &post).unwrap()
}

fn stl_volume(kernel: &mut FacetKernel, solid: &KernelSolidHandle) -> f64 {
    let mesh = kernel.tessellate(solid, 0.01).unwrap();
    let mut buf = Vec::new();
    write_binary_stl(&mut buf, &mesh).unwrap();
    mesh_volume(&read_stl(&mut Cursor::new(buf)).unwrap())
}

fn step_volume(kernel: &FacetKernel, solid: &KernelSolidHandle) -> f64 {
    let shell = kernel.boundary(solid).unwrap();
    let stamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let text = write_step(&shell, "part", stamp).unwrap();
    faceted_volume(&parse_step(&text).unwrap()).unwrap()
}

// ── STL ────────────────────────────────────────────────────────────────────

#[test]
fn stl_box_volume() {
    let mut kernel = kernel();
    let solid = kernel.make_box([10.0, 20.0, 30.0], Anchor::Center).unwrap();
    assert_relative_eq!(stl_volume(&mut kernel, &solid), 6000.0, max_relative = 1e-6);
}

#[test]
fn stl_matches_kernel_volume_after_boolean() {
    let mut kernel = kernel();
    let solid = plate_with_post(&mut kernel);
    let expected = kernel.volume(&solid).unwrap();
    assert_relative_eq!(stl_volume(&mut kernel, &solid), expected, max_relative = 1e-5);
}

#[test]
fn stl_of_mock_bounds() {
    let mut kernel = MockKernel::new();
    let solid = kernel.make_box([2.0, 3.0, 4.0], Anchor::Bottom).unwrap();
    let mesh = kernel.tessellate(&solid, 0.1).unwrap();
    let mut buf = Vec::new();
    assert_eq!(write_binary_stl(&mut buf, &mesh).unwrap(), 12);
    let read = read_stl(&mut Cursor::new(buf)).unwrap();
    assert_relative_eq!(mesh_volume(&read), 24.0, max_relative = 1e-6);
}

// ── STEP ───────────────────────────────────────────────────────────────────

#[test]
fn step_box_volume() {
    let mut kernel = kernel();
    let solid = kernel.make_box([10.0, 20.0, 30.0], Anchor::Bottom).unwrap();
    assert_relative_eq!(step_volume(&kernel, &solid), 6000.0, max_relative = 1e-9);
}

#[test]
fn step_shell_survives_round_trip() {
    let mut kernel = kernel();
    let solid = plate_with_post(&mut kernel);
    let shell = kernel.boundary(&solid).unwrap();
    let stamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let file = parse_step(&write_step(&shell, "plate", stamp).unwrap()).unwrap();
    let shells = faceted_shells(&file).unwrap();

    assert_eq!(shells.len(), 1);
    assert_eq!(shells[0].polygons.len(), shell.polygons.len());
    assert_eq!(shells[0].points.len(), shell.points.len());
    assert_relative_eq!(shells[0].volume(), shell.volume(), max_relative = 1e-12);
}

#[test]
fn step_header_names_product() {
    let mut kernel = kernel();
    let solid = kernel.make_cylinder(3.0, 8.0, Anchor::Center).unwrap();
    let shell = kernel.boundary(&solid).unwrap();
    let stamp = Utc.with_ymd_and_hms(2025, 6, 30, 8, 0, 0).unwrap();
    let file = parse_step(&write_step(&shell, "pin", stamp).unwrap()).unwrap();

    let file_name = file.header_entity("FILE_NAME").unwrap();
    assert_eq!(file_name.args[0].as_str(), Some("pin.step"));
    assert_eq!(file_name.args[1].as_str(), Some("2025-06-30T08:00:00Z"));

    let product = file.entities_of_type("PRODUCT").next().unwrap();
    assert_eq!(product.args[0], StepValue::String("pin".to_string()));
    let unit = file
        .entities
        .values()
        .find(|e| e.part("LENGTH_UNIT").is_some())
        .unwrap();
    assert_eq!(unit.part("SI_UNIT").unwrap()[0].as_enum(), Some("MILLI"));
}

#[test]
fn stl_and_step_agree() {
    let mut kernel = kernel();
    let solid = plate_with_post(&mut kernel);
    let stl = stl_volume(&mut kernel, &solid);
    let step = step_volume(&kernel, &solid);
    assert_relative_eq!(stl, step, max_relative = 1e-3);
}

// ── Files ──────────────────────────────────────────────────────────────────

#[test]
fn file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut kernel = kernel();
    let solid = plate_with_post(&mut kernel);
    let mesh = kernel.tessellate(&solid, 0.01).unwrap();
    let shell = kernel.boundary(&solid).unwrap();

    let stl_path = dir.path().join("plate.stl");
    let step_path = dir.path().join("plate.step");
    let triangles = write_stl_file(&stl_path, &mesh).unwrap();
    let faces = write_step_file(&step_path, &shell, "plate", Utc::now()).unwrap();

    assert_eq!(triangles, mesh.triangle_count());
    assert_eq!(faces, shell.polygons.len());
    assert_eq!(
        std::fs::metadata(&stl_path).unwrap().len(),
        84 + 50 * triangles as u64
    );

    let stl = mesh_volume(&read_stl_file(&stl_path).unwrap());
    let step = faceted_volume(&read_step_file(&step_path).unwrap()).unwrap();
    assert_relative_eq!(stl, step, max_relative = 1e-3);
}

#[test]
fn missing_directory_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("part.stl");
    let mut kernel = kernel();
    let solid = kernel.make_box([1.0, 1.0, 1.0], Anchor::Center).unwrap();
    let mesh = kernel.tessellate(&solid, 0.01).unwrap();

    match write_stl_file(&path, &mesh) {
        Err(ExportError::Io { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected I/O error, got {other:?}"),
    }
}
