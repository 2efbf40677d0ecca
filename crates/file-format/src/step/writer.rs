use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use kernel_api::FacetedShell;
use tracing::debug;

use crate::errors::ExportError;

const PREPROCESSOR: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

/// Serialize `shell` as an AP214 faceted B-rep.
///
/// Every polygon becomes one `FACE` bounded by a single `POLY_LOOP`. The
/// shell's points are shared between faces, one `CARTESIAN_POINT` each.
pub fn write_step(
    shell: &FacetedShell,
    name: &str,
    timestamp: DateTime<Utc>,
) -> Result<String, ExportError> {
    validate_shell(shell)?;

    let name = escape(name);
    let mut data = DataSection::new();

    let app_context = data.add(
        "APPLICATION_CONTEXT('core data for automotive mechanical design processes')".into(),
    );
    data.add(format!(
        "APPLICATION_PROTOCOL_DEFINITION('international standard','automotive_design',2000,#{app_context})"
    ));
    let product_context = data.add(format!("PRODUCT_CONTEXT('',#{app_context},'mechanical')"));
    let product = data.add(format!("PRODUCT('{name}','{name}','',(#{product_context}))"));
    let formation = data.add(format!("PRODUCT_DEFINITION_FORMATION('','',#{product})"));
    let def_context = data.add(format!(
        "PRODUCT_DEFINITION_CONTEXT('part definition',#{app_context},'design')"
    ));
    let definition = data.add(format!(
        "PRODUCT_DEFINITION('design','',#{formation},#{def_context})"
    ));
    let definition_shape = data.add(format!("PRODUCT_DEFINITION_SHAPE('','',#{definition})"));

    let length = data.add("(LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI.,.METRE.))".into());
    let angle = data.add("(NAMED_UNIT(*) PLANE_ANGLE_UNIT() SI_UNIT($,.RADIAN.))".into());
    let solid_angle = data.add("(NAMED_UNIT(*) SI_UNIT($,.STERADIAN.) SOLID_ANGLE_UNIT())".into());
    let uncertainty = data.add(format!(
        "UNCERTAINTY_MEASURE_WITH_UNIT(LENGTH_MEASURE(1.E-06),#{length},'distance_accuracy_value','confusion accuracy')"
    ));
    let geometric_context = data.add(format!(
        "(GEOMETRIC_REPRESENTATION_CONTEXT(3) GLOBAL_UNCERTAINTY_ASSIGNED_CONTEXT((#{uncertainty})) \
         GLOBAL_UNIT_ASSIGNED_CONTEXT((#{length},#{angle},#{solid_angle})) REPRESENTATION_CONTEXT('',''))"
    ));

    let origin = data.add("CARTESIAN_POINT('',(0.,0.,0.))".into());
    let z_axis = data.add("DIRECTION('',(0.,0.,1.))".into());
    let x_axis = data.add("DIRECTION('',(1.,0.,0.))".into());
    let placement = data.add(format!(
        "AXIS2_PLACEMENT_3D('',#{origin},#{z_axis},#{x_axis})"
    ));

    let first_point = data.next_id;
    for p in &shell.points {
        data.add(format!(
            "CARTESIAN_POINT('',({},{},{}))",
            real(p[0]),
            real(p[1]),
            real(p[2])
        ));
    }

    let mut faces = Vec::with_capacity(shell.polygons.len());
    for polygon in &shell.polygons {
        let refs = join(polygon.iter().map(|&i| first_point + u64::from(i)));
        let poly_loop = data.add(format!("POLY_LOOP('',({refs}))"));
        let bound = data.add(format!("FACE_OUTER_BOUND('',#{poly_loop},.T.)"));
        faces.push(data.add(format!("FACE('',(#{bound}))")));
    }

    let closed_shell = data.add(format!("CLOSED_SHELL('',({}))", join(faces.iter().copied())));
    let brep = data.add(format!("FACETED_BREP('{name}',#{closed_shell})"));
    let representation = data.add(format!(
        "FACETED_BREP_SHAPE_REPRESENTATION('{name}',(#{placement},#{brep}),#{geometric_context})"
    ));
    data.add(format!(
        "SHAPE_DEFINITION_REPRESENTATION(#{definition_shape},#{representation})"
    ));

    let stamp = timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut out = String::with_capacity(data.text.len() + 512);
    out.push_str("ISO-10303-21;\nHEADER;\n");
    out.push_str("FILE_DESCRIPTION(('faceted boundary representation'),'2;1');\n");
    let _ = writeln!(
        out,
        "FILE_NAME('{name}.step','{stamp}',(''),(''),'{PREPROCESSOR}','{PREPROCESSOR}','');"
    );
    out.push_str("FILE_SCHEMA(('AUTOMOTIVE_DESIGN { 1 0 10303 214 1 1 1 1 }'));\nENDSEC;\nDATA;\n");
    out.push_str(&data.text);
    out.push_str("ENDSEC;\nEND-ISO-10303-21;\n");
    Ok(out)
}

/// [`write_step`] into a file at `path`. Returns the number of faces written.
pub fn write_step_file(
    path: &Path,
    shell: &FacetedShell,
    name: &str,
    timestamp: DateTime<Utc>,
) -> Result<usize, ExportError> {
    let text = write_step(shell, name, timestamp)?;
    fs::write(path, text).map_err(|e| ExportError::io(path, e))?;
    debug!(path = %path.display(), faces = shell.polygons.len(), "wrote STEP");
    Ok(shell.polygons.len())
}

struct DataSection {
    text: String,
    next_id: u64,
}

impl DataSection {
    fn new() -> Self {
        Self {
            text: String::new(),
            next_id: 1,
        }
    }

    fn add(&mut self, body: String) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let _ = writeln!(self.text, "#{id}={body};");
        id
    }
}

fn validate_shell(shell: &FacetedShell) -> Result<(), ExportError> {
    if shell.polygons.is_empty() {
        return Err(ExportError::EmptyMesh);
    }
    let count = shell.points.len();
    for (i, polygon) in shell.polygons.iter().enumerate() {
        if polygon.len() < 3 {
            return Err(ExportError::InvalidShell(format!(
                "polygon {i} has {} points",
                polygon.len()
            )));
        }
        if let Some(&p) = polygon.iter().find(|&&p| p as usize >= count) {
            return Err(ExportError::InvalidShell(format!(
                "polygon {i} references point {p} of {count}"
            )));
        }
    }
    if let Some(p) = shell.points.iter().flatten().find(|v| !v.is_finite()) {
        return Err(ExportError::InvalidShell(format!("non-finite coordinate {p}")));
    }
    Ok(())
}

fn join(ids: impl Iterator<Item = u64>) -> String {
    let mut out = String::new();
    for (i, id) in ids.enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "#{id}");
    }
    out
}

/// Part 21 real: shortest round-trip digits, always with a decimal point.
fn real(v: f64) -> String {
    // Normalise -0.0.
    let repr = format!("{:?}", v + 0.0);
    let (mantissa, exponent) = match repr.split_once('e') {
        Some((m, e)) => (m, Some(e)),
        None => (repr.as_str(), None),
    };
    let mut out = mantissa.to_string();
    if !out.contains('.') {
        out.push('.');
    }
    if let Some(e) = exponent {
        out.push('E');
        out.push_str(e);
    }
    out
}

fn escape(s: &str) -> String {
    s.replace('\'', "''")
}
