use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use file_format::{write_step_file, write_stl_file, ExportError};
use kernel_api::{KernelSolidHandle, ShapeKind};
use modeling_ops::KernelBundle;
use tracing::{info, instrument, warn};

use crate::constants::TESSELLATION_TOLERANCE;

/// Files written for one part.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedPart {
    pub key: String,
    pub stl_path: PathBuf,
    pub step_path: PathBuf,
    /// Triangles in the STL.
    pub triangles: usize,
    /// Faces in the STEP faceted B-rep.
    pub faces: usize,
}

/// `build/` next to this crate's `src/`.
pub fn default_output_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("build")
}

/// Write `solid` to `<out_dir>/<key>.stl` and `<out_dir>/<key>.step`.
///
/// The solid must be a solid or compound. An open boundary is exported with
/// a warning.
#[instrument(skip(kernel, solid, out_dir), fields(out_dir = %out_dir.display()))]
pub fn export_part<K: KernelBundle + ?Sized>(
    kernel: &mut K,
    key: &str,
    solid: &KernelSolidHandle,
    out_dir: &Path,
) -> Result<ExportedPart, ExportError> {
    let kind = kernel.shape_kind(solid)?;
    if !matches!(kind, ShapeKind::Solid | ShapeKind::Compound) {
        return Err(ExportError::UnexpectedShape {
            key: key.to_string(),
            kind,
        });
    }
    if !kernel.is_closed(solid)? {
        warn!(key, %solid, "boundary is not closed, exporting anyway");
    }

    fs::create_dir_all(out_dir).map_err(|source| ExportError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let mesh = kernel.tessellate(solid, TESSELLATION_TOLERANCE)?;
    let stl_path = out_dir.join(format!("{key}.stl"));
    let triangles = write_stl_file(&stl_path, &mesh)?;

    let shell = kernel.boundary(solid)?;
    let step_path = out_dir.join(format!("{key}.step"));
    let faces = write_step_file(&step_path, &shell, key, Utc::now())?;

    info!(
        key,
        stl = %stl_path.display(),
        step = %step_path.display(),
        triangles,
        faces,
        "exported part"
    );
    Ok(ExportedPart {
        key: key.to_string(),
        stl_path,
        step_path,
        triangles,
        faces,
    })
}

/// [`export_part`] for each `(key, solid)` in order. Stops at the first
/// failure; files already written are left in place.
pub fn export_parts<K: KernelBundle + ?Sized>(
    kernel: &mut K,
    parts: &[(&str, KernelSolidHandle)],
    out_dir: &Path,
) -> Result<Vec<ExportedPart>, ExportError> {
    parts
        .iter()
        .map(|(key, solid)| export_part(kernel, key, solid, out_dir))
        .collect()
}
