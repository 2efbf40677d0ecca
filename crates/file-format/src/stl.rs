//! Binary STL export and import.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use kernel_api::RenderMesh;
use stl_io::{Normal, Triangle, Vertex};
use tracing::debug;

use crate::errors::ExportError;

pub use stl_io::IndexedMesh;

/// Write `mesh` as binary STL. Returns the number of triangles written.
///
/// Facet normals are recomputed from the corner winding. Degenerate
/// triangles get a zero normal.
pub fn write_binary_stl<W: Write>(writer: &mut W, mesh: &RenderMesh) -> Result<usize, ExportError> {
    let triangles = stl_triangles(mesh)?;
    stl_io::write_stl(writer, triangles.iter()).map_err(|e| ExportError::Stl(e.to_string()))?;
    Ok(triangles.len())
}

/// [`write_binary_stl`] into a file at `path`, replacing any existing file.
pub fn write_stl_file(path: &Path, mesh: &RenderMesh) -> Result<usize, ExportError> {
    let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let count = write_binary_stl(&mut writer, mesh)?;
    writer.flush().map_err(|e| ExportError::io(path, e))?;
    debug!(path = %path.display(), triangles = count, "wrote STL");
    Ok(count)
}

/// Read an ASCII or binary STL into an indexed mesh.
pub fn read_stl<R: Read + Seek>(reader: &mut R) -> Result<IndexedMesh, ExportError> {
    stl_io::read_stl(reader).map_err(|e| ExportError::Stl(e.to_string()))
}

pub fn read_stl_file(path: &Path) -> Result<IndexedMesh, ExportError> {
    let file = File::open(path).map_err(|e| ExportError::io(path, e))?;
    read_stl(&mut BufReader::new(file))
}

/// Enclosed volume of a closed, outward-wound mesh by signed tetrahedra.
pub fn mesh_volume(mesh: &IndexedMesh) -> f64 {
    let corner = |i: usize| {
        let v = &mesh.vertices[i];
        [v[0] as f64, v[1] as f64, v[2] as f64]
    };
    let six_v: f64 = mesh
        .faces
        .iter()
        .map(|face| {
            let [a, b, c] = face.vertices.map(corner);
            a[0] * (b[1] * c[2] - b[2] * c[1])
                + a[1] * (b[2] * c[0] - b[0] * c[2])
                + a[2] * (b[0] * c[1] - b[1] * c[0])
        })
        .sum();
    six_v / 6.0
}

fn stl_triangles(mesh: &RenderMesh) -> Result<Vec<Triangle>, ExportError> {
    if mesh.is_empty() {
        return Err(ExportError::EmptyMesh);
    }
    if mesh.indices.len() % 3 != 0 {
        return Err(ExportError::Stl(format!(
            "index count {} is not a multiple of 3",
            mesh.indices.len()
        )));
    }
    let vertex_count = mesh.vertices.len() / 3;
    if let Some(&idx) = mesh.indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(ExportError::Stl(format!(
            "index {idx} out of range (vertex count = {vertex_count})"
        )));
    }

    Ok((0..mesh.triangle_count())
        .map(|t| {
            let corners = mesh.triangle(t);
            Triangle {
                normal: Normal::new(facet_normal(&corners)),
                vertices: corners.map(Vertex::new),
            }
        })
        .collect())
}

fn facet_normal([a, b, c]: &[[f32; 3]; 3]) -> [f32; 3] {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > 1e-12 {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        [0.0; 3]
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use approx::assert_relative_eq;

    use super::*;

    fn unit_cube() -> RenderMesh {
        let vertices = vec![
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0,
        ];
        let indices = vec![
            0, 2, 1, 0, 3, 2, // bottom
            4, 5, 6, 4, 6, 7, // top
            0, 1, 5, 0, 5, 4, // front
            3, 7, 6, 3, 6, 2, // back
            0, 4, 7, 0, 7, 3, // left
            1, 2, 6, 1, 6, 5, // right
        ];
        RenderMesh {
            normals: vec![0.0; vertices.len()],
            vertices,
            indices,
            face_ranges: Vec::new(),
        }
    }

    #[test]
    fn binary_layout() {
        let mut buf = Vec::new();
        let count = write_binary_stl(&mut buf, &unit_cube()).unwrap();
        assert_eq!(count, 12);
        assert_eq!(buf.len(), 80 + 4 + 12 * 50);
        assert_eq!(u32::from_le_bytes([buf[80], buf[81], buf[82], buf[83]]), 12);
    }

    #[test]
    fn normals_follow_winding() {
        let mesh = unit_cube();
        let tris = stl_triangles(&mesh).unwrap();
        assert_eq!(tris[0].normal[2], -1.0);
        assert_eq!(tris[2].normal[2], 1.0);
        assert_eq!(tris[4].normal[1], -1.0);
    }

    #[test]
    fn read_back_volume() {
        let mut buf = Vec::new();
        write_binary_stl(&mut buf, &unit_cube()).unwrap();
        let mesh = read_stl(&mut Cursor::new(buf)).unwrap();
        assert_eq!(mesh.faces.len(), 12);
        assert_relative_eq!(mesh_volume(&mesh), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn rejects_bad_meshes() {
        let mut buf = Vec::new();
        assert!(matches!(
            write_binary_stl(&mut buf, &RenderMesh::default()),
            Err(ExportError::EmptyMesh)
        ));

        let mut mesh = unit_cube();
        mesh.indices[5] = 8;
        assert!(matches!(
            write_binary_stl(&mut buf, &mesh),
            Err(ExportError::Stl(msg)) if msg.contains("out of range")
        ));
        assert!(buf.is_empty());
    }
}
