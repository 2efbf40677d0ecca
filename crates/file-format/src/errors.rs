use std::path::PathBuf;

use kernel_api::{KernelError, ShapeKind};

/// Errors while writing or reading exported geometry.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("part '{key}' is a {kind}, expected a solid or compound")]
    UnexpectedShape { key: String, kind: ShapeKind },

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("STL error: {0}")]
    Stl(String),

    #[error("STEP parse error at line {line}: {reason}")]
    StepParse { line: usize, reason: String },

    #[error("mesh has no triangles")]
    EmptyMesh,

    #[error("invalid faceted shell: {0}")]
    InvalidShell(String),
}

impl ExportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn step(line: usize, reason: impl Into<String>) -> Self {
        ExportError::StepParse {
            line,
            reason: reason.into(),
        }
    }
}
