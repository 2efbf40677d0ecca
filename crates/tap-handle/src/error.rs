use kernel_api::KernelError;
use modeling_ops::OpError;

use crate::spec::SpecError;

/// Errors while building the handle model.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BuildError {
    #[error("invalid spec: {0}")]
    InvalidSpec(#[from] SpecError),

    #[error("geometry operation failed: {0}")]
    Geometry(#[from] OpError),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("no shaft/handle junction edge found among {candidates} candidates")]
    NoJunctionEdges { candidates: usize },

    #[error("junction fillet over {edges} edges left an open boundary")]
    OpenJunction { edges: usize },
}
