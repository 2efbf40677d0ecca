use kernel_api::{KernelId, KernelSolidHandle, TopoKind, TopoSignature};

/// Complete result of a modeling operation.
#[derive(Debug, Clone)]
pub struct OpResult {
    /// Handle to the result in the kernel. Runtime-only, not persisted.
    pub handle: KernelSolidHandle,
    /// Provenance: what entities were created and deleted.
    pub provenance: Provenance,
    /// Non-fatal warnings and timing information.
    pub diagnostics: Diagnostics,
}

/// Provenance tracking: what happened to topology during an operation.
#[derive(Debug, Clone, Default)]
pub struct Provenance {
    /// Entities that exist in the result but in none of the inputs.
    pub created: Vec<EntityRecord>,
    /// Entities that existed in an input but not in the result.
    pub deleted: Vec<EntityRecord>,
    /// (input, result) pairs matched by signature.
    pub survived: Vec<(KernelId, KernelId)>,
}

impl Provenance {
    /// Result ids of created entities of one kind, in result order.
    pub fn created_ids(&self, kind: TopoKind) -> Vec<KernelId> {
        self.created
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.kernel_id)
            .collect()
    }

    pub fn deleted_count(&self, kind: TopoKind) -> usize {
        self.deleted.iter().filter(|r| r.kind == kind).count()
    }
}

/// Record of a topological entity with its kernel ID and signature.
#[derive(Debug, Clone)]
pub struct EntityRecord {
    /// The kernel-internal ID. Runtime-only.
    pub kernel_id: KernelId,
    /// What kind of entity (Vertex, Edge, Face).
    pub kind: TopoKind,
    /// Geometric signature used for matching.
    pub signature: TopoSignature,
}

/// Non-fatal diagnostics from an operation.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    /// Warning messages.
    pub warnings: Vec<String>,
    /// Time taken for the kernel operation, in milliseconds.
    pub kernel_time_ms: f64,
}

/// Errors from modeling operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OpError {
    #[error("kernel error: {0}")]
    Kernel(#[from] kernel_api::KernelError),

    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },
}
