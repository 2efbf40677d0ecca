pub mod fillet;

/// Structured error type for modelling operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperationError {
    /// A primitive dimension is zero, negative or not finite.
    #[error("invalid primitive: {parameter} must be positive, got {value}")]
    InvalidPrimitive { parameter: &'static str, value: f64 },
    /// The specified edge was not found on the solid.
    #[error("specified edge not found on solid")]
    EdgeNotFound,
    /// The rolling-ball sweep could not be built for an edge.
    #[error("fillet failed: {reason}")]
    FilletFailed { reason: String },
}
