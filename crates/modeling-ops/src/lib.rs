pub mod boolean;
pub mod diff;
pub mod fillet;
pub mod kernel_ext;
pub mod types;

pub use boolean::{execute_boolean, execute_boolean_with_tolerance, BooleanKind};
pub use diff::{diff, signature_similarity, signatures_match, snapshot, DiffResult, DiffTolerance, TopoSnapshot};
pub use fillet::{execute_fillet, execute_fillet_with_tolerance};
pub use kernel_ext::KernelBundle;
pub use types::*;
