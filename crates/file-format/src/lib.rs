pub mod errors;
pub mod step;
pub mod stl;

pub use errors::ExportError;
pub use step::{faceted_volume, parse_step, write_step, write_step_file, StepFile};
pub use stl::{mesh_volume, read_stl, write_binary_stl, write_stl_file, IndexedMesh};
