//! STEP (ISO 10303-21) faceted B-rep export and import.

pub mod reader;
pub mod writer;

pub use reader::{
    faceted_shells, faceted_volume, parse_step, read_step_file, StepEntity, StepFile, StepValue,
};
pub use writer::{write_step, write_step_file};
