pub mod builder;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod logging;
pub mod selection;
pub mod spec;

pub use builder::{build_tap_handle, make_tap_handle, BuildStage, TapHandleBuild};
pub use config::BuildConfig;
pub use error::BuildError;
pub use export::{default_output_dir, export_part, export_parts, ExportedPart};
pub use logging::{init_logging, LogConfig, LogFormat};
pub use selection::{select_junction_edges, JunctionEdgeFilter, JunctionSelection};
pub use spec::{SpecError, TapHandleSpec};
