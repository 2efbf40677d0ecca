use kernel_api::{FacetKernel, KernelConfig};
use modeling_ops::DiffTolerance;
use serde::{Deserialize, Serialize};

use crate::selection::{JunctionEdgeFilter, JunctionSelection};

/// Settings for one model build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub kernel: KernelConfig,
    pub junction_filter: JunctionEdgeFilter,
    pub junction_selection: JunctionSelection,
    /// Signature tolerance for construction provenance.
    pub diff_tolerance: DiffTolerance,
}

impl BuildConfig {
    /// Fewer facets per circle and fillet, for quick previews and tests.
    pub fn coarse() -> Self {
        Self {
            kernel: KernelConfig::coarse(),
            ..Self::default()
        }
    }

    /// A fresh kernel session with this config's resolution.
    pub fn session(&self) -> FacetKernel {
        FacetKernel::with_config(self.kernel)
    }
}
