pub mod facet_kernel;
pub mod mock_kernel;
pub mod traits;
pub mod types;

pub use facet_kernel::FacetKernel;
pub use mock_kernel::{MockCall, MockKernel};
pub use traits::*;
pub use types::*;
