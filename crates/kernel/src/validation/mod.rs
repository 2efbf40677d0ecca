//! Mass-property checks on boolean results.

pub mod volume;

pub use volume::{VolumeVerification, verify_boolean_volume_identity};
