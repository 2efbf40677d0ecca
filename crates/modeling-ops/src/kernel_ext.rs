//! Object-safe pairing of the mutating and read-only kernel traits.

use kernel_api::{Kernel, KernelIntrospect};

/// A kernel session usable both for construction and for queries.
///
/// Operations take `&mut dyn KernelBundle` and borrow the query side through
/// [`KernelBundle::as_introspect`] between mutating calls.
pub trait KernelBundle: Kernel + KernelIntrospect {
    fn as_introspect(&self) -> &dyn KernelIntrospect;
}

impl<K: Kernel + KernelIntrospect> KernelBundle for K {
    fn as_introspect(&self) -> &dyn KernelIntrospect {
        self
    }
}
