//! Polygon soup representation of solids.
//!
//! A [`FacetedSolid`] is a closed set of planar convex polygons with outward
//! winding. Every polygon carries the [`Surface`] it was generated from so that
//! facets of one analytic surface (a cylinder wall, a blend) can be regrouped
//! into a single face after booleans fragment them.

mod polygon;
mod solid;

pub use polygon::{Polygon, Surface, SurfaceKind};
pub use solid::{FacetedSolid, SurfaceAllocator};
