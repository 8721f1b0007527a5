//! Ray tracing engine: uniform grid traversal and leaf scattering.

pub mod cell;
pub mod grid;
pub mod reflection;
pub mod tracer;

pub use cell::{Cell, CellHit};
pub use grid::{Grid, GridStats, Traversal};
pub use reflection::{
    LeafScattering, Microfacet, ReflectionModel, Scattering, sample_hemisphere,
};
