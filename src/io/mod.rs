//! Canopy input and flux report output.

pub mod canopy;
pub mod report;

pub use canopy::{
    CanopyFormat, Layout, OpticsSource, canopy_from_matrix, read_canopy, read_canopy_or_empty,
};
pub use report::{flux_row, report_header, write_flux_report};
