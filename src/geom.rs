pub mod bboxes;
pub mod point;
pub mod ray;
pub mod triangles;
pub mod vector;

/// Geometric precision
pub(crate) const EPS: f64 = 1e-13;

/// Smallest accepted ray parameter of an intersection.
///
/// Keeps secondary rays from re-hitting the facet they were spawned on.
pub const RAY_T_MIN: f64 = 1e-6;

/// Padding added on every side of facet and domain bounding boxes.
pub const BBOX_PAD: f64 = 1e-6;
