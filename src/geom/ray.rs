//! Rays carrying photon flux.

use crate::{Point, Vector};

/// A ray defined by an origin point, a unit direction and the photon flux it carries.
///
/// The flux is the energy represented by one ray times the ground area the
/// ray stands for.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray
    pub origin: Point,
    /// Unit direction vector
    pub direction: Vector,
    /// Photon flux carried by the ray
    pub flux: f64,
}

impl Ray {
    /// Creates a new ray from origin point and direction vector.
    ///
    /// The direction vector is automatically normalized.
    /// Returns None for a zero-length direction.
    pub fn new(origin: Point, direction: Vector, flux: f64) -> Option<Self> {
        let normalized = direction.normalize()?;
        Some(Self {
            origin,
            direction: normalized,
            flux,
        })
    }

    /// Returns the point along the ray at parameter t.
    ///
    /// point = origin + t * direction
    pub fn point_at(&self, t: f64) -> Point {
        self.origin + self.direction * t
    }
}
