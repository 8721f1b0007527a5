use log::warn;

use crate::geom::bboxes::BoundingBox;
use crate::geom::ray::Ray;
use crate::geom::triangles::{TriangleHit, intersect_triangle};
use crate::geom::{BBOX_PAD, EPS};
use crate::{Point, Vector};

use super::flux::PhotonFlux;

/// Leaf optical and biological attributes of a facet.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafAttributes {
    pub leaf_id: i64,
    pub leaf_length: f64,
    /// Position index of the leaf on the plant.
    pub position: i64,
    /// Column id in a field layout.
    pub column_id: Option<i64>,
    /// Row id in a field layout.
    pub row_id: Option<i64>,
    pub chlorophyll: f64,
    pub nitrogen_per_area: f64,
    /// Reflectance coefficient in [0, 1].
    pub reflectance: f64,
    /// Transmittance coefficient in [0, 1].
    pub transmittance: f64,
}

impl Default for LeafAttributes {
    fn default() -> Self {
        Self {
            leaf_id: 0,
            leaf_length: 0.0,
            position: 0,
            column_id: None,
            row_id: None,
            chlorophyll: 0.0,
            nitrogen_per_area: 0.0,
            reflectance: 0.0,
            transmittance: 0.0,
        }
    }
}

impl LeafAttributes {
    /// Returns a copy with reflectance and transmittance forced into [0, 1]
    /// and `reflectance + transmittance <= 1`.
    ///
    /// An oversized sum is scaled down proportionally.
    pub fn with_valid_optics(mut self) -> Self {
        let r = self.reflectance.clamp(0.0, 1.0);
        let t = self.transmittance.clamp(0.0, 1.0);
        let (r, t) = if r + t > 1.0 {
            let s = r + t;
            (r / s, t / s)
        } else {
            (r, t)
        };
        if r != self.reflectance || t != self.transmittance {
            warn!(
                "Leaf {}: optics (r={}, t={}) rescaled to (r={r}, t={t})",
                self.leaf_id, self.reflectance, self.transmittance
            );
        }
        self.reflectance = r;
        self.transmittance = t;
        self
    }

    /// Fraction of incoming flux kept by the leaf.
    pub fn absorptance(&self) -> f64 {
        (1.0 - self.reflectance - self.transmittance).max(0.0)
    }
}

/// Triangular leaf element.
#[derive(Debug, Clone)]
pub struct Facet {
    pub vertices: [Point; 3],
    pub attributes: LeafAttributes,
    /// Per-hour photon flux received on both sides.
    pub flux: PhotonFlux,
}

impl Facet {
    pub fn new(vertices: [Point; 3], attributes: LeafAttributes) -> Self {
        Self {
            vertices,
            attributes: attributes.with_valid_optics(),
            flux: PhotonFlux::default(),
        }
    }

    /// Unit normal, right-handed from the edges leaving the first vertex.
    ///
    /// Degenerate facets get a zero vector.
    pub fn normal(&self) -> Vector {
        let [p0, p1, p2] = self.vertices;
        Vector::normal(p0, p1, p2).unwrap_or(Vector::ZERO)
    }

    pub fn area(&self) -> f64 {
        let [p0, p1, p2] = self.vertices;
        0.5 * (p1 - p0).cross(p2 - p0).length()
    }

    /// Returns true if the facet has no area and can never be hit.
    pub fn is_degenerate(&self) -> bool {
        self.area() < EPS
    }

    /// Mean z of the three vertices.
    pub fn mean_height(&self) -> f64 {
        self.vertices.iter().map(|p| p.z).sum::<f64>() / 3.0
    }

    /// Box enclosing the vertices, padded by `BBOX_PAD`.
    pub fn bounding_box(&self) -> BoundingBox {
        let [p0, p1, p2] = self.vertices;
        let min = p0.min(p1).min(p2);
        let max = p0.max(p1).max(p2);
        BoundingBox::new(min, max).padded(BBOX_PAD)
    }

    /// Intersects a ray with the facet. The hit point is part of the result.
    pub fn intersect(&self, ray: &Ray) -> Option<TriangleHit> {
        let [p0, p1, p2] = self.vertices;
        intersect_triangle(ray, p0, p1, p2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_half(z: f64) -> [Point; 3] {
        [
            Point::new(0., 0., z),
            Point::new(1., 0., z),
            Point::new(0., 1., z),
        ]
    }

    #[test]
    fn test_normal_and_area() {
        let facet = Facet::new(square_half(2.0), LeafAttributes::default());
        assert!(facet.normal().is_close(&Vector::new(0., 0., 1.)));
        assert!((facet.area() - 0.5).abs() < 1e-12);
        assert!((facet.mean_height() - 2.0).abs() < 1e-12);
        assert!(!facet.is_degenerate());

        // Reversed winding flips the normal
        let [a, b, c] = square_half(0.0);
        let flipped = Facet::new([a, c, b], LeafAttributes::default());
        assert!(flipped.normal().is_close(&Vector::new(0., 0., -1.)));
    }

    #[test]
    fn test_degenerate() {
        let pts = [
            Point::new(0., 0., 0.),
            Point::new(1., 1., 1.),
            Point::new(2., 2., 2.),
        ];
        let facet = Facet::new(pts, LeafAttributes::default());
        assert!(facet.is_degenerate());
        assert_eq!(facet.normal(), Vector::ZERO);
    }

    #[test]
    fn test_bounding_box_is_padded() {
        let facet = Facet::new(square_half(1.0), LeafAttributes::default());
        let bbox = facet.bounding_box();
        assert!(bbox.min.z < 1.0 && bbox.max.z > 1.0);
        assert!(bbox.contains(Point::new(0.2, 0.2, 1.0)));
    }

    #[test]
    fn test_intersect_returns_hit_point() {
        let facet = Facet::new(square_half(1.0), LeafAttributes::default());
        let ray = Ray::new(Point::new(0.25, 0.25, 4.), Vector::new(0., 0., -1.), 1.).unwrap();
        let hit = facet.intersect(&ray).unwrap();
        assert!((hit.t - 3.0).abs() < 1e-12);
        assert!(hit.point.is_close(&Point::new(0.25, 0.25, 1.0)));
    }

    #[test]
    fn test_optics_are_rescaled() {
        let attrs = LeafAttributes {
            reflectance: 0.9,
            transmittance: 0.6,
            ..Default::default()
        }
        .with_valid_optics();
        assert!((attrs.reflectance + attrs.transmittance - 1.0).abs() < 1e-12);
        assert!((attrs.reflectance / attrs.transmittance - 1.5).abs() < 1e-12);
        assert!(attrs.absorptance() < 1e-12);

        let attrs = LeafAttributes {
            reflectance: -0.2,
            transmittance: 0.1,
            ..Default::default()
        }
        .with_valid_optics();
        assert_eq!(attrs.reflectance, 0.0);
        assert!((attrs.absorptance() - 0.9).abs() < 1e-12);
    }
}
