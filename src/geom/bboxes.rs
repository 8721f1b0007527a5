use crate::geom::point::Point;
use crate::geom::ray::Ray;
use crate::geom::vector::Vector;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Smallest box holding all points `pts`.
    ///
    /// Returns None for an empty slice.
    pub fn from_points(pts: &[Point]) -> Option<Self> {
        let first = *pts.first()?;
        let (min, max) = pts
            .iter()
            .skip(1)
            .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        Some(Self { min, max })
    }

    /// Returns a copy grown by `eps` on every side.
    pub fn padded(&self, eps: f64) -> Self {
        let pad = Vector::new(eps, eps, eps);
        Self {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    pub fn extent(&self) -> Vector {
        self.max - self.min
    }

    pub fn volume(&self) -> f64 {
        let e = self.extent();
        e.dx * e.dy * e.dz
    }

    /// Checks whether a point is strictly inside the box (not on boundary).
    pub fn contains(&self, p: Point) -> bool {
        p.x > self.min.x
            && p.x < self.max.x
            && p.y > self.min.y
            && p.y < self.max.y
            && p.z > self.min.z
            && p.z < self.max.z
    }

    /// Checks whether two boxes overlap (touching counts as overlapping).
    pub fn overlaps(&self, other: &Self) -> bool {
        // Boxes don't overlap if separated along any axis
        !(self.max.x < other.min.x
            || self.min.x > other.max.x
            || self.max.y < other.min.y
            || self.min.y > other.max.y
            || self.max.z < other.min.z
            || self.min.z > other.max.z)
    }

    /// Intersection of two boxes, or None if they don't overlap.
    pub fn clip(&self, other: &Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Self {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        })
    }

    /// Slab test returning the ray parameter interval `(t0, t1)` inside the box.
    ///
    /// The interval may start behind the origin (`t0 < 0`) when the origin
    /// is inside the box. Returns None on a miss.
    pub fn intersect(&self, ray: &Ray) -> Option<(f64, f64)> {
        let lo = self.min.to_array();
        let hi = self.max.to_array();
        let o = ray.origin.to_array();
        let d = ray.direction.to_array();

        let mut t0 = f64::NEG_INFINITY;
        let mut t1 = f64::INFINITY;
        for axis in 0..3 {
            if d[axis] == 0.0 {
                // Parallel to this slab: the axis imposes no limit unless the
                // origin is outside it.
                if o[axis] < lo[axis] || o[axis] > hi[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d[axis];
            let (near, far) = if inv >= 0.0 {
                ((lo[axis] - o[axis]) * inv, (hi[axis] - o[axis]) * inv)
            } else {
                ((hi[axis] - o[axis]) * inv, (lo[axis] - o[axis]) * inv)
            };
            t0 = t0.max(near);
            t1 = t1.min(far);
        }

        if t0 < t1 && t1 > 0.0 {
            Some((t0, t1))
        } else {
            None
        }
    }

    pub fn hit(&self, ray: &Ray) -> bool {
        self.intersect(ray).is_some()
    }
}
