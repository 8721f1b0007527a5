use crate::Point;
use crate::geom::EPS;
use std::ops::{Add, Mul, Neg, Sub};

/// Direction or displacement in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Vector {
    pub const ZERO: Vector = Vector {
        dx: 0.0,
        dy: 0.0,
        dz: 0.0,
    };

    pub fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    /// Displacement from `beg` to `end`.
    pub fn from_points(beg: Point, end: Point) -> Self {
        Self::new(end.x - beg.x, end.y - beg.y, end.z - beg.z)
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.dy * other.dz - self.dz * other.dy,
            self.dz * other.dx - self.dx * other.dz,
            self.dx * other.dy - self.dy * other.dx,
        )
    }

    pub fn dot(self, other: Self) -> f64 {
        self.dx * other.dx + self.dy * other.dy + self.dz * other.dz
    }

    pub fn length(&self) -> f64 {
        self.dot(*self).sqrt()
    }

    pub fn is_close(&self, other: &Self) -> bool {
        (*self - *other).to_array().iter().all(|c| c.abs() < EPS)
    }

    /// Unit vector along `self`, or None for a (near) zero vector.
    pub fn normalize(&self) -> Option<Self> {
        let len = self.length();
        (len >= EPS).then(|| *self * (1.0 / len))
    }

    /// Components as a `[dx, dy, dz]` array, used by per-axis loops.
    pub fn to_array(self) -> [f64; 3] {
        [self.dx, self.dy, self.dz]
    }

    /// `self` or its opposite, whichever points against `dir`.
    ///
    /// Orients a facet normal toward the side a ray arrives from.
    pub fn facing(self, dir: Self) -> Self {
        if self.dot(dir) < 0.0 { self } else { -self }
    }

    /// Right-handed unit normal of the triangle `(pt0, pt1, pt2)`.
    ///
    /// None for collinear points.
    pub fn normal(pt0: Point, pt1: Point, pt2: Point) -> Option<Self> {
        (pt1 - pt0).cross(pt2 - pt0).normalize()
    }
}

impl Add for Vector {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.dx + other.dx, self.dy + other.dy, self.dz + other.dz)
    }
}

impl Sub for Vector {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.dx - other.dx, self.dy - other.dy, self.dz - other.dz)
    }
}

impl Neg for Vector {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.dx, -self.dy, -self.dz)
    }
}

impl Mul<f64> for Vector {
    type Output = Self;
    fn mul(self, k: f64) -> Self {
        Self::new(self.dx * k, self.dy * k, self.dz * k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winding_decides_normal_side() {
        let a = Point::new(0., 0., 1.);
        let b = Point::new(2., 0., 1.);
        let c = Point::new(0., 3., 1.);
        let up = Vector::normal(a, b, c).unwrap();
        assert!(up.is_close(&Vector::new(0., 0., 1.)));
        let down = Vector::normal(a, c, b).unwrap();
        assert!(down.is_close(&-up));

        // A sliver with all vertices on one line has no normal
        let d = Point::new(4., 0., 1.);
        assert!(Vector::normal(a, b, d).is_none());
    }

    #[test]
    fn test_normalize_keeps_direction() {
        let v = Vector::new(0.3, -0.4, -1.2).normalize().unwrap();
        assert!((v.length() - 1.0).abs() < 1e-12);
        assert!((v.dz / v.dx - (-4.0)).abs() < 1e-12);
        assert!(Vector::ZERO.normalize().is_none());
        assert!(Vector::new(1e-15, 0., 0.).normalize().is_none());
    }

    #[test]
    fn test_facing_opposes_ray() {
        let n = Vector::new(0., 0., 1.);
        let falling = Vector::new(0.2, 0.1, -1.);
        let rising = Vector::new(0.2, 0.1, 1.);
        assert_eq!(n.facing(falling), n);
        assert_eq!(n.facing(rising), -n);
        assert!(n.facing(rising).dot(rising) < 0.0);
    }

    #[test]
    fn test_mirror_from_operators() {
        // d - 2 (d . n) n reflects a falling ray into a rising one
        let n = Vector::new(0., 0., 1.);
        let d = Vector::new(1., 0., -1.);
        let r = d - n * (2.0 * d.dot(n));
        assert!(r.is_close(&Vector::new(1., 0., 1.)));
        let step = Vector::from_points(Point::new(1., 1., 1.), Point::new(2., 0., 3.));
        assert_eq!(step.to_array(), [1., -1., 2.]);
    }
}
