use crate::Point;
use crate::geom::RAY_T_MIN;
use crate::geom::ray::Ray;

/// Result of a ray/triangle intersection.
#[derive(Debug, Clone, Copy)]
pub struct TriangleHit {
    /// Ray parameter of the hit.
    pub t: f64,
    /// Hit point on the triangle.
    pub point: Point,
    /// Barycentric weight of the second vertex.
    pub beta: f64,
    /// Barycentric weight of the third vertex.
    pub gamma: f64,
}

/// Intersects a ray with the triangle `(p0, p1, p2)`.
///
/// Solves `o + t*d = p0 + beta*(p1 - p0) + gamma*(p2 - p0)` with Cramer's rule.
/// Hits with `t < RAY_T_MIN` are rejected. Degenerate (zero-area) triangles
/// and rays lying in the triangle plane never hit.
pub fn intersect_triangle(ray: &Ray, p0: Point, p1: Point, p2: Point) -> Option<TriangleHit> {
    let o = ray.origin;
    let d = ray.direction;

    let a = p0.x - p1.x;
    let b = p0.y - p1.y;
    let c = p0.z - p1.z;
    let e = p0.x - p2.x;
    let f = p0.y - p2.y;
    let g = p0.z - p2.z;
    let j = p0.x - o.x;
    let k = p0.y - o.y;
    let l = p0.z - o.z;

    // Cofactors shared by the determinant and beta
    let fdz_gdy = f * d.dz - g * d.dy;
    let gdx_edz = g * d.dx - e * d.dz;
    let edy_fdx = e * d.dy - f * d.dx;

    let det = a * fdz_gdy + b * gdx_edz + c * edy_fdx;
    if det == 0.0 || !det.is_finite() {
        return None;
    }

    let beta = (j * fdz_gdy + k * gdx_edz + l * edy_fdx) / det;
    if beta < 0.0 {
        return None;
    }

    let ak_jb = a * k - j * b;
    let jc_al = j * c - a * l;
    let bl_kc = b * l - k * c;

    let gamma = (d.dz * ak_jb + d.dy * jc_al + d.dx * bl_kc) / det;
    if gamma < 0.0 || beta + gamma > 1.0 {
        return None;
    }

    let t = -(g * ak_jb + f * jc_al + e * bl_kc) / det;
    if t < RAY_T_MIN {
        return None;
    }

    Some(TriangleHit {
        t,
        point: ray.point_at(t),
        beta,
        gamma,
    })
}
