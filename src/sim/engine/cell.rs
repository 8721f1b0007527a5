use crate::Point;
use crate::canopy::{Facet, Side};
use crate::geom::ray::Ray;

/// Nearest facet struck inside one cell.
#[derive(Debug, Clone, Copy)]
pub struct CellHit {
    /// Ray parameter of the hit.
    pub t: f64,
    /// Index of the facet in the grid's facet arena.
    pub facet: usize,
    /// Side of the facet that was struck.
    pub side: Side,
    pub point: Point,
}

/// One voxel of the grid. Holds indices into the grid's facet arena.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    facets: Vec<usize>,
}

impl Cell {
    pub fn push(&mut self, facet: usize) {
        self.facets.push(facet);
    }

    pub fn len(&self) -> usize {
        self.facets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    pub fn facet_indices(&self) -> &[usize] {
        &self.facets
    }

    /// Finds the nearest facet of this cell struck by the ray.
    pub fn hit(&self, ray: &Ray, facets: &[Facet]) -> Option<CellHit> {
        let mut closest: Option<CellHit> = None;

        for &idx in &self.facets {
            let facet = &facets[idx];
            let Some(hit) = facet.intersect(ray) else {
                continue;
            };
            if closest.is_some_and(|c| c.t <= hit.t) {
                continue;
            }
            // Travelling against the normal means the outward side was struck
            let side = if ray.direction.dot(facet.normal()) < 0.0 {
                Side::Upper
            } else {
                Side::Lower
            };
            closest = Some(CellHit {
                t: hit.t,
                facet: idx,
                side,
                point: hit.point,
            });
        }

        closest
    }
}
