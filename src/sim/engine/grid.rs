use log::{debug, trace, warn};

use crate::Point;
use crate::canopy::Facet;
use crate::geom::BBOX_PAD;
use crate::geom::bboxes::BoundingBox;
use crate::geom::ray::Ray;

use super::cell::{Cell, CellHit};

/// Cells per facet along each axis: the lattice holds about
/// `CELL_MULTIPLIER^3` cells per facet.
pub const CELL_MULTIPLIER: f64 = 2.0;

/// Upper bound on the number of cells allocated by automatic sizing.
pub const MAX_CELLS: usize = 1 << 24;

/// Horizontal wraps a single ray may perform before it is dropped.
pub const DEFAULT_MAX_WRAPS: usize = 10_000;

/// Counters collected while registering facets into the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridStats {
    /// Facets registered in at least one cell.
    pub registered: usize,
    /// Facets dropped because they lie fully outside the domain.
    pub outside: usize,
    /// Zero-area facets, which can never be hit.
    pub degenerate: usize,
    /// Total number of facet references held by all cells.
    pub references: usize,
}

/// Outcome of walking a ray through the grid.
#[derive(Debug, Clone, Copy)]
pub enum Traversal {
    Hit(CellHit),
    /// Left the canopy through the top or the floor, or missed the domain.
    Escaped,
    /// Dropped after `max_wraps` horizontal wraps.
    WrapLimited,
}

/// Uniform grid over the canopy domain.
///
/// Owns the facet arena. Cells hold indices into it. The horizontal extent
/// is treated as one tile of an infinitely repeating canopy.
pub struct Grid {
    bbox: BoundingBox,
    resolution: [usize; 3],
    cell_size: [f64; 3],
    cells: Vec<Cell>,
    facets: Vec<Facet>,
    max_wraps: usize,
    stats: GridStats,
}

impl Grid {
    /// Builds a grid over `[domain_min, domain_max]`, sized from the facet count.
    pub fn new(domain_min: Point, domain_max: Point, facets: Vec<Facet>) -> Self {
        let bbox = BoundingBox::new(domain_min, domain_max).padded(BBOX_PAD);
        let resolution = Self::resolution_for(&bbox, facets.len());
        Self::build(bbox, facets, resolution)
    }

    /// Builds a grid with explicit cell counts (each at least 1).
    pub fn with_resolution(
        domain_min: Point,
        domain_max: Point,
        facets: Vec<Facet>,
        resolution: [usize; 3],
    ) -> Self {
        let bbox = BoundingBox::new(domain_min, domain_max).padded(BBOX_PAD);
        Self::build(bbox, facets, resolution.map(|n| n.max(1)))
    }

    /// Cell counts giving about `CELL_MULTIPLIER^3` cells per facet.
    pub fn resolution_for(bbox: &BoundingBox, num_facets: usize) -> [usize; 3] {
        let volume = bbox.volume();
        if !(volume > 0.0) {
            return [1, 1, 1];
        }
        let extent = bbox.extent().to_array();
        let mut side = (volume / num_facets.max(1) as f64).cbrt() / CELL_MULTIPLIER;
        loop {
            let n = extent.map(|len| ((len / side).floor() as usize).max(1));
            if n[0] * n[1] * n[2] <= MAX_CELLS {
                return n;
            }
            side *= 1.25;
        }
    }

    fn build(bbox: BoundingBox, facets: Vec<Facet>, resolution: [usize; 3]) -> Self {
        let extent = bbox.extent().to_array();
        let cell_size = [
            extent[0] / resolution[0] as f64,
            extent[1] / resolution[1] as f64,
            extent[2] / resolution[2] as f64,
        ];
        let mut grid = Self {
            bbox,
            resolution,
            cell_size,
            cells: vec![Cell::default(); resolution[0] * resolution[1] * resolution[2]],
            facets: Vec::new(),
            max_wraps: DEFAULT_MAX_WRAPS,
            stats: GridStats::default(),
        };

        for (idx, facet) in facets.iter().enumerate() {
            if facet.is_degenerate() {
                grid.stats.degenerate += 1;
                continue;
            }
            let Some(clipped) = facet.bounding_box().clip(&grid.bbox) else {
                grid.stats.outside += 1;
                continue;
            };
            let lo = grid.cell_coords(clipped.min);
            let hi = grid.cell_coords(clipped.max);
            for iz in lo[2]..=hi[2] {
                for iy in lo[1]..=hi[1] {
                    for ix in lo[0]..=hi[0] {
                        let flat = grid.flat_index([ix, iy, iz]);
                        grid.cells[flat].push(idx);
                        grid.stats.references += 1;
                    }
                }
            }
            grid.stats.registered += 1;
        }
        grid.facets = facets;

        if grid.stats.outside > 0 {
            warn!(
                "{} facet(s) outside the light-source domain were dropped",
                grid.stats.outside
            );
        }
        if grid.stats.degenerate > 0 {
            warn!(
                "{} degenerate (zero-area) facet(s) will never be hit",
                grid.stats.degenerate
            );
        }
        debug!(
            "Grid {}x{}x{} over {} .. {}: {} facets registered, {} cell references",
            resolution[0],
            resolution[1],
            resolution[2],
            grid.bbox.min,
            grid.bbox.max,
            grid.stats.registered,
            grid.stats.references
        );

        grid
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn resolution(&self) -> [usize; 3] {
        self.resolution
    }

    pub fn stats(&self) -> GridStats {
        self.stats
    }

    pub fn facets(&self) -> &[Facet] {
        &self.facets
    }

    pub fn facets_mut(&mut self) -> &mut [Facet] {
        &mut self.facets
    }

    /// Hands the facet arena back, consuming the grid.
    pub fn into_facets(self) -> Vec<Facet> {
        self.facets
    }

    pub fn set_max_wraps(&mut self, max_wraps: usize) {
        self.max_wraps = max_wraps;
    }

    pub fn cell(&self, ix: usize, iy: usize, iz: usize) -> &Cell {
        &self.cells[self.flat_index([ix, iy, iz])]
    }

    fn flat_index(&self, idx: [usize; 3]) -> usize {
        idx[0] + self.resolution[0] * (idx[1] + self.resolution[1] * idx[2])
    }

    /// Cell containing `p`, clamped to the lattice.
    fn cell_coords(&self, p: Point) -> [usize; 3] {
        let lo = self.bbox.min.to_array();
        let p = p.to_array();
        let mut idx = [0; 3];
        for axis in 0..3 {
            let i = ((p[axis] - lo[axis]) / self.cell_size[axis]).floor();
            let max = (self.resolution[axis] - 1) as f64;
            idx[axis] = i.clamp(0.0, max) as usize;
        }
        idx
    }

    /// Walks the ray cell by cell (3D DDA) and returns the nearest facet hit.
    ///
    /// Leaving the domain through a side wraps the ray to the opposite side:
    /// its origin is translated by the domain width and the ray parameter
    /// carries on unchanged. Leaving through the top or the floor ends the walk.
    pub fn nearest_hit(&self, ray: &mut Ray) -> Traversal {
        let Some((t0, _)) = self.bbox.intersect(ray) else {
            return Traversal::Escaped;
        };
        let start = if self.bbox.contains(ray.origin) {
            ray.origin
        } else {
            ray.point_at(t0)
        };

        let n = self.resolution.map(|v| v as isize);
        let mut idx = self.cell_coords(start).map(|v| v as isize);
        let lo = self.bbox.min.to_array();
        let extent = self.bbox.extent().to_array();
        let o = ray.origin.to_array();
        let d = ray.direction.to_array();

        let mut step = [0isize; 3];
        let mut t_next = [f64::INFINITY; 3];
        let mut t_delta = [f64::INFINITY; 3];
        for axis in 0..3 {
            let size = self.cell_size[axis];
            if d[axis] > 0.0 {
                step[axis] = 1;
                let boundary = lo[axis] + (idx[axis] + 1) as f64 * size;
                t_next[axis] = (boundary - o[axis]) / d[axis];
                t_delta[axis] = size / d[axis];
            } else if d[axis] < 0.0 {
                step[axis] = -1;
                let boundary = lo[axis] + idx[axis] as f64 * size;
                t_next[axis] = (boundary - o[axis]) / d[axis];
                t_delta[axis] = -size / d[axis];
            }
        }

        let mut wraps = 0;
        loop {
            let flat = self.flat_index(idx.map(|v| v as usize));
            if let Some(hit) = self.cells[flat].hit(ray, &self.facets) {
                if hit.t < t_next[0] && hit.t < t_next[1] && hit.t < t_next[2] {
                    return Traversal::Hit(hit);
                }
            }

            let axis = if t_next[0] <= t_next[1] && t_next[0] <= t_next[2] {
                0
            } else if t_next[1] <= t_next[2] {
                1
            } else {
                2
            };
            if !t_next[axis].is_finite() {
                return Traversal::Escaped;
            }

            idx[axis] += step[axis];
            t_next[axis] += t_delta[axis];
            if (0..n[axis]).contains(&idx[axis]) {
                continue;
            }
            if axis == 2 {
                return Traversal::Escaped;
            }

            wraps += 1;
            if wraps > self.max_wraps {
                trace!("Ray {:?} dropped after {} wraps", ray.direction, self.max_wraps);
                return Traversal::WrapLimited;
            }
            let mut origin = ray.origin.to_array();
            if idx[axis] >= n[axis] {
                idx[axis] = 0;
                origin[axis] -= extent[axis];
            } else {
                idx[axis] = n[axis] - 1;
                origin[axis] += extent[axis];
            }
            ray.origin = Point::from_array(origin);
        }
    }
}
