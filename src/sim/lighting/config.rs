use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::Point;
use crate::io::canopy::CanopyFormat;
use crate::sim::engine::grid::DEFAULT_MAX_WRAPS;
use crate::sim::engine::reflection::Microfacet;

use super::climate::SolarClimate;

/// Horizontal rectangle primary rays start from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightPlane {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    /// Plane height. The highest facet vertex is used when unset.
    pub height: Option<f64>,
}

impl Default for LightPlane {
    fn default() -> Self {
        Self {
            x_min: 0.0,
            x_max: 1.0,
            y_min: 0.0,
            y_max: 1.0,
            height: None,
        }
    }
}

impl LightPlane {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
            height: None,
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn depth(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Lattice columns and rows closest to the requested spacing.
    pub fn counts(&self, spacing: f64) -> [usize; 2] {
        [self.width(), self.depth()].map(|len| ((len / spacing).round() as usize).max(1))
    }

    /// Lattice cell edges, stretched so the cells tile the plane exactly.
    pub fn cell(&self, spacing: f64) -> [f64; 2] {
        let [nx, ny] = self.counts(spacing);
        [self.width() / nx as f64, self.depth() / ny as f64]
    }

    /// Area of the plane each primary ray stands for.
    pub fn cell_area(&self, spacing: f64) -> f64 {
        let [sx, sy] = self.cell(spacing);
        sx * sy
    }

    /// Ray origins at the centres of a regular lattice with the given spacing.
    pub fn lattice(&self, spacing: f64, height: f64) -> Vec<Point> {
        let [nx, ny] = self.counts(spacing);
        let [sx, sy] = self.cell(spacing);
        let mut origins = Vec::with_capacity(nx * ny);
        for iy in 0..ny {
            for ix in 0..nx {
                origins.push(Point::new(
                    self.x_min + (ix as f64 + 0.5) * sx,
                    self.y_min + (iy as f64 + 0.5) * sy,
                    height,
                ));
            }
        }
        origins
    }
}

/// Configuration of the canopy ray tracer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    pub light_plane: LightPlane,
    /// Height of the soil surface, the bottom of the domain.
    pub floor_height: f64,
    /// Requested distance between neighbouring primary rays. The lattice
    /// stretches it per axis so a whole number of cells covers the plane.
    pub ray_spacing: f64,
    /// Flux density below which scattered rays are not spawned.
    pub ignore_flux_threshold: f64,
    pub optics: Microfacet,
    /// Horizontal wraps a ray may perform before it is dropped.
    pub max_wraps: usize,
    /// Seed of the per-ray random streams.
    pub seed: u64,
    /// Trace primary rays on the rayon thread pool.
    pub parallel: bool,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            light_plane: LightPlane::default(),
            floor_height: 0.0,
            ray_spacing: 0.01,
            ignore_flux_threshold: 1.0,
            optics: Microfacet::default(),
            max_wraps: DEFAULT_MAX_WRAPS,
            seed: 0,
            parallel: true,
        }
    }
}

impl TracerConfig {
    pub fn new(light_plane: LightPlane) -> Self {
        Self {
            light_plane,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let plane = &self.light_plane;
        if !(self.ray_spacing > 0.0) {
            bail!("Ray spacing must be positive, got {}", self.ray_spacing);
        }
        if !(plane.width() > 0.0 && plane.depth() > 0.0) {
            bail!(
                "Light plane is empty: x [{}, {}], y [{}, {}]",
                plane.x_min,
                plane.x_max,
                plane.y_min,
                plane.y_max
            );
        }
        if !(self.ignore_flux_threshold > 0.0) {
            bail!(
                "Ignore flux threshold must be positive, got {}",
                self.ignore_flux_threshold
            );
        }
        if let Some(height) = plane.height {
            if height <= self.floor_height {
                bail!(
                    "Light plane height {} must be above the floor at {}",
                    height,
                    self.floor_height
                );
            }
        }
        if !(0.0..=1.0).contains(&self.optics.specular_fraction) {
            bail!(
                "Specular fraction must lie in [0, 1], got {}",
                self.optics.specular_fraction
            );
        }
        Ok(())
    }

    /// Flux carried by one primary ray for a given irradiance.
    ///
    /// All rays together carry `irradiance * width * depth`.
    pub fn ray_flux(&self, irradiance: f64) -> f64 {
        irradiance * self.light_plane.cell_area(self.ray_spacing)
    }

    /// Per-ray flux below which secondary rays are dropped.
    pub fn ignore_threshold(&self) -> f64 {
        self.ray_flux(self.ignore_flux_threshold)
    }

    /// Light plane height, falling back to `canopy_top`.
    pub fn plane_height(&self, canopy_top: f64) -> f64 {
        self.light_plane.height.unwrap_or(canopy_top)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

/// Everything the command line run needs besides the canopy itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub tracer: TracerConfig,
    pub climate: SolarClimate,
    pub format: CanopyFormat,
}

impl RunConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let config: Self = read_json(path)?;
        config.tracer.validate()?;
        Ok(config)
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open config file: {}", path.display()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
