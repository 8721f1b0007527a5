use anyhow::Result;
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::canopy::{Facet, FluxLedger, LightType};
use crate::geom::ray::Ray;
use crate::sim::engine::{Grid, LeafScattering, sample_hemisphere};
use crate::{Point, Vector};

use super::climate::Climate;
use super::config::TracerConfig;
use super::result::{HourSummary, RunSummary};

/// Hour-by-hour canopy light simulation.
///
/// Every hour casts a regular lattice of primary rays from the light plane:
/// once along the sun direction and once more with an independently sampled
/// sky direction per ray.
pub struct CanopySimulation {
    config: TracerConfig,
    grid: Grid,
    scattering: LeafScattering,
    plane_height: f64,
}

impl CanopySimulation {
    pub fn new(facets: Vec<Facet>, config: TracerConfig) -> Result<Self> {
        config.validate()?;

        let canopy_top = facets
            .iter()
            .flat_map(|f| f.vertices.iter().map(|p| p.z))
            .fold(f64::NEG_INFINITY, f64::max);
        // Rays start just above the highest leaf so they never begin on it
        let auto_height = canopy_top.max(config.floor_height) + config.ray_spacing;
        let plane_height = config.plane_height(auto_height);

        let plane = &config.light_plane;
        let domain_min = Point::new(plane.x_min, plane.y_min, config.floor_height);
        let domain_max = Point::new(plane.x_max, plane.y_max, plane_height);
        let mut grid = Grid::new(domain_min, domain_max, facets);
        grid.set_max_wraps(config.max_wraps);

        let scattering = LeafScattering::new(config.optics, config.ignore_threshold());
        debug!(
            "Light plane at z = {plane_height}, ignore threshold per ray {}",
            scattering.ignore_threshold
        );

        Ok(Self {
            config,
            grid,
            scattering,
            plane_height,
        })
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn plane_height(&self) -> f64 {
        self.plane_height
    }

    pub fn facets(&self) -> &[Facet] {
        self.grid.facets()
    }

    /// Ends the simulation and hands the facets back for reporting.
    pub fn into_facets(self) -> Vec<Facet> {
        self.grid.into_facets()
    }

    /// Runs every hour slot of `climate`.
    pub fn run(&mut self, climate: &impl Climate) -> RunSummary {
        let num_hours = climate.num_hours();
        for facet in self.grid.facets_mut() {
            facet.flux.reserve_hours(num_hours);
        }

        let origins = self
            .config
            .light_plane
            .lattice(self.config.ray_spacing, self.plane_height);

        let mut summary = RunSummary::default();
        for slot in 0..num_hours {
            summary.hours.push(self.run_hour(climate, slot, &origins));
        }
        summary
    }

    fn run_hour(&mut self, climate: &impl Climate, slot: usize, origins: &[Point]) -> HourSummary {
        let sky = climate.sky(slot);
        let mut hour = HourSummary::new(slot, sky.hour, origins.len());

        if let Some(direction) = sky.direction.filter(|_| sky.direct > 0.0) {
            let flux = self.config.ray_flux(sky.direct);
            let ledger = self.trace_pass(origins, slot, LightType::Direct, Some(direction), flux);
            self.grid.deposit(&ledger, slot);
            hour.record_pass(&ledger);
            hour.direct_pass = true;
        } else {
            debug!("Hour {}: no direct beam", sky.hour);
        }

        if sky.diffuse > 0.0 {
            let flux = self.config.ray_flux(sky.diffuse);
            let ledger = self.trace_pass(origins, slot, LightType::Diffuse, None, flux);
            self.grid.deposit(&ledger, slot);
            hour.record_pass(&ledger);
        }

        info!(
            "Hour {}: {} rays traced, {} hits, {} scattered, {} escaped, absorbed {:.4}",
            sky.hour,
            hour.rays_traced,
            hour.hits,
            hour.scattered,
            hour.escaped,
            hour.absorbed_total()
        );
        hour
    }

    /// Traces one pass of primary rays into a fresh ledger.
    ///
    /// `direction` of None samples a downward sky direction for every ray.
    fn trace_pass(
        &self,
        origins: &[Point],
        slot: usize,
        light: LightType,
        direction: Option<Vector>,
        flux: f64,
    ) -> FluxLedger {
        let num_facets = self.grid.facets().len();
        let down = Vector::new(0.0, 0.0, -1.0);

        let trace_one = |ledger: &mut FluxLedger, (idx, origin): (usize, &Point)| {
            let mut rng = StdRng::seed_from_u64(ray_seed(self.config.seed, slot, light, idx));
            let direction = direction.unwrap_or_else(|| sample_hemisphere(down, &mut rng));
            let ray = Ray {
                origin: *origin,
                direction,
                flux,
            };
            self.grid
                .trace(ray, light, &self.scattering, &mut rng, ledger);
        };

        if self.config.parallel {
            origins
                .par_iter()
                .enumerate()
                .fold(
                    || FluxLedger::new(num_facets),
                    |mut ledger, item| {
                        trace_one(&mut ledger, item);
                        ledger
                    },
                )
                .reduce(|| FluxLedger::new(num_facets), FluxLedger::merge)
        } else {
            let mut ledger = FluxLedger::new(num_facets);
            for item in origins.iter().enumerate() {
                trace_one(&mut ledger, item);
            }
            ledger
        }
    }
}

/// Seed of the random stream of one primary ray.
fn ray_seed(seed: u64, slot: usize, light: LightType, ray: usize) -> u64 {
    let pass = match light {
        LightType::Direct => 0,
        LightType::Diffuse => 1,
        LightType::Scattered => 2,
    };
    seed.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ ((slot as u64) << 40)
        ^ (pass << 36)
        ^ ray as u64
}
