use rand::Rng;

use crate::canopy::{FluxLedger, FluxSink, LightType, Side, TraceStats};
use crate::geom::ray::Ray;

use super::grid::{Grid, Traversal};
use super::reflection::{LeafScattering, ReflectionModel};

/// Credits made by a single traced ray, in hit order.
#[derive(Debug, Default)]
struct Credits {
    entries: Vec<(usize, LightType, Side, f64)>,
    stats: TraceStats,
}

impl FluxSink for Credits {
    fn absorb(&mut self, facet: usize, light: LightType, side: Side, flux: f64) {
        self.entries.push((facet, light, side, flux));
    }

    fn stats_mut(&mut self) -> &mut TraceStats {
        &mut self.stats
    }
}

impl Grid {
    /// Traces a primary ray and every scattered descendant into `sink`.
    ///
    /// Pending secondary rays are kept on a work stack. Each accepted hit
    /// credits the struck facet with the absorbed part of the ray's flux.
    /// Returns whether the primary ray struck a facet.
    pub fn trace<M, R, S>(
        &self,
        ray: Ray,
        light: LightType,
        scattering: &LeafScattering<M>,
        rng: &mut R,
        sink: &mut S,
    ) -> bool
    where
        M: ReflectionModel,
        R: Rng + ?Sized,
        S: FluxSink,
    {
        let mut pending = vec![(ray, light)];
        let mut primary_hit = None;

        while let Some((mut ray, light)) = pending.pop() {
            sink.stats_mut().rays += 1;
            let hit = match self.nearest_hit(&mut ray) {
                Traversal::Hit(hit) => hit,
                Traversal::Escaped => {
                    sink.stats_mut().escaped += 1;
                    primary_hit.get_or_insert(false);
                    continue;
                }
                Traversal::WrapLimited => {
                    sink.stats_mut().wrap_limited += 1;
                    primary_hit.get_or_insert(false);
                    continue;
                }
            };
            primary_hit.get_or_insert(true);
            sink.stats_mut().hits += 1;

            let facet = &self.facets()[hit.facet];
            let out = scattering.scatter(&ray, facet.normal(), hit.point, &facet.attributes, rng);
            sink.absorb(hit.facet, light, hit.side, out.absorbed);

            for secondary in [out.reflected, out.transmitted].into_iter().flatten() {
                sink.stats_mut().scattered += 1;
                pending.push((secondary, LightType::Scattered));
            }
        }

        primary_hit.unwrap_or(false)
    }

    /// Traces a ray and adds its absorbed flux straight to the facets at `hour`.
    ///
    /// Only the struck facets are touched, so the cost follows the number of
    /// hits rather than the size of the canopy. Passes over many rays go
    /// through `trace` with a shared `FluxLedger` instead.
    pub fn hit<M, R>(
        &mut self,
        ray: Ray,
        hour: usize,
        light: LightType,
        scattering: &LeafScattering<M>,
        rng: &mut R,
    ) -> bool
    where
        M: ReflectionModel,
        R: Rng + ?Sized,
    {
        let mut credits = Credits::default();
        let struck = self.trace(ray, light, scattering, rng, &mut credits);
        let facets = self.facets_mut();
        for (idx, light, side, flux) in credits.entries {
            if flux > 0.0 {
                facets[idx].flux.add(light, side, hour, flux);
            }
        }
        struck
    }

    /// Adds a ledger into the facet accumulators of one hour slot.
    pub fn deposit(&mut self, ledger: &FluxLedger, hour: usize) {
        let facets = self.facets_mut();
        for (idx, channels) in ledger.iter() {
            if channels.iter().all(|&f| f == 0.0) {
                continue;
            }
            let facet = &mut facets[idx];
            for side in Side::ALL {
                for light in LightType::ALL {
                    let flux = ledger.get(idx, light, side);
                    if flux > 0.0 {
                        facet.flux.add(light, side, hour, flux);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::canopy::{Facet, LeafAttributes};
    use crate::sim::engine::reflection::Microfacet;
    use crate::{Point, Vector};

    fn leaf(r: f64, t: f64) -> LeafAttributes {
        LeafAttributes {
            reflectance: r,
            transmittance: t,
            ..Default::default()
        }
    }

    /// Unit-area upward-facing square made of two triangles at height z.
    fn unit_square(z: f64, attrs: LeafAttributes) -> Vec<Facet> {
        let a = Point::new(0.5, 0.5, z);
        let b = Point::new(1.5, 0.5, z);
        let c = Point::new(1.5, 1.5, z);
        let d = Point::new(0.5, 1.5, z);
        vec![
            Facet::new([a, b, c], attrs.clone()),
            Facet::new([a, c, d], attrs),
        ]
    }

    /// Layer covering the whole domain at height z.
    fn layer(z: f64, attrs: LeafAttributes) -> Vec<Facet> {
        let a = Point::new(0., 0., z);
        let b = Point::new(2., 0., z);
        let c = Point::new(2., 2., z);
        let d = Point::new(0., 2., z);
        vec![
            Facet::new([a, b, c], attrs.clone()),
            Facet::new([a, c, d], attrs),
        ]
    }

    fn domain() -> (Point, Point) {
        (Point::new(0., 0., 0.), Point::new(2., 2., 1.))
    }

    fn down(x: f64, y: f64, flux: f64) -> Ray {
        Ray::new(Point::new(x, y, 1.0), Vector::new(0., 0., -1.), flux).unwrap()
    }

    #[test]
    fn test_single_hit_splits_flux() {
        let (lo, hi) = domain();
        let mut grid = Grid::new(lo, hi, unit_square(0.5, leaf(0.2, 0.1)));
        // Threshold above both secondaries: absorption only
        let scattering = LeafScattering::new(Microfacet::default(), 50.0);
        let mut rng = StdRng::seed_from_u64(7);

        assert!(grid.hit(down(0.8, 0.6, 100.0), 3, LightType::Direct, &scattering, &mut rng));
        let facet = &grid.facets()[0];
        assert!((facet.flux.get(LightType::Direct, Side::Upper, 3) - 70.0).abs() < 1e-9);
        assert_eq!(facet.flux.get(LightType::Direct, Side::Lower, 3), 0.0);
        assert_eq!(grid.facets()[1].flux.total(), 0.0);
    }

    #[test]
    fn test_secondary_rays_depend_on_threshold() {
        let (lo, hi) = domain();
        let grid = Grid::new(lo, hi, unit_square(0.5, leaf(0.2, 0.1)));
        let mut rng = StdRng::seed_from_u64(8);

        let both = LeafScattering::new(Microfacet::default(), 0.05);
        let mut ledger = FluxLedger::new(grid.facets().len());
        grid.trace(down(0.8, 0.6, 1.0), LightType::Direct, &both, &mut rng, &mut ledger);
        assert_eq!(ledger.stats.scattered, 2);

        let one = LeafScattering::new(Microfacet::default(), 0.15);
        let mut ledger = FluxLedger::new(grid.facets().len());
        grid.trace(down(0.8, 0.6, 1.0), LightType::Direct, &one, &mut rng, &mut ledger);
        assert_eq!(ledger.stats.scattered, 1);
    }

    #[test]
    fn test_energy_is_conserved_across_bounces() {
        // Two stacked layers: scattered light is either absorbed or escapes
        let (lo, hi) = domain();
        let mut facets = layer(0.7, leaf(0.3, 0.3));
        facets.extend(layer(0.3, leaf(0.3, 0.3)));
        let grid = Grid::new(lo, hi, facets);
        let scattering = LeafScattering::new(Microfacet::default(), 1e-6);
        let mut rng = StdRng::seed_from_u64(9);

        let mut ledger = FluxLedger::new(grid.facets().len());
        let ray = down(1.0, 0.9, 1.0);
        assert!(grid.trace(ray, LightType::Direct, &scattering, &mut rng, &mut ledger));
        // 0.4 on the top layer plus at least 0.4 * 0.3 of the transmitted part
        let absorbed: f64 = LightType::ALL.iter().map(|&l| ledger.absorbed(l)).sum();
        assert!(absorbed > 0.5 && absorbed <= 1.0 + 1e-12);
        assert!(ledger.absorbed(LightType::Scattered) > 0.0);
        assert_eq!(ledger.stats.rays, ledger.stats.scattered + 1);
    }

    #[test]
    fn test_hit_matches_trace_and_deposit() {
        let (lo, hi) = domain();
        let mut facets = layer(0.7, leaf(0.3, 0.3));
        facets.extend(layer(0.3, leaf(0.2, 0.4)));
        let mut direct = Grid::new(lo, hi, facets.clone());
        let mut pooled = Grid::new(lo, hi, facets);
        let scattering = LeafScattering::new(Microfacet::default(), 1e-4);

        for (i, (x, y)) in [(1.0, 0.9), (0.3, 1.7), (1.6, 0.2)].into_iter().enumerate() {
            let seed = 20 + i as u64;
            let mut rng = StdRng::seed_from_u64(seed);
            assert!(direct.hit(down(x, y, 1.0), 2, LightType::Diffuse, &scattering, &mut rng));

            let mut rng = StdRng::seed_from_u64(seed);
            let mut ledger = FluxLedger::new(pooled.facets().len());
            pooled.trace(down(x, y, 1.0), LightType::Diffuse, &scattering, &mut rng, &mut ledger);
            pooled.deposit(&ledger, 2);
        }

        for (a, b) in direct.facets().iter().zip(pooled.facets()) {
            for light in LightType::ALL {
                for side in Side::ALL {
                    let (fa, fb) = (a.flux.get(light, side, 2), b.flux.get(light, side, 2));
                    assert!((fa - fb).abs() < 1e-12, "{light:?} {side:?}: {fa} vs {fb}");
                }
            }
        }
        let total: f64 = direct.facets().iter().map(|f| f.flux.total()).sum();
        assert!(total > 0.0);
    }

    #[test]
    fn test_open_sky_leaves_accumulators_untouched() {
        let (lo, hi) = domain();
        let mut grid = Grid::new(lo, hi, unit_square(0.5, leaf(0.2, 0.1)));
        let scattering = LeafScattering::new(Microfacet::default(), 0.0);
        let mut rng = StdRng::seed_from_u64(10);

        // Column at x = 0.2 holds no facet
        assert!(!grid.hit(down(0.2, 0.2, 5.0), 0, LightType::Direct, &scattering, &mut rng));
        assert!(grid.facets().iter().all(|f| f.flux.total() == 0.0));
    }

    #[test]
    fn test_lower_side_is_credited() {
        let (lo, hi) = domain();
        let mut grid = Grid::new(lo, hi, unit_square(0.5, leaf(0.0, 0.0)));
        let scattering = LeafScattering::new(Microfacet::default(), 0.0);
        let mut rng = StdRng::seed_from_u64(11);

        let up = Ray::new(Point::new(0.8, 0.6, 0.1), Vector::new(0., 0., 1.), 2.0).unwrap();
        assert!(grid.hit(up, 1, LightType::Scattered, &scattering, &mut rng));
        let facet = &grid.facets()[0];
        assert!((facet.flux.get(LightType::Scattered, Side::Lower, 1) - 2.0).abs() < 1e-12);
        assert_eq!(facet.flux.get(LightType::Scattered, Side::Upper, 1), 0.0);
    }
}
