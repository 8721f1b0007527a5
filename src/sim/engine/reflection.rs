use std::f64::consts::{FRAC_1_PI, PI};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::canopy::LeafAttributes;
use crate::geom::ray::Ray;
use crate::{Point, Vector};

/// Defines how rays reflect off leaves.
pub trait ReflectionModel {
    /// Samples a reflected direction.
    ///
    /// `normal` is the unit facet normal oriented against `incident`.
    fn reflect<R: Rng + ?Sized>(&self, incident: Vector, normal: Vector, rng: &mut R) -> Vector;
}

/// Uniform random direction on the hemisphere around `axis`.
///
/// Draws points in the cube [-1, 1]^3 and keeps the first one inside the
/// unit ball and on the positive side of `axis`.
pub fn sample_hemisphere<R: Rng + ?Sized>(axis: Vector, rng: &mut R) -> Vector {
    loop {
        let x = rng.gen_range(-1.0..1.0);
        let y = rng.gen_range(-1.0..1.0);
        let z = rng.gen_range(-1.0..1.0);
        let len2: f64 = x * x + y * y + z * z;
        if len2 > 1.0 || len2 < 1e-8 {
            continue;
        }
        let v = Vector::new(x, y, z) * (1.0 / len2.sqrt());
        if v.dot(axis) > 0.0 {
            return v;
        }
    }
}

/// Microfacet leaf reflectance.
///
/// A Cook-Torrance specular lobe (Beckmann distribution, shadowing/masking
/// and Schlick Fresnel) mixed with a constant diffuse term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Microfacet {
    /// RMS slope of the Beckmann distribution.
    pub roughness: f64,
    /// Fresnel reflectance at normal incidence.
    pub fresnel_f0: f64,
    /// Weight of the specular lobe in [0, 1].
    pub specular_fraction: f64,
    /// Constant diffuse BRDF value.
    pub diffuse: f64,
    /// Candidates drawn before the last one is taken as is.
    pub max_sampling_attempts: usize,
}

impl Default for Microfacet {
    fn default() -> Self {
        Self {
            roughness: 0.3,
            fresnel_f0: 0.04,
            specular_fraction: 0.3,
            diffuse: FRAC_1_PI,
            max_sampling_attempts: 100,
        }
    }
}

impl Microfacet {
    /// BRDF value for light arriving from `to_light` and leaving along `to_out`.
    ///
    /// All vectors are unit length and `normal` faces `to_light`.
    /// Directions below the surface give zero.
    pub fn evaluate(&self, to_light: Vector, to_out: Vector, normal: Vector) -> f64 {
        let n_l = normal.dot(to_light);
        let n_v = normal.dot(to_out);
        if n_l <= 0.0 || n_v <= 0.0 {
            return 0.0;
        }
        let diffuse = (1.0 - self.specular_fraction) * self.diffuse;
        let Some(h) = (to_light + to_out).normalize() else {
            return diffuse;
        };
        let n_h = normal.dot(h).clamp(1e-12, 1.0);
        let v_h = to_out.dot(h).max(1e-12);

        let d = self.beckmann(n_h);
        let g = (2.0 * n_h * n_v / v_h).min(2.0 * n_h * n_l / v_h).min(1.0);
        let f = self.fresnel(v_h);

        let specular = d * g * f / (4.0 * n_l * n_v);
        self.specular_fraction * specular + diffuse
    }

    /// Upper bound of `evaluate` over all outgoing directions for light
    /// travelling along `incident`.
    ///
    /// Combines `G <= 2 n_h n_v / v_h` with the Beckmann maximum and the
    /// smallest `v_h` reachable above the surface, which sits on the horizon
    /// opposite the light. The acceptance ratio `f / peak` is then at most 1
    /// for every incidence, grazing included.
    pub fn peak(&self, incident: Vector, normal: Vector) -> f64 {
        let n_l = (-incident).dot(normal).clamp(1e-6, 1.0);
        let sin_l = (1.0 - n_l * n_l).sqrt();
        let v_h_min = ((1.0 - sin_l) / 2.0).sqrt().max(1e-6);

        let m2 = self.slope2();
        // Beckmann D peaks at n_h = 1 for m^2 <= 1/2, otherwise at cos^2 = 2 m^2
        let d_max = if m2 <= 0.5 {
            1.0 / (PI * m2)
        } else {
            4.0 * m2 * (1.0 / m2 - 2.0).exp() / PI
        };
        let f_max = self.fresnel(v_h_min).max(self.fresnel_f0);

        let specular = d_max * f_max / (2.0 * n_l * v_h_min);
        let diffuse = (1.0 - self.specular_fraction) * self.diffuse;
        (self.specular_fraction * specular + diffuse).max(1e-12)
    }

    fn slope2(&self) -> f64 {
        (self.roughness * self.roughness).max(1e-12)
    }

    fn beckmann(&self, n_h: f64) -> f64 {
        let m2 = self.slope2();
        let cos2 = n_h * n_h;
        let tan2 = (1.0 - cos2) / cos2;
        (-tan2 / m2).exp() / (PI * m2 * cos2 * cos2)
    }

    /// Schlick approximation.
    fn fresnel(&self, v_h: f64) -> f64 {
        self.fresnel_f0 + (1.0 - self.fresnel_f0) * (1.0 - v_h).powi(5)
    }
}

impl ReflectionModel for Microfacet {
    fn reflect<R: Rng + ?Sized>(&self, incident: Vector, normal: Vector, rng: &mut R) -> Vector {
        let to_light = -incident;
        let peak = self.peak(incident, normal);

        let mut candidate = normal;
        for _ in 0..self.max_sampling_attempts.max(1) {
            candidate = sample_hemisphere(normal, rng);
            let f = self.evaluate(to_light, candidate, normal);
            // Accepted with probability min(f / peak, 1)
            if rng.r#gen::<f64>() * peak < f {
                return candidate;
            }
        }
        candidate
    }
}

/// How the flux of one struck ray is split.
#[derive(Debug, Clone, Copy)]
pub struct Scattering {
    /// Flux kept by the leaf.
    pub absorbed: f64,
    pub reflected: Option<Ray>,
    pub transmitted: Option<Ray>,
}

/// Leaf scattering: splits flux by the leaf optics and spawns secondary rays.
#[derive(Debug, Clone, Copy)]
pub struct LeafScattering<M: ReflectionModel = Microfacet> {
    pub reflection: M,
    /// Secondary rays at or below this flux are not spawned.
    pub ignore_threshold: f64,
}

impl LeafScattering<Microfacet> {
    pub fn new(optics: Microfacet, ignore_threshold: f64) -> Self {
        Self {
            reflection: optics,
            ignore_threshold,
        }
    }
}

impl<M: ReflectionModel> LeafScattering<M> {
    /// Splits the flux of `ray` striking a leaf at `point`.
    ///
    /// Reflected rays leave on the incident side, transmitted rays on the
    /// far side. Both start at `point`.
    pub fn scatter<R: Rng + ?Sized>(
        &self,
        ray: &Ray,
        normal: Vector,
        point: Point,
        leaf: &LeafAttributes,
        rng: &mut R,
    ) -> Scattering {
        let normal = normal.facing(ray.direction);

        let absorbed = ray.flux * leaf.absorptance();

        let reflected_flux = ray.flux * leaf.reflectance;
        let reflected = (reflected_flux > self.ignore_threshold).then(|| Ray {
            origin: point,
            direction: self.reflection.reflect(ray.direction, normal, rng),
            flux: reflected_flux,
        });

        let transmitted_flux = ray.flux * leaf.transmittance;
        let transmitted = (transmitted_flux > self.ignore_threshold).then(|| Ray {
            origin: point,
            direction: sample_hemisphere(-normal, rng),
            flux: transmitted_flux,
        });

        Scattering {
            absorbed,
            reflected,
            transmitted,
        }
    }
}
