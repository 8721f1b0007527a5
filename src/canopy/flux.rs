//! Photon flux accumulators.

use serde::{Deserialize, Serialize};

/// Origin of the light carried by a ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightType {
    /// Unimpeded sun beam.
    Direct,
    /// Isotropic sky light.
    Diffuse,
    /// Light re-emitted by a previously struck leaf.
    Scattered,
}

impl LightType {
    pub const ALL: [LightType; 3] = [LightType::Direct, LightType::Diffuse, LightType::Scattered];

    fn index(self) -> usize {
        match self {
            LightType::Direct => 0,
            LightType::Diffuse => 1,
            LightType::Scattered => 2,
        }
    }
}

/// Side of a facet struck by a ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The outward (normal) side.
    Upper,
    /// The underside.
    Lower,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Upper, Side::Lower];

    fn index(self) -> usize {
        match self {
            Side::Upper => 0,
            Side::Lower => 1,
        }
    }
}

/// Slot of a (light, side) pair in a flat six-element record.
///
/// Order: up_dir, up_dff, up_scat, down_dir, down_dff, down_scat.
pub fn channel(light: LightType, side: Side) -> usize {
    side.index() * 3 + light.index()
}

/// Report column prefixes in channel order.
pub const CHANNEL_NAMES: [&str; 6] = [
    "up_dir",
    "up_dff",
    "up_scat",
    "down_dir",
    "down_dff",
    "down_scat",
];

/// Per-hour photon flux received by one facet.
///
/// Each hour slot holds the six channels in `CHANNEL_NAMES` order.
/// Flux is only ever added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotonFlux {
    slots: Vec<[f64; 6]>,
}

impl PhotonFlux {
    pub fn with_slots(num_hours: usize) -> Self {
        Self {
            slots: vec![[0.0; 6]; num_hours],
        }
    }

    pub fn num_hours(&self) -> usize {
        self.slots.len()
    }

    /// Makes sure at least `num_hours` slots exist. Existing flux is kept.
    pub fn reserve_hours(&mut self, num_hours: usize) {
        if num_hours > self.slots.len() {
            self.slots.resize(num_hours, [0.0; 6]);
        }
    }

    /// Adds flux to one channel of one hour.
    ///
    /// Grows the slot list if `hour` is beyond it.
    pub fn add(&mut self, light: LightType, side: Side, hour: usize, flux: f64) {
        debug_assert!(flux >= 0.0, "flux accumulators never decrease");
        if hour >= self.slots.len() {
            self.slots.resize(hour + 1, [0.0; 6]);
        }
        self.slots[hour][channel(light, side)] += flux;
    }

    pub fn get(&self, light: LightType, side: Side, hour: usize) -> f64 {
        self.slots
            .get(hour)
            .map(|s| s[channel(light, side)])
            .unwrap_or(0.0)
    }

    /// All six channels of one hour, zero for unknown hours.
    pub fn hour(&self, hour: usize) -> [f64; 6] {
        self.slots.get(hour).copied().unwrap_or([0.0; 6])
    }

    /// Sum over every channel and hour.
    pub fn total(&self) -> f64 {
        self.slots.iter().flat_map(|s| s.iter()).sum()
    }
}

/// Counters collected while tracing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TraceStats {
    /// Rays traced, primary and scattered.
    pub rays: usize,
    /// Rays that struck a facet.
    pub hits: usize,
    /// Rays that left the canopy without a hit.
    pub escaped: usize,
    /// Secondary rays spawned by scattering.
    pub scattered: usize,
    /// Rays dropped after too many horizontal wraps.
    pub wrap_limited: usize,
}

impl TraceStats {
    pub fn merge(&mut self, other: &Self) {
        self.rays += other.rays;
        self.hits += other.hits;
        self.escaped += other.escaped;
        self.scattered += other.scattered;
        self.wrap_limited += other.wrap_limited;
    }
}

/// Receiver of the flux absorbed while tracing.
pub trait FluxSink {
    fn absorb(&mut self, facet: usize, light: LightType, side: Side, flux: f64);
    fn stats_mut(&mut self) -> &mut TraceStats;
}

/// Absorbed flux per facet for a single pass, kept apart from the facets.
///
/// Tracing workers each fill their own ledger. Ledgers are merged and then
/// deposited into the facet accumulators for one hour.
#[derive(Debug, Clone, Default)]
pub struct FluxLedger {
    flux: Vec<[f64; 6]>,
    pub stats: TraceStats,
}

impl FluxLedger {
    pub fn new(num_facets: usize) -> Self {
        Self {
            flux: vec![[0.0; 6]; num_facets],
            stats: TraceStats::default(),
        }
    }

    pub fn add(&mut self, facet: usize, light: LightType, side: Side, flux: f64) {
        self.flux[facet][channel(light, side)] += flux;
    }

    pub fn get(&self, facet: usize, light: LightType, side: Side) -> f64 {
        self.flux[facet][channel(light, side)]
    }

    /// Iterates `(facet index, six channels)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[f64; 6])> {
        self.flux.iter().enumerate()
    }

    /// Total absorbed flux of one light type.
    pub fn absorbed(&self, light: LightType) -> f64 {
        Side::ALL
            .iter()
            .map(|&side| {
                let ch = channel(light, side);
                self.flux.iter().map(|f| f[ch]).sum::<f64>()
            })
            .sum()
    }

    /// Adds another ledger of the same size into this one.
    pub fn merge(mut self, other: Self) -> Self {
        for (mine, theirs) in self.flux.iter_mut().zip(other.flux.iter()) {
            for (a, b) in mine.iter_mut().zip(theirs.iter()) {
                *a += b;
            }
        }
        self.stats.merge(&other.stats);
        self
    }
}

impl FluxSink for FluxLedger {
    fn absorb(&mut self, facet: usize, light: LightType, side: Side, flux: f64) {
        self.add(facet, light, side, flux);
    }

    fn stats_mut(&mut self) -> &mut TraceStats {
        &mut self.stats
    }
}
