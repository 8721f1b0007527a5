use serde::Serialize;

use crate::canopy::{FluxLedger, LightType, TraceStats};

/// Outcome of one hour slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HourSummary {
    /// Hour slot index.
    pub slot: usize,
    /// Local solar hour.
    pub hour: f64,
    /// Primary rays per pass.
    pub rays_per_pass: usize,
    /// Whether the direct beam pass ran.
    pub direct_pass: bool,
    pub rays_traced: usize,
    pub hits: usize,
    pub escaped: usize,
    pub scattered: usize,
    pub wrap_limited: usize,
    pub absorbed_direct: f64,
    pub absorbed_diffuse: f64,
    pub absorbed_scattered: f64,
}

impl HourSummary {
    pub fn new(slot: usize, hour: f64, rays_per_pass: usize) -> Self {
        Self {
            slot,
            hour,
            rays_per_pass,
            ..Default::default()
        }
    }

    /// Adds the counters and absorbed flux of one pass.
    pub fn record_pass(&mut self, ledger: &FluxLedger) {
        let TraceStats {
            rays,
            hits,
            escaped,
            scattered,
            wrap_limited,
        } = ledger.stats;
        self.rays_traced += rays;
        self.hits += hits;
        self.escaped += escaped;
        self.scattered += scattered;
        self.wrap_limited += wrap_limited;
        self.absorbed_direct += ledger.absorbed(LightType::Direct);
        self.absorbed_diffuse += ledger.absorbed(LightType::Diffuse);
        self.absorbed_scattered += ledger.absorbed(LightType::Scattered);
    }

    pub fn absorbed_total(&self) -> f64 {
        self.absorbed_direct + self.absorbed_diffuse + self.absorbed_scattered
    }
}

/// Result of a canopy light simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub hours: Vec<HourSummary>,
}

impl RunSummary {
    pub fn absorbed_total(&self) -> f64 {
        self.hours.iter().map(HourSummary::absorbed_total).sum()
    }

    pub fn rays_traced(&self) -> usize {
        self.hours.iter().map(|h| h.rays_traced).sum()
    }
}
