use log::debug;
use serde::{Deserialize, Serialize};

use crate::Vector;

use super::solar::SolarPosition;

/// Light conditions of one simulated hour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyCondition {
    /// Local solar hour the condition belongs to.
    pub hour: f64,
    /// Unit direction of light travel. None when the sun is down.
    pub direction: Option<Vector>,
    /// Direct beam irradiance on a horizontal surface.
    pub direct: f64,
    /// Diffuse sky irradiance on a horizontal surface.
    pub diffuse: f64,
}

/// Source of per-hour light conditions.
pub trait Climate {
    /// Number of simulated hour slots.
    fn num_hours(&self) -> usize;

    /// Conditions of hour slot `slot`, `0 <= slot < num_hours()`.
    fn sky(&self, slot: usize) -> SkyCondition;
}

/// Irradiance measured or modelled for one hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourlyIrradiance {
    /// Local solar hour, 12 is solar noon.
    pub hour: f64,
    pub direct: f64,
    pub diffuse: f64,
}

/// Sun direction from the solar position, irradiance from the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolarClimate {
    /// Degrees, positive north.
    pub latitude: f64,
    pub day_of_year: u16,
    pub hours: Vec<HourlyIrradiance>,
}

impl Default for SolarClimate {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            day_of_year: 172,
            hours: Vec::new(),
        }
    }
}

impl SolarClimate {
    pub fn new(latitude: f64, day_of_year: u16) -> Self {
        Self {
            latitude,
            day_of_year,
            hours: Vec::new(),
        }
    }

    /// Appends one hour of irradiance.
    pub fn with_hour(mut self, hour: f64, direct: f64, diffuse: f64) -> Self {
        self.hours.push(HourlyIrradiance {
            hour,
            direct,
            diffuse,
        });
        self
    }
}

impl Climate for SolarClimate {
    fn num_hours(&self) -> usize {
        self.hours.len()
    }

    fn sky(&self, slot: usize) -> SkyCondition {
        let entry = self.hours[slot];
        let sun = SolarPosition::at(self.latitude, self.day_of_year, entry.hour);
        debug!(
            "Hour {}: sun elevation {:.2} deg, azimuth {:.2} deg",
            entry.hour,
            sun.elevation.to_degrees(),
            sun.azimuth.to_degrees()
        );
        SkyCondition {
            hour: entry.hour,
            direction: sun.light_direction(),
            direct: entry.direct,
            diffuse: entry.diffuse,
        }
    }
}

/// Fixed light direction for every hour.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedClimate {
    direction: Option<Vector>,
    hours: Vec<HourlyIrradiance>,
}

impl FixedClimate {
    /// Light travelling along `direction` with one hour of irradiance.
    ///
    /// A direction without a downward component carries no direct beam.
    pub fn new(direction: Vector, direct: f64, diffuse: f64) -> Self {
        let direction = direction.normalize().filter(|d| d.dz < 0.0);
        Self {
            direction,
            hours: vec![HourlyIrradiance {
                hour: 12.0,
                direct,
                diffuse,
            }],
        }
    }

    /// Adds another hour slot with the same direction.
    pub fn with_hour(mut self, hour: f64, direct: f64, diffuse: f64) -> Self {
        self.hours.push(HourlyIrradiance {
            hour,
            direct,
            diffuse,
        });
        self
    }
}

impl Climate for FixedClimate {
    fn num_hours(&self) -> usize {
        self.hours.len()
    }

    fn sky(&self, slot: usize) -> SkyCondition {
        let entry = self.hours[slot];
        SkyCondition {
            hour: entry.hour,
            direction: self.direction,
            direct: entry.direct,
            diffuse: entry.diffuse,
        }
    }
}
