//! Hourly canopy light simulation: sun, sky and primary ray lattices.

pub mod climate;
pub mod config;
pub mod result;
pub mod simulation;
pub mod solar;

pub use climate::{Climate, FixedClimate, HourlyIrradiance, SkyCondition, SolarClimate};
pub use config::{LightPlane, RunConfig, TracerConfig};
pub use result::{HourSummary, RunSummary};
pub use simulation::CanopySimulation;
pub use solar::SolarPosition;
