//! Canopy description: leaf facets and the flux they receive.

pub mod facet;
pub mod flux;

pub use facet::{Facet, LeafAttributes};
pub use flux::{FluxLedger, FluxSink, LightType, PhotonFlux, Side, TraceStats};
