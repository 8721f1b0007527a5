pub mod canopy;
pub mod embedded;
pub mod geom;
pub mod io;
pub mod sim;

// Prelude
pub use canopy::{Facet, LeafAttributes, LightType, Side};
pub use geom::point::Point;
pub use geom::ray::Ray;
pub use geom::vector::Vector;
pub use sim::engine::{Grid, LeafScattering, Microfacet};
pub use sim::lighting::{CanopySimulation, Climate, FixedClimate, SolarClimate, TracerConfig};
