mod diameter_distribution;
mod metrics;
mod simulation;

pub use diameter_distribution::{DiameterClass, DiameterDistribution};
pub use metrics::{species_composition, SpeciesComposition, StandMetrics};
pub use simulation::{Simulation, SimulationReport};
