//! Individual-tree forest stand growth simulator.
//!
//! A [`Stand`](models::Stand) owns its trees and advances them one period at a
//! time: competition indices first, then blended small/large tree growth,
//! crown ratio updates and stochastic mortality. The
//! [`Simulation`](analysis::Simulation) driver records metrics each period.

pub mod analysis;
pub mod config;
pub mod error;
pub mod growth;
pub mod io;
pub mod models;
pub mod visualization;

pub use analysis::{Simulation, SimulationReport, StandMetrics};
pub use config::SimulationConfig;
pub use error::SimError;
pub use io::{MetricsWriter, TreeListReader};
pub use models::{CoefficientStore, SpeciesCoefficients, Stand, Tree, TreeRecord};
