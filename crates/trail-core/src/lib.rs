//! Stigmergic desire-path simulation on raster terrain.
//!
//! Travellers walk an ordered list of origin → destination edges. Each walk
//! follows the least-cost route over a blend of slope cost and a net-cost
//! overlay; the route deposits ground potential, and cells near high potential
//! become cheaper for everyone after. Trails emerge from the feedback.
pub mod chamfer;
pub mod config;
pub mod cost;
pub mod error;
pub mod grid;
pub mod line;
pub mod network;
pub mod simulation;
pub mod trace;
pub mod transform;

pub use config::{CostConfig, EdgeErrorPolicy, SimulationConfig};
pub use cost::{CostField, SlopeCost, StepCost, UniformCost};
pub use error::{BoundsError, ConfigError, EdgeError, Error, NumericalError, Result, TraceError};
pub use grid::{Cell, Grid};
pub use network::{Edge, PathRecord, Point, PointTable};
pub use simulation::{simulate, GroundPotentialSimulator, RunOutcome, SimulationOutput};
pub use trace::{trace, trace_batch};
pub use transform::{distance_to_mask, seed, transform, DistanceSurface};
