pub mod context;
pub mod diagnostics;
pub mod eating;
pub mod exchange;
pub mod lifecycle;
pub mod output;
pub mod pool;
pub mod tick;
pub mod world;

pub use context::{SimulationContext, SpeciesAggregate};
pub use diagnostics::{DeathRecord, DeathTally, Diagnostics};
pub use output::{SimulationOutput, TickSnapshot};
pub use pool::ResourcePool;
pub use tick::{run_simulation_tick, SimulationEvent};
pub use world::{Decomposition, EcoWorld};
