pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use config::{SimulationConfig, StarvationPolicy};
pub use error::{EcoError, Result};
pub use registry::TypeRegistry;
