//! Species rules: authored configs, resolved definitions and their evaluators

pub mod book;
pub mod config;
pub mod definition;
pub mod eval;
pub mod loader;

pub use book::RuleBook;
pub use config::SpeciesConfig;
pub use definition::{Comparison, RuleDefinition, RuleFlags};
pub use eval::{BiteSize, DeathCause, GrowthVerdict, ReproductionVerdict, Unmet};
pub use loader::{load_species_file, parse_species_toml, resolve_species};
