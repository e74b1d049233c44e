//! Scenario files - everything needed to start a run
//!
//! A scenario is one TOML document:
//!
//! ```toml
//! [header]
//! name = "Kelp forest"
//! seed = 42
//! ticks = 200
//!
//! [[resource]]
//! code = "NUTR"
//! initial = 500.0
//!
//! [[species]]
//! code = "KELP"
//! # ...
//!
//! [population]
//! KELP = 50
//! ```

pub mod qualitative;

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::error::{EcoError, Result};
use crate::core::registry::TypeRegistry;
use crate::core::types::{Code, IdentifierKind};
use crate::rules::book::RuleBook;
use crate::rules::config::SpeciesConfig;
use crate::simulation::pool::ResourcePool;
use crate::simulation::world::{Decomposition, EcoWorld};

pub use qualitative::{apply_qualitative, snap_to_ladder};

fn default_tick_duration() -> f32 {
    1.0
}

fn default_variance() -> f32 {
    0.1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioHeader {
    pub name: String,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub ticks: u64,
    /// Real-world time one tick stands for, in days
    #[serde(default = "default_tick_duration")]
    pub tick_duration: f32,
    #[serde(default)]
    pub qualitative: bool,
    /// Relative spread of qualitative thresholds
    #[serde(default = "default_variance")]
    pub qualitative_variance: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub code: Code,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub initial: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub code: Code,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub initial: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecompositionSpec {
    pub resource: Code,
    pub fraction: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub header: ScenarioHeader,
    #[serde(default)]
    pub engine: SimulationConfig,
    #[serde(default, rename = "resource")]
    pub resources: Vec<ResourceSpec>,
    #[serde(default, rename = "property")]
    pub properties: Vec<PropertySpec>,
    #[serde(default)]
    pub species: Vec<SpeciesConfig>,
    /// Initial instance count per species code
    #[serde(default)]
    pub population: BTreeMap<Code, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decomposition: Option<DecompositionSpec>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Header and configuration as a TOML document `from_toml_str` accepts
    pub fn export(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Register every identifier in declaration order, rejecting repeats
    pub fn build_registry(&self) -> Result<TypeRegistry> {
        let mut registry = TypeRegistry::new();

        let mut seen = HashSet::new();
        for resource in &self.resources {
            if !seen.insert(resource.code) {
                return Err(EcoError::DuplicateIdentifier {
                    kind: IdentifierKind::Resource,
                    code: resource.code,
                });
            }
            registry.register_resource(resource.code)?;
        }

        seen.clear();
        for property in &self.properties {
            if !seen.insert(property.code) {
                return Err(EcoError::DuplicateIdentifier {
                    kind: IdentifierKind::Property,
                    code: property.code,
                });
            }
            registry.register_property(property.code)?;
        }

        seen.clear();
        for species in &self.species {
            if !seen.insert(species.code) {
                return Err(EcoError::DuplicateIdentifier {
                    kind: IdentifierKind::Species,
                    code: species.code,
                });
            }
            registry.register_species(species.code)?;
        }

        Ok(registry)
    }

    fn validate_environment(&self) -> Result<()> {
        for resource in &self.resources {
            if !resource.initial.is_finite() || resource.initial < 0.0 {
                return Err(EcoError::InvalidScenario(format!(
                    "resource {} has invalid initial level {}",
                    resource.code, resource.initial
                )));
            }
            if let Some(capacity) = resource.capacity {
                if !capacity.is_finite() || capacity < resource.initial {
                    return Err(EcoError::InvalidScenario(format!(
                        "resource {} capacity {} is below its initial level",
                        resource.code, capacity
                    )));
                }
            }
        }
        for property in &self.properties {
            if !property.initial.is_finite() {
                return Err(EcoError::InvalidScenario(format!(
                    "property {} has non-finite initial value",
                    property.code
                )));
            }
        }
        if let Some(decomposition) = &self.decomposition {
            if !(0.0..=1.0).contains(&decomposition.fraction) {
                return Err(EcoError::InvalidScenario(format!(
                    "decomposition fraction {} outside [0, 1]",
                    decomposition.fraction
                )));
            }
        }
        Ok(())
    }

    /// Validate everything and build a world ready to tick
    ///
    /// The scenario seed drives one RNG for the whole run: qualitative
    /// thresholds are drawn first, then initial jitter offsets in species
    /// declaration order.
    pub fn build_world(&self) -> Result<EcoWorld> {
        self.validate_environment()?;
        let registry = self.build_registry()?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.header.seed);
        let mut species = self.species.clone();
        if self.header.qualitative {
            apply_qualitative(&mut species, &mut rng, self.header.qualitative_variance);
        }
        let rules = RuleBook::build(species, &registry)?;

        let pool = ResourcePool::new(
            self.resources.iter().map(|r| r.initial).collect(),
            self.resources.iter().map(|r| r.capacity).collect(),
        );
        let properties = self.properties.iter().map(|p| p.initial).collect();

        let decomposition = self
            .decomposition
            .map(|d| -> Result<Decomposition> {
                Ok(Decomposition {
                    resource: registry.resolve_resource(d.resource)?,
                    fraction: d.fraction,
                })
            })
            .transpose()?;

        for &code in self.population.keys() {
            registry.resolve_species(code)?;
        }

        let mut world = EcoWorld::new(registry, rules, pool, properties, self.engine.clone(), rng)?;
        world.name = self.header.name.clone();
        world.seed = self.header.seed;
        world.set_decomposition(decomposition);

        for config in &self.species {
            let count = self.population.get(&config.code).copied().unwrap_or(0);
            if count == 0 {
                continue;
            }
            let idx = world.registry().resolve_species(config.code)?;
            world.spawn_population(idx, count);
        }

        tracing::info!(
            "Loaded scenario '{}': {} species, {} resources, {} properties, {} instances",
            self.header.name,
            self.species.len(),
            self.resources.len(),
            self.properties.len(),
            world.actors().count()
        );
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"
[header]
name = "Tide pool"
seed = 3
ticks = 10

[engine]
starvation_policy = "cumulative"

[[resource]]
code = "NUTR"
initial = 100.0
capacity = 200.0

[[property]]
code = "TEMP"
initial = 12.0

[[species]]
code = "KELP"
flags = ["herd"]
max_instances = 20

[species.growth]
starting_mass = 5.0
max_mass = 30.0
interval = 2
min_growth = 1.0

[[species]]
code = "URCH"

[species.growth]
starting_mass = 1.0
max_mass = 6.0

[species.eating]
base_bite_size = 1.0
edible = [{ species = "KELP", conversion_rate = 0.5 }]

[population]
KELP = 4
URCH = 2

[decomposition]
resource = "NUTR"
fraction = 0.25
"#;

    fn code(s: &str) -> Code {
        Code::new(s).unwrap()
    }

    #[test]
    fn test_parse_and_build() {
        let scenario = Scenario::from_toml_str(SMALL).unwrap();
        assert_eq!(scenario.header.tick_duration, 1.0);
        assert!(!scenario.header.qualitative);
        assert_eq!(scenario.resources[0].capacity, Some(200.0));

        let world = scenario.build_world().unwrap();
        assert_eq!(world.name, "Tide pool");
        assert_eq!(world.seed, 3);
        assert_eq!(world.population(world.registry().resolve_species(code("KELP")).unwrap()), 4);
        assert_eq!(world.actors().count(), 6);
        assert_eq!(world.properties(), &[12.0]);
        assert_eq!(
            world.config.starvation_policy,
            crate::core::config::StarvationPolicy::Cumulative
        );
        assert_eq!(world.decomposition.map(|d| d.fraction), Some(0.25));
    }

    #[test]
    fn test_same_seed_same_world() {
        let scenario = Scenario::from_toml_str(SMALL).unwrap();
        let a = scenario.build_world().unwrap();
        let b = scenario.build_world().unwrap();
        assert_eq!(a.actors().jitter_growth, b.actors().jitter_growth);
    }

    #[test]
    fn test_export_round_trips() {
        let scenario = Scenario::from_toml_str(SMALL).unwrap();
        let exported = scenario.export().unwrap();
        assert!(exported.contains("Tide pool"));
        let reloaded = Scenario::from_toml_str(&exported).unwrap();
        assert_eq!(reloaded, scenario);
    }

    #[test]
    fn test_duplicate_species_rejected() {
        let mut scenario = Scenario::from_toml_str(SMALL).unwrap();
        let copy = scenario.species[0].clone();
        scenario.species.push(copy);
        assert!(matches!(
            scenario.build_world(),
            Err(EcoError::DuplicateIdentifier {
                kind: IdentifierKind::Species,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_population_species_rejected() {
        let mut scenario = Scenario::from_toml_str(SMALL).unwrap();
        scenario.population.insert(code("SHRK"), 1);
        assert!(matches!(
            scenario.build_world(),
            Err(EcoError::UnknownIdentifier { .. })
        ));
    }

    #[test]
    fn test_unknown_prey_rejected() {
        let content = SMALL.replace("species = \"KELP\", conversion_rate", "species = \"SHRK\", conversion_rate");
        let scenario = Scenario::from_toml_str(&content).unwrap();
        assert!(scenario.build_world().is_err());
    }

    #[test]
    fn test_bad_decomposition_fraction() {
        let mut scenario = Scenario::from_toml_str(SMALL).unwrap();
        scenario.decomposition = Some(DecompositionSpec {
            resource: code("NUTR"),
            fraction: 1.5,
        });
        assert!(matches!(scenario.build_world(), Err(EcoError::InvalidScenario(_))));
    }

    #[test]
    fn test_qualitative_mode_changes_thresholds() {
        let mut scenario = Scenario::from_toml_str(SMALL).unwrap();
        scenario.header.qualitative = true;
        scenario.header.qualitative_variance = 0.0;
        scenario.species[1].eating.base_bite_size = 1.7;
        let world = scenario.build_world().unwrap();
        let urchin = world.registry().resolve_species(code("URCH")).unwrap();
        assert_eq!(world.rules().rule(urchin).eating.base_bite_size, 2.0);
        assert_eq!(scenario.species[1].eating.base_bite_size, 1.7, "authored config untouched");
    }
}
