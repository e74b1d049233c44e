//! Validate authored species configs and resolve them against the registry

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::core::error::{EcoError, Result};
use crate::core::registry::TypeRegistry;
use crate::core::types::Code;
use crate::rules::config::{
    PropertyThresholdConfig, ResourceAmountConfig, RuleFlag, SpeciesConfig,
};
use crate::rules::definition::{
    DeathRule, EatingRule, EdibleSpecies, GrowthRule, PopulationGate, PropertyThreshold,
    ReproductionRule, ResourceAmount, RuleDefinition, RuleFlags, StarvationLimit,
};

#[derive(Deserialize)]
struct SpeciesFile {
    #[serde(default)]
    species: Vec<SpeciesConfig>,
}

/// Load `[[species]]` tables from a standalone TOML file
pub fn load_species_file(path: &Path) -> Result<Vec<SpeciesConfig>> {
    let content = fs::read_to_string(path)?;
    parse_species_toml(&content)
}

pub fn parse_species_toml(content: &str) -> Result<Vec<SpeciesConfig>> {
    let file: SpeciesFile = toml::from_str(content)?;
    Ok(file.species)
}

/// Field checks that report which species and field is malformed
struct Check {
    species: Code,
}

impl Check {
    fn fail(&self, field: &'static str, reason: impl Into<String>) -> EcoError {
        EcoError::InvalidThreshold {
            species: self.species,
            field,
            reason: reason.into(),
        }
    }

    fn finite(&self, field: &'static str, value: f32) -> Result<f32> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(self.fail(field, format!("must be finite, got {}", value)))
        }
    }

    fn non_negative(&self, field: &'static str, value: f32) -> Result<f32> {
        let value = self.finite(field, value)?;
        if value < 0.0 {
            return Err(self.fail(field, format!("must not be negative, got {}", value)));
        }
        Ok(value)
    }

    fn count(&self, field: &'static str, value: i64) -> Result<u32> {
        u32::try_from(value)
            .map_err(|_| self.fail(field, format!("must be between 0 and {}, got {}", u32::MAX, value)))
    }

    fn amounts(
        &self,
        field: &'static str,
        configs: &[ResourceAmountConfig],
        registry: &TypeRegistry,
    ) -> Result<Vec<ResourceAmount>> {
        let mut out: Vec<ResourceAmount> = Vec::with_capacity(configs.len());
        for config in configs {
            let resource = registry.resolve_resource(config.resource)?;
            if out.iter().any(|a| a.resource == resource) {
                return Err(self.fail(field, format!("lists resource {} twice", config.resource)));
            }
            out.push(ResourceAmount {
                resource,
                base: self.non_negative(field, config.base)?,
                per_mass: self.non_negative(field, config.per_mass)?,
            });
        }
        Ok(out)
    }

    fn thresholds(
        &self,
        field: &'static str,
        configs: &[PropertyThresholdConfig],
        registry: &TypeRegistry,
    ) -> Result<Vec<PropertyThreshold>> {
        configs
            .iter()
            .map(|config| {
                Ok(PropertyThreshold {
                    property: registry.resolve_property(config.property)?,
                    op: config.op,
                    base: self.finite(field, config.base)?,
                    per_mass: self.finite(field, config.per_mass)?,
                })
            })
            .collect()
    }
}

/// Validate one species config and resolve every code it mentions
///
/// All species, resources and properties must already be registered. This is
/// the only place identifiers are resolved for rules.
pub fn resolve_species(config: &SpeciesConfig, registry: &TypeRegistry) -> Result<RuleDefinition> {
    let check = Check { species: config.code };
    let id = registry.resolve_species(config.code)?;

    let mut flags = RuleFlags::default();
    for flag in &config.flags {
        match flag {
            RuleFlag::AllowPartialConsumption => flags.insert(RuleFlags::ALLOW_PARTIAL_CONSUMPTION),
            RuleFlag::Herd => flags.insert(RuleFlags::HERD),
        }
    }

    let max_instances = config
        .max_instances
        .map(|cap| check.count("max_instances", cap))
        .transpose()?;

    let eating = {
        let cfg = &config.eating;
        let mut edible: Vec<EdibleSpecies> = Vec::with_capacity(cfg.edible.len());
        for entry in &cfg.edible {
            let prey = registry.resolve_species(entry.species)?;
            if edible.iter().any(|e| e.prey == prey) {
                return Err(check.fail("eating.edible", format!("lists species {} twice", entry.species)));
            }
            edible.push(EdibleSpecies {
                prey,
                conversion_rate: check.non_negative("eating.edible.conversion_rate", entry.conversion_rate)?,
            });
        }
        EatingRule {
            edible,
            base_bite_size: check.non_negative("eating.base_bite_size", cfg.base_bite_size)?,
            bite_size_per_mass: check.non_negative("eating.bite_size_per_mass", cfg.bite_size_per_mass)?,
            max_bite_size_multiplier: check
                .non_negative("eating.max_bite_size_multiplier", cfg.max_bite_size_multiplier)?,
        }
    };

    let growth = {
        let cfg = &config.growth;
        let rule = GrowthRule {
            starting_mass: check.non_negative("growth.starting_mass", cfg.starting_mass)?,
            max_mass: check.non_negative("growth.max_mass", cfg.max_mass)?,
            interval: check.count("growth.interval", cfg.interval)?,
            min_growth: check.non_negative("growth.min_growth", cfg.min_growth)?,
            improved_growth: check.non_negative("growth.improved_growth", cfg.improved_growth)?,
            resource_thresholds: check.amounts("growth.resource_thresholds", &cfg.resource_thresholds, registry)?,
            property_thresholds: check.thresholds("growth.property_thresholds", &cfg.property_thresholds, registry)?,
        };
        if rule.starting_mass > rule.max_mass {
            return Err(check.fail(
                "growth.max_mass",
                format!("{} is below starting_mass {}", rule.max_mass, rule.starting_mass),
            ));
        }
        rule
    };

    let reproduction = {
        let cfg = &config.reproduction;
        let population_gate = match &cfg.population_gate {
            Some(gate) => Some(PopulationGate {
                species: registry.resolve_species(gate.species)?,
                min_total_mass: check.non_negative("reproduction.population_gate.min_total_mass", gate.min_total_mass)?,
            }),
            None => None,
        };
        ReproductionRule {
            interval: check.count("reproduction.interval", cfg.interval)?,
            offspring_count: check.count("reproduction.offspring_count", cfg.offspring_count)?,
            min_age: check.count("reproduction.min_age", cfg.min_age)?,
            min_mass: check.non_negative("reproduction.min_mass", cfg.min_mass)?,
            resource_thresholds: check.amounts("reproduction.resource_thresholds", &cfg.resource_thresholds, registry)?,
            property_thresholds: check.thresholds("reproduction.property_thresholds", &cfg.property_thresholds, registry)?,
            population_gate,
        }
    };

    let death = {
        let cfg = &config.death;
        let mut resource_limits = Vec::with_capacity(cfg.resource_limits.len());
        for limit in &cfg.resource_limits {
            resource_limits.push(StarvationLimit {
                item: registry.resolve_resource(limit.resource)?,
                limit: check.count("death.resource_limits.limit", limit.limit)?,
            });
        }
        let mut property_limits = Vec::with_capacity(cfg.property_limits.len());
        for limit in &cfg.property_limits {
            property_limits.push(StarvationLimit {
                item: registry.resolve_property(limit.property)?,
                limit: check.count("death.property_limits.limit", limit.limit)?,
            });
        }
        DeathRule {
            max_age: check.count("death.max_age", cfg.max_age)?,
            min_viable_mass: check.non_negative("death.min_viable_mass", cfg.min_viable_mass)?,
            mass_age_grace: check.count("death.mass_age_grace", cfg.mass_age_grace)?,
            resource_limits,
            property_limits,
        }
    };

    Ok(RuleDefinition {
        id,
        code: config.code,
        name: config.display_name().to_string(),
        flags,
        max_instances,
        desired_resources: check.amounts("desired_resources", &config.desired_resources, registry)?,
        producing_resources: check.amounts("producing_resources", &config.producing_resources, registry)?,
        desired_properties: check.thresholds("desired_properties", &config.desired_properties, registry)?,
        eating,
        growth,
        reproduction,
        death,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{IdentifierKind, SpeciesIdx};

    fn code(s: &str) -> Code {
        Code::new(s).unwrap()
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register_resource(code("NUTR")).unwrap();
        registry.register_property(code("TEMP")).unwrap();
        registry.register_species(code("KELP")).unwrap();
        registry.register_species(code("URCH")).unwrap();
        registry
    }

    const URCHIN: &str = r#"
        [[species]]
        code = "URCH"
        name = "Urchin"
        flags = ["allow_partial_consumption"]
        max_instances = 40

        [[species.desired_resources]]
        resource = "NUTR"
        base = 0.5
        per_mass = 0.01

        [species.eating]
        base_bite_size = 1.0
        edible = [{ species = "KELP", conversion_rate = 0.5 }]

        [species.growth]
        starting_mass = 2.0
        max_mass = 8.0
        interval = 3
        min_growth = 0.5

        [species.reproduction]
        interval = 10
        offspring_count = 2
        min_age = 5
        population_gate = { species = "KELP", min_total_mass = 100.0 }

        [species.death]
        max_age = 200
        resource_limits = [{ resource = "NUTR", limit = 5 }]
        property_limits = [{ property = "TEMP", limit = 3 }]
    "#;

    #[test]
    fn test_resolves_codes_to_indices() {
        let configs = parse_species_toml(URCHIN).unwrap();
        let rule = resolve_species(&configs[0], &registry()).unwrap();

        assert_eq!(rule.id, SpeciesIdx(1));
        assert_eq!(rule.name, "Urchin");
        assert!(rule.allows_partial_consumption());
        assert!(!rule.is_herd());
        assert_eq!(rule.max_instances, Some(40));
        assert_eq!(rule.eating.edible[0].prey, SpeciesIdx(0));
        assert_eq!(rule.growth.interval, 3);
        assert_eq!(rule.reproduction.population_gate.unwrap().species, SpeciesIdx(0));
        assert_eq!(rule.death.resource_limits[0].limit, 5);
        assert_eq!(rule.death.property_limits[0].limit, 3);
    }

    #[test]
    fn test_unknown_identifier_rejected() {
        let mut config = SpeciesConfig::new(code("URCH"));
        config.eating.edible.push(crate::rules::config::EdibleConfig {
            species: code("OTTR"),
            conversion_rate: 0.5,
        });
        let err = resolve_species(&config, &registry()).unwrap_err();
        assert!(matches!(
            err,
            EcoError::UnknownIdentifier { kind: IdentifierKind::Species, .. }
        ));
    }

    #[test]
    fn test_negative_cap_rejected() {
        let mut config = SpeciesConfig::new(code("KELP"));
        config.max_instances = Some(-1);
        let err = resolve_species(&config, &registry()).unwrap_err();
        assert!(matches!(
            err,
            EcoError::InvalidThreshold { field: "max_instances", .. }
        ));
    }

    #[test]
    fn test_starting_mass_above_max_rejected() {
        let mut config = SpeciesConfig::new(code("KELP"));
        config.growth.starting_mass = 20.0;
        config.growth.max_mass = 10.0;
        assert!(resolve_species(&config, &registry()).is_err());
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut config = SpeciesConfig::new(code("KELP"));
        config.growth.min_growth = f32::NAN;
        assert!(resolve_species(&config, &registry()).is_err());
    }

    #[test]
    fn test_duplicate_resource_rejected() {
        let mut config = SpeciesConfig::new(code("KELP"));
        for _ in 0..2 {
            config.desired_resources.push(ResourceAmountConfig {
                resource: code("NUTR"),
                base: 1.0,
                per_mass: 0.0,
            });
        }
        assert!(matches!(
            resolve_species(&config, &registry()),
            Err(EcoError::InvalidThreshold { field: "desired_resources", .. })
        ));
    }
}
