//! Versioned rule storage with a monotonic generation counter
//!
//! Live-tuning tools edit species between ticks through `update_species`.
//! Each accepted edit bumps `generation`; the driver compares it with the
//! generation it last built caches for and rebuilds only on change.

use crate::core::error::{EcoError, Result};
use crate::core::registry::TypeRegistry;
use crate::core::types::{Code, IdentifierKind, SpeciesIdx};
use crate::rules::config::SpeciesConfig;
use crate::rules::definition::RuleDefinition;
use crate::rules::loader::resolve_species;

#[derive(Debug, Clone)]
pub struct RuleBook {
    /// Indexed by `SpeciesIdx`
    configs: Vec<SpeciesConfig>,
    /// Indexed by `SpeciesIdx`
    rules: Vec<RuleDefinition>,
    generation: u64,
}

impl RuleBook {
    /// Validate and resolve every config
    ///
    /// Every registered species needs exactly one config.
    pub fn build(configs: Vec<SpeciesConfig>, registry: &TypeRegistry) -> Result<Self> {
        let mut slots: Vec<Option<SpeciesConfig>> = vec![None; registry.species_count()];
        for config in configs {
            let idx = registry.resolve_species(config.code)?;
            let slot = &mut slots[idx.index()];
            if slot.is_some() {
                return Err(EcoError::DuplicateIdentifier {
                    kind: IdentifierKind::Species,
                    code: config.code,
                });
            }
            *slot = Some(config);
        }

        let mut ordered = Vec::with_capacity(slots.len());
        for (i, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(config) => ordered.push(config),
                None => {
                    let code = registry.species_codes()[i];
                    return Err(EcoError::InvalidScenario(format!(
                        "species {} is registered but has no rule configuration",
                        code
                    )));
                }
            }
        }

        let rules = ordered
            .iter()
            .map(|config| resolve_species(config, registry))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            configs: ordered,
            rules,
            generation: 0,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rule(&self, species: SpeciesIdx) -> &RuleDefinition {
        &self.rules[species.index()]
    }

    pub fn rules(&self) -> &[RuleDefinition] {
        &self.rules
    }

    pub fn config(&self, species: SpeciesIdx) -> &SpeciesConfig {
        &self.configs[species.index()]
    }

    pub fn configs(&self) -> &[SpeciesConfig] {
        &self.configs
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Replace one species' configuration
    ///
    /// The new config is validated and resolved before anything changes; on
    /// error the previous rule stays active and the generation is unchanged.
    pub fn update_species(&mut self, config: SpeciesConfig, registry: &TypeRegistry) -> Result<u64> {
        let idx = registry.resolve_species(config.code)?;
        let rule = resolve_species(&config, registry)?;
        self.configs[idx.index()] = config;
        self.rules[idx.index()] = rule;
        self.generation += 1;
        Ok(self.generation)
    }

    /// Edit a species config in place through a closure, then re-validate
    pub fn edit_species<F>(&mut self, code: Code, registry: &TypeRegistry, edit: F) -> Result<u64>
    where
        F: FnOnce(&mut SpeciesConfig),
    {
        let idx = registry.resolve_species(code)?;
        let mut config = self.configs[idx.index()].clone();
        edit(&mut config);
        if config.code != code {
            return Err(EcoError::InvalidScenario(format!(
                "species code cannot change during an edit ({} -> {})",
                code, config.code
            )));
        }
        self.update_species(config, registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> Code {
        Code::new(s).unwrap()
    }

    fn setup() -> (TypeRegistry, Vec<SpeciesConfig>) {
        let mut registry = TypeRegistry::new();
        registry.register_species(code("KELP")).unwrap();
        registry.register_species(code("URCH")).unwrap();
        // Authored out of registry order on purpose
        let configs = vec![SpeciesConfig::new(code("URCH")), SpeciesConfig::new(code("KELP"))];
        (registry, configs)
    }

    #[test]
    fn test_build_orders_by_registry() {
        let (registry, configs) = setup();
        let book = RuleBook::build(configs, &registry).unwrap();
        assert_eq!(book.len(), 2);
        assert_eq!(book.rule(SpeciesIdx(0)).code, code("KELP"));
        assert_eq!(book.rule(SpeciesIdx(1)).code, code("URCH"));
        assert_eq!(book.generation(), 0);
    }

    #[test]
    fn test_missing_config_rejected() {
        let (registry, mut configs) = setup();
        configs.pop();
        assert!(matches!(
            RuleBook::build(configs, &registry),
            Err(EcoError::InvalidScenario(_))
        ));
    }

    #[test]
    fn test_duplicate_config_rejected() {
        let (registry, mut configs) = setup();
        configs.push(SpeciesConfig::new(code("KELP")));
        assert!(matches!(
            RuleBook::build(configs, &registry),
            Err(EcoError::DuplicateIdentifier { .. })
        ));
    }

    #[test]
    fn test_edit_bumps_generation() {
        let (registry, configs) = setup();
        let mut book = RuleBook::build(configs, &registry).unwrap();

        let generation = book
            .edit_species(code("KELP"), &registry, |c| c.growth.max_mass = 80.0)
            .unwrap();
        assert_eq!(generation, 1);
        assert_eq!(book.rule(SpeciesIdx(0)).growth.max_mass, 80.0);
        assert_eq!(book.config(SpeciesIdx(0)).growth.max_mass, 80.0);
    }

    #[test]
    fn test_rejected_edit_keeps_previous_rule() {
        let (registry, configs) = setup();
        let mut book = RuleBook::build(configs, &registry).unwrap();

        let result = book.edit_species(code("URCH"), &registry, |c| c.max_instances = Some(-5));
        assert!(result.is_err());
        assert_eq!(book.generation(), 0);
        assert_eq!(book.rule(SpeciesIdx(1)).max_instances, None);
        assert_eq!(book.config(SpeciesIdx(1)).max_instances, None);
    }
}
