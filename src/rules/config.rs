//! Authored species configuration as it appears in scenario files
//!
//! Everything here refers to other items by `Code`. Integer fields are read
//! as `i64` so a negative cap or interval is reported as a configuration
//! error naming the field instead of a bare TOML type mismatch.

use serde::{Deserialize, Serialize};

use crate::core::types::Code;
use crate::rules::definition::Comparison;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleFlag {
    AllowPartialConsumption,
    Herd,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAmountConfig {
    pub resource: Code,
    #[serde(default)]
    pub base: f32,
    #[serde(default)]
    pub per_mass: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyThresholdConfig {
    pub property: Code,
    pub op: Comparison,
    #[serde(default)]
    pub base: f32,
    #[serde(default)]
    pub per_mass: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdibleConfig {
    pub species: Code,
    pub conversion_rate: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EatingConfig {
    pub edible: Vec<EdibleConfig>,
    pub base_bite_size: f32,
    pub bite_size_per_mass: f32,
    pub max_bite_size_multiplier: f32,
}

impl Default for EatingConfig {
    fn default() -> Self {
        Self {
            edible: Vec::new(),
            base_bite_size: 0.0,
            bite_size_per_mass: 0.0,
            max_bite_size_multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    pub starting_mass: f32,
    pub max_mass: f32,
    pub interval: i64,
    pub min_growth: f32,
    pub improved_growth: f32,
    pub resource_thresholds: Vec<ResourceAmountConfig>,
    pub property_thresholds: Vec<PropertyThresholdConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationGateConfig {
    pub species: Code,
    pub min_total_mass: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReproductionConfig {
    pub interval: i64,
    pub offspring_count: i64,
    pub min_age: i64,
    pub min_mass: f32,
    pub resource_thresholds: Vec<ResourceAmountConfig>,
    pub property_thresholds: Vec<PropertyThresholdConfig>,
    pub population_gate: Option<PopulationGateConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimitConfig {
    pub resource: Code,
    pub limit: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyLimitConfig {
    pub property: Code,
    pub limit: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeathConfig {
    pub max_age: i64,
    pub min_viable_mass: f32,
    pub mass_age_grace: i64,
    pub resource_limits: Vec<ResourceLimitConfig>,
    pub property_limits: Vec<PropertyLimitConfig>,
}

/// One species as authored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesConfig {
    pub code: Code,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub flags: Vec<RuleFlag>,
    #[serde(default)]
    pub max_instances: Option<i64>,
    #[serde(default)]
    pub desired_resources: Vec<ResourceAmountConfig>,
    #[serde(default)]
    pub producing_resources: Vec<ResourceAmountConfig>,
    #[serde(default)]
    pub desired_properties: Vec<PropertyThresholdConfig>,
    #[serde(default)]
    pub eating: EatingConfig,
    #[serde(default)]
    pub growth: GrowthConfig,
    #[serde(default)]
    pub reproduction: ReproductionConfig,
    #[serde(default)]
    pub death: DeathConfig,
}

impl SpeciesConfig {
    /// Empty config for a species code; every rule disabled
    pub fn new(code: Code) -> Self {
        Self {
            code,
            name: String::new(),
            flags: Vec::new(),
            max_instances: None,
            desired_resources: Vec::new(),
            producing_resources: Vec::new(),
            desired_properties: Vec::new(),
            eating: EatingConfig::default(),
            growth: GrowthConfig::default(),
            reproduction: ReproductionConfig::default(),
            death: DeathConfig::default(),
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.code.as_str()
        } else {
            &self.name
        }
    }
}
