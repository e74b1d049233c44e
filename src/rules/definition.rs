//! Resolved per-species rule definitions
//!
//! A `RuleDefinition` is the validated, index-resolved form of a
//! `SpeciesConfig`. It never changes during a tick; edits go through
//! `RuleBook::update_species` between ticks.

use serde::{Deserialize, Serialize};

use crate::core::types::{Code, PropertyIdx, ResourceIdx, SpeciesIdx};

/// Comparison applied between an environmental value and a threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    #[serde(alias = "<")]
    Less,
    #[serde(alias = "<=")]
    LessEqual,
    #[serde(alias = "==")]
    Equal,
    #[serde(alias = "!=")]
    NotEqual,
    #[serde(alias = ">=")]
    GreaterEqual,
    #[serde(alias = ">")]
    Greater,
}

impl Comparison {
    /// Evaluate `value <op> threshold`
    pub fn holds(self, value: f32, threshold: f32) -> bool {
        match self {
            Comparison::Less => value < threshold,
            Comparison::LessEqual => value <= threshold,
            Comparison::Equal => value == threshold,
            Comparison::NotEqual => value != threshold,
            Comparison::GreaterEqual => value >= threshold,
            Comparison::Greater => value > threshold,
        }
    }
}

/// Behaviour switches carried on a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleFlags(pub u8);

impl RuleFlags {
    /// Take whatever is left of a resource when the pool cannot cover demand
    pub const ALLOW_PARTIAL_CONSUMPTION: RuleFlags = RuleFlags(1 << 0);
    /// Predators eat from the whole population instead of one individual
    pub const HERD: RuleFlags = RuleFlags(1 << 1);

    pub fn contains(self, other: RuleFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: RuleFlags) {
        self.0 |= other.0;
    }
}

/// Amount of a resource scaled linearly with body mass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceAmount {
    pub resource: ResourceIdx,
    pub base: f32,
    pub per_mass: f32,
}

impl ResourceAmount {
    pub fn at(&self, mass: f32) -> f32 {
        self.base + self.per_mass * mass
    }
}

/// Environmental property threshold scaled linearly with body mass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropertyThreshold {
    pub property: PropertyIdx,
    pub op: Comparison,
    pub base: f32,
    pub per_mass: f32,
}

impl PropertyThreshold {
    pub fn threshold_at(&self, mass: f32) -> f32 {
        self.base + self.per_mass * mass
    }

    pub fn is_met(&self, value: f32, mass: f32) -> bool {
        self.op.holds(value, self.threshold_at(mass))
    }
}

/// A prey species and how efficiently its biomass converts into predator mass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdibleSpecies {
    pub prey: SpeciesIdx,
    pub conversion_rate: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EatingRule {
    pub edible: Vec<EdibleSpecies>,
    pub base_bite_size: f32,
    pub bite_size_per_mass: f32,
    pub max_bite_size_multiplier: f32,
}

impl EatingRule {
    pub fn eats_anything(&self) -> bool {
        self.edible.iter().any(|e| e.conversion_rate > 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GrowthRule {
    pub starting_mass: f32,
    pub max_mass: f32,
    /// Ticks between growth checks; 0 disables growth
    pub interval: u32,
    pub min_growth: f32,
    pub improved_growth: f32,
    /// All must be met (and at least one configured) to unlock `improved_growth`
    pub resource_thresholds: Vec<ResourceAmount>,
    pub property_thresholds: Vec<PropertyThreshold>,
}

/// Reproduction only happens while another species holds enough biomass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationGate {
    pub species: SpeciesIdx,
    pub min_total_mass: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReproductionRule {
    /// Ticks between reproduction checks; 0 disables reproduction
    pub interval: u32,
    pub offspring_count: u32,
    pub min_age: u32,
    pub min_mass: f32,
    pub resource_thresholds: Vec<ResourceAmount>,
    pub property_thresholds: Vec<PropertyThreshold>,
    pub population_gate: Option<PopulationGate>,
}

/// Starvation-counter limit for one tracked item; 0 disables it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarvationLimit<I> {
    pub item: I,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeathRule {
    /// 0 means no age limit
    pub max_age: u32,
    pub min_viable_mass: f32,
    /// Underweight deaths only apply from this age on; 0 applies them always
    pub mass_age_grace: u32,
    pub resource_limits: Vec<StarvationLimit<ResourceIdx>>,
    pub property_limits: Vec<StarvationLimit<PropertyIdx>>,
}

/// Complete rule set for one species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub id: SpeciesIdx,
    pub code: Code,
    pub name: String,
    pub flags: RuleFlags,
    /// None means uncapped
    pub max_instances: Option<u32>,
    pub desired_resources: Vec<ResourceAmount>,
    pub producing_resources: Vec<ResourceAmount>,
    pub desired_properties: Vec<PropertyThreshold>,
    pub eating: EatingRule,
    pub growth: GrowthRule,
    pub reproduction: ReproductionRule,
    pub death: DeathRule,
}

impl RuleDefinition {
    /// Minimal rule with no requirements, used as a base by tests and tools
    pub fn bare(id: SpeciesIdx, code: Code) -> Self {
        Self {
            id,
            code,
            name: code.to_string(),
            flags: RuleFlags::default(),
            max_instances: None,
            desired_resources: Vec::new(),
            producing_resources: Vec::new(),
            desired_properties: Vec::new(),
            eating: EatingRule::default(),
            growth: GrowthRule::default(),
            reproduction: ReproductionRule::default(),
            death: DeathRule::default(),
        }
    }

    pub fn is_herd(&self) -> bool {
        self.flags.contains(RuleFlags::HERD)
    }

    pub fn allows_partial_consumption(&self) -> bool {
        self.flags.contains(RuleFlags::ALLOW_PARTIAL_CONSUMPTION)
    }

    /// Whether another live instance still fits under the population cap
    pub fn has_room(&self, live_count: u32) -> bool {
        self.max_instances.map_or(true, |cap| live_count < cap)
    }

    /// How many more instances fit under the cap
    pub fn room_left(&self, live_count: u32) -> u32 {
        self.max_instances
            .map_or(u32::MAX, |cap| cap.saturating_sub(live_count))
    }
}
