//! Per-tick snapshots and run output

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::{Code, Tick};
use crate::simulation::context::compute_aggregates;
use crate::simulation::diagnostics::DeathTally;
use crate::simulation::world::EcoWorld;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesSnapshot {
    pub code: Code,
    pub population: u32,
    pub total_mass: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceLevel {
    pub code: Code,
    pub level: f32,
}

/// Population and pool state after a tick, in registry order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickSnapshot {
    /// Ticks completed when the snapshot was taken
    pub tick: Tick,
    pub species: Vec<SpeciesSnapshot>,
    pub resources: Vec<ResourceLevel>,
}

impl TickSnapshot {
    pub fn capture(world: &EcoWorld) -> Self {
        let registry = world.registry();
        let aggregates = compute_aggregates(world.actors(), registry.species_count());
        let species = registry
            .species_codes()
            .iter()
            .zip(aggregates)
            .map(|(&code, aggregate)| SpeciesSnapshot {
                code,
                population: aggregate.population,
                total_mass: aggregate.total_mass,
            })
            .collect();
        let resources = registry
            .resource_codes()
            .iter()
            .zip(world.pool().levels())
            .map(|(&code, &level)| ResourceLevel { code, level })
            .collect();

        Self {
            tick: world.current_tick,
            species,
            resources,
        }
    }

    pub fn population_of(&self, code: Code) -> Option<u32> {
        self.species
            .iter()
            .find(|s| s.code == code)
            .map(|s| s.population)
    }
}

/// Complete simulation output
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub name: String,
    pub seed: u64,
    pub history: Vec<TickSnapshot>,
    pub final_snapshot: TickSnapshot,
    pub statistics: SimulationStats,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationStats {
    pub ticks_simulated: u64,
    pub simulation_time_ms: u64,
    pub total_births: u64,
    pub total_deaths: u64,
    pub deaths: DeathTally,
    pub species_extinct: u32,
}

impl SimulationOutput {
    pub fn new(world: &EcoWorld, ticks: u64, elapsed: Duration) -> Self {
        let final_snapshot = world.snapshot();
        let diagnostics = world.diagnostics();
        let species_extinct = final_snapshot
            .species
            .iter()
            .filter(|s| s.population == 0)
            .count() as u32;

        Self {
            name: world.name.clone(),
            seed: world.seed,
            history: world.history().iter().cloned().collect(),
            final_snapshot,
            statistics: SimulationStats {
                ticks_simulated: ticks,
                simulation_time_ms: elapsed.as_millis() as u64,
                total_births: diagnostics.total_births,
                total_deaths: diagnostics.tally.total(),
                deaths: diagnostics.tally,
                species_extinct,
            },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn summary(&self) -> String {
        let populations: Vec<String> = self
            .final_snapshot
            .species
            .iter()
            .map(|s| format!("{}={}", s.code, s.population))
            .collect();
        format!(
            "Simulated {} ticks in {}ms: {} births, {} deaths ({} eaten), {} species extinct [{}]",
            self.statistics.ticks_simulated,
            self.statistics.simulation_time_ms,
            self.statistics.total_births,
            self.statistics.total_deaths,
            self.statistics.deaths.consumed,
            self.statistics.species_extinct,
            populations.join(" "),
        )
    }
}
