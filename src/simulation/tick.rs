//! Tick system - orchestrates simulation updates
//!
//! One tick runs these phases strictly in order:
//! aggregate refresh -> property evaluation -> resource exchange -> eating
//! -> growth -> reproduction -> death -> ageing and births
//!
//! Evaluation phases only read each instance plus the tick's
//! `SimulationContext` and fan out with rayon once the population reaches
//! `parallel_threshold`. Everything that touches shared state (the resource
//! pool, prey biomass, spawns, removals) is applied single-threaded in dense
//! instance order, which keeps runs reproducible for a given seed.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::types::{InstanceId, SpeciesIdx, Tick};
use crate::entity::actor::ActorArchetype;
use crate::rules::eval::DeathCause;
use crate::simulation::eating::resolve_eating;
use crate::simulation::exchange::{evaluate_properties, exchange_resources};
use crate::simulation::lifecycle::{apply_growth, finish_tick, resolve_deaths, resolve_reproduction};
use crate::simulation::world::EcoWorld;

/// Events generated during a simulation tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimulationEvent {
    Born {
        tick: Tick,
        id: InstanceId,
        species: SpeciesIdx,
        parent: InstanceId,
    },
    Died {
        tick: Tick,
        id: InstanceId,
        species: SpeciesIdx,
        cause: DeathCause,
    },
}

/// Run a single simulation tick
///
/// Returns the births and deaths that happened during the tick.
pub fn run_simulation_tick(world: &mut EcoWorld) -> Vec<SimulationEvent> {
    let mut events = Vec::new();

    world.actors.clear_scratch();
    world.prey_tables.refresh(&world.rules);

    let ctx = world.build_context();

    evaluate_properties(world, &ctx);
    exchange_resources(world);
    resolve_eating(world, &mut events);
    apply_growth(world, &ctx);
    let offspring = resolve_reproduction(world, &ctx);
    resolve_deaths(world, &mut events);
    finish_tick(world, offspring, &mut events);

    let snapshot = world.snapshot();
    tracing::debug!(
        "Tick {}: {} instances, {:.1} total mass",
        snapshot.tick,
        snapshot.species.iter().map(|s| s.population).sum::<u32>(),
        snapshot.species.iter().map(|s| s.total_mass).sum::<f32>()
    );
    if world.config.record_history {
        if world.history.len() >= world.config.history_capacity {
            world.history.pop_front();
        }
        world.history.push_back(snapshot);
    }

    events
}

/// Evaluate `f` for every live instance, `default` for dead slots
///
/// Goes parallel once the archetype holds `threshold` instances. Output order
/// always matches instance order.
pub(crate) fn map_living<T, F>(actors: &ActorArchetype, threshold: usize, default: T, f: F) -> Vec<T>
where
    T: Clone + Send + Sync,
    F: Fn(usize) -> T + Send + Sync,
{
    let eval = |idx: usize| {
        if actors.is_alive(idx) {
            f(idx)
        } else {
            default.clone()
        }
    };
    let count = actors.count();
    if count >= threshold {
        (0..count).into_par_iter().map(eval).collect()
    } else {
        (0..count).map(eval).collect()
    }
}
