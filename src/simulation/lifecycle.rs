//! Growth, reproduction, death and ageing phases

use crate::core::types::{InstanceId, SpeciesIdx};
use crate::entity::actor::ScratchFlags;
use crate::simulation::context::SimulationContext;
use crate::simulation::diagnostics::DeathRecord;
use crate::simulation::tick::{map_living, SimulationEvent};
use crate::simulation::world::EcoWorld;

/// An offspring waiting to be inserted at the end of the tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingBirth {
    pub species: SpeciesIdx,
    pub parent: InstanceId,
}

/// Phase 5: grow every instance whose growth interval fires this tick
pub(crate) fn apply_growth(world: &mut EcoWorld, ctx: &SimulationContext) {
    let rules = world.rules.rules();
    let actors = &world.actors;
    let amounts = map_living(actors, world.config.parallel_threshold, 0.0, |idx| {
        let row = actors.row(idx);
        rules[row.species.index()].predict_growth(&row, ctx)
    });

    for (idx, amount) in amounts.into_iter().enumerate() {
        if amount <= 0.0 {
            continue;
        }
        let rule = world.rules.rule(world.actors.species[idx]);
        rule.apply_growth(&mut world.actors.masses[idx], amount);
    }
}

/// Phase 6: decide which instances reproduce and queue their offspring
///
/// Offspring are held back until the end of the tick so they are never
/// evaluated in the tick they were born. Each species' cap is checked
/// against its live count plus offspring already queued this tick.
pub(crate) fn resolve_reproduction(world: &mut EcoWorld, ctx: &SimulationContext) -> Vec<PendingBirth> {
    let rules = world.rules.rules();
    let actors = &world.actors;
    let ready = map_living(actors, world.config.parallel_threshold, false, |idx| {
        let row = actors.row(idx);
        rules[row.species.index()].should_reproduce(&row, ctx)
    });
    if !ready.iter().any(|&r| r) {
        return Vec::new();
    }

    let mut live = vec![0u32; world.registry.species_count()];
    for idx in world.actors.iter_living() {
        live[world.actors.species[idx].index()] += 1;
    }

    let mut births = Vec::new();
    for idx in (0..ready.len()).filter(|&i| ready[i]) {
        let species = world.actors.species[idx];
        let rule = world.rules.rule(species);
        let room = rule.room_left(live[species.index()]);
        let count = rule.reproduction.offspring_count.min(room);
        if count == 0 {
            tracing::trace!("{} at max_instances, skipping reproduction", rule.code);
            continue;
        }

        let parent = world.actors.ids[idx];
        for _ in 0..count {
            births.push(PendingBirth { species, parent });
        }
        live[species.index()] += count;
        world.actors.scratch[idx].insert(ScratchFlags::QUEUED_TO_REPRODUCE | ScratchFlags::DONE_FOR_TICK);
    }
    births
}

/// Phase 7: kill every instance with a natural cause of death, then sweep
/// the dead (including anything eaten earlier this tick) out of the arrays
pub(crate) fn resolve_deaths(world: &mut EcoWorld, events: &mut Vec<SimulationEvent>) {
    let rules = world.rules.rules();
    let actors = &world.actors;
    let causes = map_living(actors, world.config.parallel_threshold, None, |idx| {
        let row = actors.row(idx);
        rules[row.species.index()].death_cause(&row)
    });

    let tick = world.current_tick;
    for (idx, cause) in causes.into_iter().enumerate() {
        let Some(cause) = cause else { continue };
        world.actors.kill(idx);
        let record = DeathRecord {
            id: world.actors.ids[idx],
            species: world.actors.species[idx],
            tick,
            age: world.actors.ages[idx],
            mass: world.actors.masses[idx],
            cause,
        };
        tracing::trace!("Instance {:?} died: {:?}", record.id, cause);
        world.diagnostics.record_death(record);
        events.push(SimulationEvent::Died {
            tick,
            id: record.id,
            species: record.species,
            cause,
        });
    }

    let removed = world.actors.sweep_dead();
    if let Some(decomposition) = world.decomposition {
        let released: f32 = removed.iter().map(|r| r.mass * decomposition.fraction).sum();
        if released > 0.0 {
            world.pool.add(decomposition.resource, released);
        }
    }
}

/// Phase 8: age the survivors, insert queued offspring, advance the clock
pub(crate) fn finish_tick(world: &mut EcoWorld, births: Vec<PendingBirth>, events: &mut Vec<SimulationEvent>) {
    for age in &mut world.actors.ages {
        *age = age.saturating_add(1);
    }

    let tick = world.current_tick;
    for birth in births {
        let id = world.spawn_unchecked(birth.species);
        world.diagnostics.total_births += 1;
        events.push(SimulationEvent::Born {
            tick,
            id,
            species: birth.species,
            parent: birth.parent,
        });
    }

    world.current_tick += 1;
}
