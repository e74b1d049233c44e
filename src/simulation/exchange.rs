//! Property sensing and shared resource exchange

use rayon::prelude::*;

use crate::core::types::PropertyMask;
use crate::entity::actor::{update_starvation_counter, ScratchFlags};
use crate::simulation::context::SimulationContext;
use crate::simulation::tick::map_living;
use crate::simulation::world::EcoWorld;

/// Phase 2: refresh every live instance's property mask and property
/// starvation counters
pub(crate) fn evaluate_properties(world: &mut EcoWorld, ctx: &SimulationContext) {
    let rules = world.rules.rules();
    let actors = &world.actors;
    let masks = map_living(actors, world.config.parallel_threshold, PropertyMask::ALL, |idx| {
        rules[actors.species[idx].index()].evaluate_properties(actors.masses[idx], ctx)
    });

    let policy = world.config.starvation_policy;
    for (idx, mask) in masks.into_iter().enumerate() {
        if !world.actors.is_alive(idx) {
            continue;
        }
        world.actors.met_properties[idx] = mask;
        let species = world.actors.species[idx];
        let counters = world.actors.property_starvation_mut(idx);
        for threshold in &world.rules.rule(species).desired_properties {
            let slot = &mut counters[threshold.property.index()];
            update_starvation_counter(slot, mask.is_met(threshold.property), policy);
        }
    }
}

/// Phase 3: size every instance's demand and production from its mass,
/// debit demands from the pool, then credit production
///
/// Demands are served in instance order. Production is credited after all
/// demands so nothing produced this tick is eaten this tick.
pub(crate) fn exchange_resources(world: &mut EcoWorld) {
    let slots = world.actors.resource_slots();
    if slots == 0 {
        return;
    }

    {
        let rules = world.rules.rules();
        let alive: Vec<bool> = (0..world.actors.count()).map(|i| world.actors.is_alive(i)).collect();
        let actors = &mut world.actors;
        let species = &actors.species;
        let masses = &actors.masses;
        let setup = |(idx, (desired, producing)): (usize, (&mut [f32], &mut [f32]))| {
            if alive[idx] {
                rules[species[idx].index()].setup_resource_exchange(masses[idx], desired, producing);
            }
        };
        if actors.ids.len() >= world.config.parallel_threshold {
            actors
                .desired_resources
                .par_chunks_mut(slots)
                .zip(actors.producing_resources.par_chunks_mut(slots))
                .enumerate()
                .for_each(setup);
        } else {
            actors
                .desired_resources
                .chunks_mut(slots)
                .zip(actors.producing_resources.chunks_mut(slots))
                .enumerate()
                .for_each(setup);
        }
    }

    let policy = world.config.starvation_policy;
    let count = world.actors.count();

    for idx in 0..count {
        if !world.actors.is_alive(idx) {
            continue;
        }
        let rule = world.rules.rule(world.actors.species[idx]);
        let partial = rule.allows_partial_consumption();
        for amount in &rule.desired_resources {
            let resource = amount.resource;
            let need = world.actors.desired_resources[idx * slots + resource.index()];
            let met = need <= 0.0 || world.pool.try_remove(resource, need);
            if !met {
                if partial {
                    world.pool.remove(resource, need);
                }
                world.actors.scratch[idx].insert(ScratchFlags::RESOURCE_DEFICIT);
            }
            let counter = &mut world.actors.resource_starvation[idx * slots + resource.index()];
            update_starvation_counter(counter, met, policy);
        }
    }

    for idx in 0..count {
        if !world.actors.is_alive(idx) {
            continue;
        }
        let rule = world.rules.rule(world.actors.species[idx]);
        for amount in &rule.producing_resources {
            let produced = world.actors.producing_resources[idx * slots + amount.resource.index()];
            world.pool.add(amount.resource, produced);
        }
    }
}
