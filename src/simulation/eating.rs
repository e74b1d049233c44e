//! Eating resolution - predators take biomass from prey species
//!
//! Each eater picks one prey species per tick, weighted by its conversion
//! rate among species that still have something it can eat. Herd prey lose
//! the bite across the whole population in proportion to body mass;
//! otherwise one individual small enough to attack is drawn at random.

use rand::Rng;

use crate::core::types::{SpeciesIdx, Tick};
use crate::entity::actor::ScratchFlags;
use crate::rules::book::RuleBook;
use crate::rules::eval::DeathCause;
use crate::simulation::diagnostics::DeathRecord;
use crate::simulation::tick::SimulationEvent;
use crate::simulation::world::EcoWorld;

/// Prey below this mass is treated as fully eaten
const CONSUMED_EPSILON: f32 = 1e-4;

/// Edible species per predator, rebuilt only when the rule book changes
#[derive(Debug, Clone, Default)]
pub struct PreyTables {
    generation: Option<u64>,
    by_predator: Vec<Vec<(SpeciesIdx, f32)>>,
}

impl PreyTables {
    pub fn refresh(&mut self, rules: &RuleBook) {
        if self.generation == Some(rules.generation()) && self.by_predator.len() == rules.len() {
            return;
        }
        self.by_predator = rules
            .rules()
            .iter()
            .map(|rule| {
                rule.eating
                    .edible
                    .iter()
                    .filter(|e| e.conversion_rate > 0.0)
                    .map(|e| (e.prey, e.conversion_rate))
                    .collect()
            })
            .collect();
        self.generation = Some(rules.generation());
        tracing::debug!("Rebuilt prey tables for rule generation {}", rules.generation());
    }

    pub fn prey_of(&self, predator: SpeciesIdx) -> &[(SpeciesIdx, f32)] {
        self.by_predator
            .get(predator.index())
            .map_or(&[], |v| v.as_slice())
    }
}

/// Mutable view over the pieces of the world the eating phase touches
struct Feast<'w> {
    world: &'w mut EcoWorld,
    /// Live instance slots per species, fixed at phase start
    members: Vec<Vec<usize>>,
    /// Live biomass per species, kept current as mass moves
    available: Vec<f32>,
    tick: Tick,
}

impl Feast<'_> {
    fn prey_mass_excluding(&self, prey: SpeciesIdx, eater: usize) -> f32 {
        let mut total = self.available[prey.index()];
        if self.world.actors.species[eater] == prey && self.world.actors.is_alive(eater) {
            total -= self.world.actors.masses[eater];
        }
        total.max(0.0)
    }

    fn attackable(&self, prey: SpeciesIdx, eater: usize, max_size: f32) -> impl Iterator<Item = usize> + '_ {
        let actors = &self.world.actors;
        self.members[prey.index()]
            .iter()
            .copied()
            .filter(move |&j| j != eater && actors.is_alive(j) && actors.masses[j] > 0.0 && actors.masses[j] <= max_size)
    }

    fn has_food(&self, prey: SpeciesIdx, eater: usize, max_size: f32) -> bool {
        if self.world.rules.rule(prey).is_herd() {
            self.prey_mass_excluding(prey, eater) > 0.0
        } else {
            self.attackable(prey, eater, max_size).next().is_some()
        }
    }

    fn debit(&mut self, prey_idx: usize, amount: f32, events: &mut Vec<SimulationEvent>) -> f32 {
        let actors = &mut self.world.actors;
        let taken = amount.min(actors.masses[prey_idx]).max(0.0);
        actors.masses[prey_idx] -= taken;
        let species = actors.species[prey_idx];
        self.available[species.index()] -= taken;

        if actors.masses[prey_idx] <= CONSUMED_EPSILON {
            actors.masses[prey_idx] = 0.0;
            actors.kill(prey_idx);
            let record = DeathRecord {
                id: actors.ids[prey_idx],
                species,
                tick: self.tick,
                age: actors.ages[prey_idx],
                mass: 0.0,
                cause: DeathCause::Consumed,
            };
            tracing::trace!("Instance {:?} of {:?} consumed", record.id, species);
            self.world.diagnostics.record_death(record);
            events.push(SimulationEvent::Died {
                tick: self.tick,
                id: record.id,
                species,
                cause: DeathCause::Consumed,
            });
        }
        taken
    }

    /// Spread `want` over the herd in proportion to mass, returns mass taken
    fn graze_herd(&mut self, prey: SpeciesIdx, eater: usize, want: f32, events: &mut Vec<SimulationEvent>) -> f32 {
        let herd_mass = self.prey_mass_excluding(prey, eater);
        if herd_mass <= 0.0 {
            return 0.0;
        }
        let raw = want.min(herd_mass);
        let targets: Vec<usize> = self.members[prey.index()]
            .iter()
            .copied()
            .filter(|&j| j != eater && self.world.actors.is_alive(j))
            .collect();

        let mut taken = 0.0;
        for j in targets {
            let share = raw * self.world.actors.masses[j] / herd_mass;
            taken += self.debit(j, share, events);
        }
        taken
    }

    /// Bite one random individual, returns mass taken
    fn bite_individual(
        &mut self,
        prey: SpeciesIdx,
        eater: usize,
        want: f32,
        max_size: f32,
        events: &mut Vec<SimulationEvent>,
    ) -> f32 {
        let candidates: Vec<usize> = self.attackable(prey, eater, max_size).collect();
        if candidates.is_empty() {
            return 0.0;
        }
        let pick = candidates[self.world.rng.gen_range(0..candidates.len())];
        self.debit(pick, want, events)
    }
}

/// Phase 4: every eater with prey configured feeds once
pub(crate) fn resolve_eating(world: &mut EcoWorld, events: &mut Vec<SimulationEvent>) {
    let species_count = world.registry.species_count();
    if (0..species_count).all(|s| world.prey_tables.prey_of(SpeciesIdx(s as u16)).is_empty()) {
        return;
    }

    let mut members = vec![Vec::new(); species_count];
    let mut available = vec![0.0f32; species_count];
    for idx in world.actors.iter_living() {
        let species = world.actors.species[idx].index();
        members[species].push(idx);
        available[species] += world.actors.masses[idx];
    }

    let tick = world.current_tick;
    let count = world.actors.count();
    let mut feast = Feast {
        world,
        members,
        available,
        tick,
    };

    for eater in 0..count {
        if !feast.world.actors.is_alive(eater) {
            continue;
        }
        let species = feast.world.actors.species[eater];
        let table = feast.world.prey_tables.prey_of(species).to_vec();
        if table.is_empty() {
            continue;
        }

        let rule = feast.world.rules.rule(species);
        let mass = feast.world.actors.masses[eater];
        let headroom = (rule.growth.max_mass - mass).max(0.0);
        if headroom <= 0.0 {
            continue;
        }
        let size = rule.eat_size(mass);
        if size.bite <= 0.0 {
            feast.world.actors.scratch[eater].insert(ScratchFlags::FAILED_TO_EAT);
            continue;
        }

        let candidates: Vec<(SpeciesIdx, f32)> = table
            .into_iter()
            .filter(|&(prey, _)| feast.has_food(prey, eater, size.max))
            .collect();
        if candidates.is_empty() {
            feast.world.actors.scratch[eater].insert(ScratchFlags::FAILED_TO_EAT);
            continue;
        }

        let total_weight: f32 = candidates.iter().map(|(_, rate)| rate).sum();
        let mut roll = feast.world.rng.gen::<f32>() * total_weight;
        let mut chosen = candidates[candidates.len() - 1];
        for &(prey, rate) in &candidates {
            if roll < rate {
                chosen = (prey, rate);
                break;
            }
            roll -= rate;
        }
        let (prey, rate) = chosen;

        // Never bite more than the eater can convert into its own headroom
        let want = size.bite.min(headroom / rate);
        let taken = if feast.world.rules.rule(prey).is_herd() {
            feast.graze_herd(prey, eater, want, events)
        } else {
            feast.bite_individual(prey, eater, want, size.max, events)
        };
        if taken <= 0.0 {
            feast.world.actors.scratch[eater].insert(ScratchFlags::FAILED_TO_EAT);
            continue;
        }

        let credit = (taken * rate).min(headroom);
        feast.world.actors.masses[eater] += credit;
        feast.available[species.index()] += credit;
    }
}
