//! Simulation world - owns every live instance and the shared environment

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::config::SimulationConfig;
use crate::core::error::{EcoError, Result};
use crate::core::registry::TypeRegistry;
use crate::core::types::{Code, InstanceId, ResourceIdx, SpeciesIdx, Tick};
use crate::entity::actor::{ActorArchetype, ActorState};
use crate::rules::book::RuleBook;
use crate::rules::config::SpeciesConfig;
use crate::rules::eval::{GrowthVerdict, ReproductionVerdict};
use crate::simulation::context::{compute_aggregates, SimulationContext};
use crate::simulation::diagnostics::Diagnostics;
use crate::simulation::eating::PreyTables;
use crate::simulation::output::{SimulationOutput, TickSnapshot};
use crate::simulation::pool::ResourcePool;
use crate::simulation::tick::{run_simulation_tick, SimulationEvent};

/// Where dead bodies go
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposition {
    pub resource: ResourceIdx,
    /// Share of the final body mass released into the pool
    pub fraction: f32,
}

/// The simulation world
pub struct EcoWorld {
    pub name: String,
    pub seed: u64,
    pub current_tick: Tick,
    pub config: SimulationConfig,
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) rules: RuleBook,
    pub(crate) actors: ActorArchetype,
    pub(crate) pool: ResourcePool,
    pub(crate) properties: Vec<f32>,
    pub(crate) decomposition: Option<Decomposition>,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) prey_tables: PreyTables,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) history: VecDeque<TickSnapshot>,
    next_instance_id: u64,
}

impl EcoWorld {
    /// Assemble a world from already-validated parts
    ///
    /// `rng` is the single random source for the whole run; scenario loading
    /// may already have drawn from it.
    pub fn new(
        registry: TypeRegistry,
        rules: RuleBook,
        pool: ResourcePool,
        properties: Vec<f32>,
        config: SimulationConfig,
        rng: ChaCha8Rng,
    ) -> Result<Self> {
        config.validate().map_err(EcoError::InvalidScenario)?;
        if rules.len() != registry.species_count() {
            return Err(EcoError::InvalidScenario(format!(
                "{} species registered but {} rules supplied",
                registry.species_count(),
                rules.len()
            )));
        }
        if pool.levels().len() != registry.resource_count() {
            return Err(EcoError::InvalidScenario(
                "resource pool does not match registered resources".to_string(),
            ));
        }
        if properties.len() != registry.property_count() {
            return Err(EcoError::InvalidScenario(
                "property values do not match registered properties".to_string(),
            ));
        }

        let actors = ActorArchetype::new(registry.resource_count(), registry.property_count());
        let diagnostics = Diagnostics::new(config.death_log_capacity);
        Ok(Self {
            name: String::new(),
            seed: 0,
            current_tick: 0,
            config,
            registry: Arc::new(registry),
            rules,
            actors,
            pool,
            properties,
            decomposition: None,
            rng,
            prey_tables: PreyTables::default(),
            diagnostics,
            history: VecDeque::new(),
            next_instance_id: 0,
        })
    }

    /// Convenience constructor seeding the random source directly
    pub fn with_seed(
        registry: TypeRegistry,
        rules: RuleBook,
        pool: ResourcePool,
        properties: Vec<f32>,
        config: SimulationConfig,
        seed: u64,
    ) -> Result<Self> {
        let mut world = Self::new(
            registry,
            rules,
            pool,
            properties,
            config,
            ChaCha8Rng::seed_from_u64(seed),
        )?;
        world.seed = seed;
        Ok(world)
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    pub fn actors(&self) -> &ActorArchetype {
        &self.actors
    }

    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    pub fn properties(&self) -> &[f32] {
        &self.properties
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn history(&self) -> &VecDeque<TickSnapshot> {
        &self.history
    }

    pub fn set_decomposition(&mut self, decomposition: Option<Decomposition>) {
        self.decomposition = decomposition;
    }

    /// Draw a stable phase offset in `[0, interval)`
    pub(crate) fn draw_jitter(&mut self, interval: u32) -> u32 {
        if interval == 0 {
            0
        } else {
            self.rng.gen_range(0..interval)
        }
    }

    /// Insert a fresh instance with the species' starting mass
    ///
    /// Returns None when the species is already at its population cap.
    pub fn spawn_instance(&mut self, species: SpeciesIdx) -> Option<InstanceId> {
        let live = self.actors.iter_species(species).count() as u32;
        if !self.rules.rule(species).has_room(live) {
            return None;
        }
        Some(self.spawn_unchecked(species))
    }

    pub(crate) fn spawn_unchecked(&mut self, species: SpeciesIdx) -> InstanceId {
        let rule = self.rules.rule(species);
        let mass = rule.growth.starting_mass;
        let growth_interval = rule.growth.interval;
        let reproduction_interval = rule.reproduction.interval;

        let jitter_growth = self.draw_jitter(growth_interval);
        let jitter_reproduction = self.draw_jitter(reproduction_interval);

        let id = InstanceId(self.next_instance_id);
        self.next_instance_id += 1;
        self.actors
            .spawn(id, species, mass, jitter_growth, jitter_reproduction);
        id
    }

    /// Spawn up to `count` instances, stopping at the population cap
    pub fn spawn_population(&mut self, species: SpeciesIdx, count: u32) -> u32 {
        let mut spawned = 0;
        while spawned < count {
            if self.spawn_instance(species).is_none() {
                tracing::warn!(
                    "Initial population for {} clamped to {} by max_instances",
                    self.rules.rule(species).code,
                    spawned
                );
                break;
            }
            spawned += 1;
        }
        spawned
    }

    /// Context as it would be seen if a tick started now
    pub fn build_context(&self) -> SimulationContext {
        SimulationContext::new(
            self.current_tick,
            Arc::clone(&self.registry),
            self.properties.clone(),
            self.pool.levels().to_vec(),
            compute_aggregates(&self.actors, self.registry.species_count()),
        )
    }

    pub fn is_alive(&self, id: InstanceId) -> bool {
        self.actors
            .index_of(id)
            .map_or(false, |idx| self.actors.is_alive(idx))
    }

    pub fn instance(&self, id: InstanceId) -> Option<ActorState> {
        self.actors.index_of(id).map(|idx| self.actors.state(idx))
    }

    pub fn instances_of(&self, species: SpeciesIdx) -> impl Iterator<Item = ActorState> + '_ {
        self.actors
            .iter_species(species)
            .map(move |idx| self.actors.state(idx))
    }

    pub fn population(&self, species: SpeciesIdx) -> u32 {
        self.actors.iter_species(species).count() as u32
    }

    /// Why an instance would or would not grow if a tick started now
    pub fn explain_growth(&self, id: InstanceId) -> Option<GrowthVerdict> {
        let idx = self.actors.index_of(id)?;
        let row = self.actors.row(idx);
        let ctx = self.build_context();
        Some(self.rules.rule(row.species).growth_verdict(&row, &ctx))
    }

    /// Why an instance would or would not reproduce if a tick started now
    pub fn explain_reproduction(&self, id: InstanceId) -> Option<ReproductionVerdict> {
        let idx = self.actors.index_of(id)?;
        let row = self.actors.row(idx);
        let ctx = self.build_context();
        Some(self.rules.rule(row.species).reproduction_verdict(&row, &ctx))
    }

    /// Change an environmental property between ticks
    pub fn set_property(&mut self, code: Code, value: f32) -> Result<()> {
        let idx = self.registry.resolve_property(code)?;
        self.properties[idx.index()] = value;
        Ok(())
    }

    /// Add resource from outside the ecosystem, returns amount actually added
    pub fn add_resource(&mut self, code: Code, amount: f32) -> Result<f32> {
        let idx = self.registry.resolve_resource(code)?;
        Ok(self.pool.add(idx, amount))
    }

    /// Replace a species' rules between ticks
    ///
    /// Live instances of the species are brought within the new rules: mass
    /// is clamped to the new `max_mass` and jitter offsets are reduced into
    /// the new intervals.
    pub fn update_species(&mut self, config: SpeciesConfig) -> Result<u64> {
        let code = config.code;
        let generation = self
            .rules
            .update_species(config, &self.registry)
            .map_err(|e| {
                tracing::warn!("Rejected rule edit for {}: {}", code, e);
                e
            })?;
        self.conform_to_rules(code)?;
        Ok(generation)
    }

    /// Edit a species' rules in place between ticks
    ///
    /// Live instances are conformed the same way as in `update_species`.
    pub fn edit_species<F>(&mut self, code: Code, edit: F) -> Result<u64>
    where
        F: FnOnce(&mut SpeciesConfig),
    {
        let generation = self
            .rules
            .edit_species(code, &self.registry, edit)
            .map_err(|e| {
                tracing::warn!("Rejected rule edit for {}: {}", code, e);
                e
            })?;
        self.conform_to_rules(code)?;
        Ok(generation)
    }

    fn conform_to_rules(&mut self, code: Code) -> Result<()> {
        let species = self.registry.resolve_species(code)?;
        let rule = self.rules.rule(species);
        let max_mass = rule.growth.max_mass;
        let growth_interval = rule.growth.interval;
        let reproduction_interval = rule.reproduction.interval;

        let reduce = |jitter: &mut u32, interval: u32| {
            *jitter = if interval == 0 { 0 } else { *jitter % interval };
        };

        let live: Vec<usize> = self.actors.iter_species(species).collect();
        let mut clamped = 0;
        for &idx in &live {
            if self.actors.masses[idx] > max_mass {
                self.actors.masses[idx] = max_mass;
                clamped += 1;
            }
            reduce(&mut self.actors.jitter_growth[idx], growth_interval);
            reduce(&mut self.actors.jitter_reproduction[idx], reproduction_interval);
        }

        tracing::debug!(
            "Rules for {} changed: {} live instances, {} clamped to max mass {}",
            code,
            live.len(),
            clamped,
            max_mass
        );
        Ok(())
    }

    pub fn snapshot(&self) -> TickSnapshot {
        TickSnapshot::capture(self)
    }

    /// Advance one tick
    pub fn tick(&mut self) -> Vec<SimulationEvent> {
        run_simulation_tick(self)
    }

    /// Run `ticks` ticks and collect the output
    pub fn run(&mut self, ticks: u64) -> SimulationOutput {
        let start = Instant::now();
        let start_tick = self.current_tick;
        tracing::info!(
            "Running {} for {} ticks ({} instances, seed {})",
            if self.name.is_empty() { "scenario" } else { self.name.as_str() },
            ticks,
            self.actors.count(),
            self.seed
        );

        for _ in 0..ticks {
            self.tick();
        }

        let output = SimulationOutput::new(self, self.current_tick - start_tick, start.elapsed());
        tracing::info!("{}", output.summary());
        output
    }
}
