//! Per-tick read-only simulation context

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::registry::TypeRegistry;
use crate::core::types::{PropertyIdx, ResourceIdx, SpeciesIdx, Tick};
use crate::entity::actor::ActorArchetype;

/// Population totals for one species
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpeciesAggregate {
    pub population: u32,
    pub total_mass: f32,
}

/// Count and weigh every live instance, per species
pub fn compute_aggregates(actors: &ActorArchetype, species_count: usize) -> Vec<SpeciesAggregate> {
    let mut aggregates = vec![SpeciesAggregate::default(); species_count];
    for idx in actors.iter_living() {
        let entry = &mut aggregates[actors.species[idx].index()];
        entry.population += 1;
        entry.total_mass += actors.masses[idx];
    }
    aggregates
}

/// Everything an evaluator may read besides its own instance
///
/// Built once at the start of a tick from the previous tick's outputs and
/// never mutated while the tick's evaluation phases run.
#[derive(Debug, Clone)]
pub struct SimulationContext {
    pub tick: Tick,
    registry: Arc<TypeRegistry>,
    properties: Vec<f32>,
    resources: Vec<f32>,
    aggregates: Vec<SpeciesAggregate>,
}

impl SimulationContext {
    pub fn new(
        tick: Tick,
        registry: Arc<TypeRegistry>,
        properties: Vec<f32>,
        resources: Vec<f32>,
        aggregates: Vec<SpeciesAggregate>,
    ) -> Self {
        debug_assert_eq!(properties.len(), registry.property_count());
        debug_assert_eq!(resources.len(), registry.resource_count());
        debug_assert_eq!(aggregates.len(), registry.species_count());
        Self {
            tick,
            registry,
            properties,
            resources,
            aggregates,
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn property(&self, idx: PropertyIdx) -> f32 {
        self.properties[idx.index()]
    }

    /// Shared pool level at the start of the tick
    pub fn resource(&self, idx: ResourceIdx) -> f32 {
        self.resources[idx.index()]
    }

    pub fn aggregate(&self, idx: SpeciesIdx) -> SpeciesAggregate {
        self.aggregates[idx.index()]
    }

    pub fn aggregates(&self) -> &[SpeciesAggregate] {
        &self.aggregates
    }
}
