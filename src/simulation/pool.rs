//! Shared environmental resource pool

use serde::{Deserialize, Serialize};

use crate::core::types::ResourceIdx;

/// Level and optional capacity of every registered resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcePool {
    levels: Vec<f32>,
    /// None = unbounded
    capacities: Vec<Option<f32>>,
}

impl ResourcePool {
    pub fn new(levels: Vec<f32>, capacities: Vec<Option<f32>>) -> Self {
        debug_assert_eq!(levels.len(), capacities.len());
        Self { levels, capacities }
    }

    pub fn level(&self, resource: ResourceIdx) -> f32 {
        self.levels[resource.index()]
    }

    pub fn levels(&self) -> &[f32] {
        &self.levels
    }

    pub fn capacity(&self, resource: ResourceIdx) -> Option<f32> {
        self.capacities[resource.index()]
    }

    /// Add up to `amount`, returns amount actually added
    pub fn add(&mut self, resource: ResourceIdx, amount: f32) -> f32 {
        if amount <= 0.0 {
            return 0.0;
        }
        let idx = resource.index();
        let space = match self.capacities[idx] {
            Some(cap) => (cap - self.levels[idx]).max(0.0),
            None => f32::INFINITY,
        };
        let added = amount.min(space);
        self.levels[idx] += added;
        added
    }

    /// Remove up to `amount`, returns amount actually removed
    pub fn remove(&mut self, resource: ResourceIdx, amount: f32) -> f32 {
        if amount <= 0.0 {
            return 0.0;
        }
        let idx = resource.index();
        let removed = amount.min(self.levels[idx]);
        self.levels[idx] -= removed;
        removed
    }

    /// Remove exactly `amount` if the pool holds it, otherwise nothing
    pub fn try_remove(&mut self, resource: ResourceIdx, amount: f32) -> bool {
        if self.level(resource) < amount {
            return false;
        }
        self.remove(resource, amount);
        true
    }
}
