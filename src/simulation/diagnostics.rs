//! Death log and cause tallies for tooling
//!
//! Not read by any tick phase. UI panels and config tools use it to answer
//! "why did this instance die".

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::types::{InstanceId, SpeciesIdx, Tick};
use crate::rules::eval::DeathCause;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeathRecord {
    pub id: InstanceId,
    pub species: SpeciesIdx,
    pub tick: Tick,
    pub age: u32,
    pub mass: f32,
    pub cause: DeathCause,
}

/// Lifetime death counts per cause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeathTally {
    pub old_age: u64,
    pub underweight: u64,
    pub resource_starvation: u64,
    pub property_starvation: u64,
    pub consumed: u64,
}

impl DeathTally {
    pub fn record(&mut self, cause: DeathCause) {
        match cause {
            DeathCause::OldAge => self.old_age += 1,
            DeathCause::Underweight => self.underweight += 1,
            DeathCause::ResourceStarvation(_) => self.resource_starvation += 1,
            DeathCause::PropertyStarvation(_) => self.property_starvation += 1,
            DeathCause::Consumed => self.consumed += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.old_age + self.underweight + self.resource_starvation + self.property_starvation + self.consumed
    }
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    capacity: usize,
    recent_deaths: VecDeque<DeathRecord>,
    pub tally: DeathTally,
    pub total_births: u64,
}

impl Diagnostics {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            recent_deaths: VecDeque::with_capacity(capacity),
            tally: DeathTally::default(),
            total_births: 0,
        }
    }

    pub fn record_death(&mut self, record: DeathRecord) {
        self.tally.record(record.cause);
        if self.capacity == 0 {
            return;
        }
        if self.recent_deaths.len() == self.capacity {
            self.recent_deaths.pop_front();
        }
        self.recent_deaths.push_back(record);
    }

    pub fn recent_deaths(&self) -> impl Iterator<Item = &DeathRecord> {
        self.recent_deaths.iter()
    }

    /// Cause of death for a removed instance, if still in the log
    pub fn why_died(&self, id: InstanceId) -> Option<DeathCause> {
        self.recent_deaths
            .iter()
            .rev()
            .find(|r| r.id == id)
            .map(|r| r.cause)
    }
}
