//! Engine configuration with documented defaults
//!
//! These tunables change how the driver runs a tick, never what a species
//! rule means. Scenario files may override them in an `[engine]` table.

use serde::{Deserialize, Serialize};

/// How per-instance starvation counters evolve from tick to tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StarvationPolicy {
    /// Increment on every unmet tick, reset to 0 on a met tick.
    ///
    /// The limit then means "this many unmet ticks in a row".
    #[default]
    Consecutive,
    /// Increment on every unmet tick, never reset.
    ///
    /// The limit then means "this many unmet ticks over a lifetime".
    Cumulative,
}

/// Configuration for the simulation driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Minimum live-instance count before evaluation phases fan out with rayon
    ///
    /// Below this threshold, thread overhead exceeds benefits. Evaluators are
    /// pure so the result is identical either way.
    pub parallel_threshold: usize,

    /// Starvation counter increment/reset policy
    pub starvation_policy: StarvationPolicy,

    /// How many recent deaths the diagnostics log keeps
    ///
    /// Oldest records are evicted first. 0 disables the log.
    pub death_log_capacity: usize,

    /// Keep a `TickSnapshot` for every tick in the run output
    ///
    /// Long runs with many species can turn this off and poll
    /// `EcoWorld::snapshot()` instead.
    pub record_history: bool,

    /// How many recent snapshots the history keeps
    ///
    /// Oldest snapshots are evicted first. Must be at least 1.
    pub history_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 1000,
            starvation_policy: StarvationPolicy::Consecutive,
            death_log_capacity: 256,
            record_history: true,
            history_capacity: 10_000,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.parallel_threshold == 0 {
            return Err("parallel_threshold must be at least 1".to_string());
        }
        if self.history_capacity == 0 {
            return Err("history_capacity must be at least 1".to_string());
        }
        Ok(())
    }
}
