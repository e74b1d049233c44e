//! ecotick - deterministic discrete-tick ecosystem simulation
//!
//! Species are described by rule definitions (resource needs, eating,
//! growth, reproduction, death). Every tick the driver evaluates each live
//! individual against a shared pool of resources and environmental
//! properties, then applies the results in a fixed phase order. The same
//! seed and scenario always reproduce the same run.

pub mod core;
pub mod entity;
pub mod rules;
pub mod scenario;
pub mod simulation;
