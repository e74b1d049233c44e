//! Actor instance state with SoA layout
//!
//! Every live individual owns one slot in each column. Per-resource and
//! per-property columns are flattened, `slots` entries per instance, sized to
//! the registry counts fixed at scenario load.

use serde::{Deserialize, Serialize};

use crate::core::config::StarvationPolicy;
use crate::core::types::{InstanceId, PropertyMask, SpeciesIdx};

/// Flags that live as long as the instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersistentFlags(pub u8);

impl PersistentFlags {
    pub const ALIVE: PersistentFlags = PersistentFlags(1 << 0);

    pub fn contains(self, other: PersistentFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: PersistentFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: PersistentFlags) {
        self.0 &= !other.0;
    }
}

/// Per-tick flags, cleared unconditionally when a tick starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScratchFlags(pub u8);

impl ScratchFlags {
    pub const QUEUED_TO_REPRODUCE: ScratchFlags = ScratchFlags(1 << 0);
    pub const DONE_FOR_TICK: ScratchFlags = ScratchFlags(1 << 1);
    pub const FAILED_TO_EAT: ScratchFlags = ScratchFlags(1 << 2);
    pub const RESOURCE_DEFICIT: ScratchFlags = ScratchFlags(1 << 3);

    pub fn contains(self, other: ScratchFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: ScratchFlags) {
        self.0 |= other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for ScratchFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        ScratchFlags(self.0 | rhs.0)
    }
}

/// Advance one starvation counter for this tick
pub fn update_starvation_counter(counter: &mut u32, met: bool, policy: StarvationPolicy) {
    if !met {
        *counter = counter.saturating_add(1);
    } else if policy == StarvationPolicy::Consecutive {
        *counter = 0;
    }
}

/// Read-only view of one instance, handed to rule evaluators
#[derive(Debug, Clone, Copy)]
pub struct ActorRow<'a> {
    pub id: InstanceId,
    pub species: SpeciesIdx,
    pub age: u32,
    pub mass: f32,
    pub persistent: PersistentFlags,
    pub scratch: ScratchFlags,
    pub jitter_growth: u32,
    pub jitter_reproduction: u32,
    pub met_properties: PropertyMask,
    pub desired_resources: &'a [f32],
    pub producing_resources: &'a [f32],
    pub resource_starvation: &'a [u32],
    pub property_starvation: &'a [u32],
}

impl ActorRow<'_> {
    pub fn is_alive(&self) -> bool {
        self.persistent.contains(PersistentFlags::ALIVE)
    }

    pub fn to_state(&self) -> ActorState {
        ActorState {
            id: self.id,
            species: self.species,
            age: self.age,
            mass: self.mass,
            persistent: self.persistent,
            scratch: self.scratch,
            jitter_growth: self.jitter_growth,
            jitter_reproduction: self.jitter_reproduction,
            met_properties: self.met_properties,
            desired_resources: self.desired_resources.to_vec(),
            producing_resources: self.producing_resources.to_vec(),
            resource_starvation: self.resource_starvation.to_vec(),
            property_starvation: self.property_starvation.to_vec(),
        }
    }
}

/// Owned copy of one instance, for queries and snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorState {
    pub id: InstanceId,
    pub species: SpeciesIdx,
    pub age: u32,
    pub mass: f32,
    pub persistent: PersistentFlags,
    pub scratch: ScratchFlags,
    pub jitter_growth: u32,
    pub jitter_reproduction: u32,
    pub met_properties: PropertyMask,
    pub desired_resources: Vec<f32>,
    pub producing_resources: Vec<f32>,
    pub resource_starvation: Vec<u32>,
    pub property_starvation: Vec<u32>,
}

impl ActorState {
    /// Fresh live instance with zeroed columns
    pub fn new(
        id: InstanceId,
        species: SpeciesIdx,
        mass: f32,
        resource_slots: usize,
        property_slots: usize,
    ) -> Self {
        Self {
            id,
            species,
            age: 0,
            mass,
            persistent: PersistentFlags::ALIVE,
            scratch: ScratchFlags::default(),
            jitter_growth: 0,
            jitter_reproduction: 0,
            met_properties: PropertyMask::ALL,
            desired_resources: vec![0.0; resource_slots],
            producing_resources: vec![0.0; resource_slots],
            resource_starvation: vec![0; resource_slots],
            property_starvation: vec![0; property_slots],
        }
    }

    pub fn row(&self) -> ActorRow<'_> {
        ActorRow {
            id: self.id,
            species: self.species,
            age: self.age,
            mass: self.mass,
            persistent: self.persistent,
            scratch: self.scratch,
            jitter_growth: self.jitter_growth,
            jitter_reproduction: self.jitter_reproduction,
            met_properties: self.met_properties,
            desired_resources: &self.desired_resources,
            producing_resources: &self.producing_resources,
            resource_starvation: &self.resource_starvation,
            property_starvation: &self.property_starvation,
        }
    }
}

/// An instance removed by `sweep_dead`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemovedActor {
    pub id: InstanceId,
    pub species: SpeciesIdx,
    pub age: u32,
    pub mass: f32,
}

/// Structure of Arrays for all actor instances
#[derive(Debug, Clone, Default)]
pub struct ActorArchetype {
    resource_slots: usize,
    property_slots: usize,
    pub ids: Vec<InstanceId>,
    pub species: Vec<SpeciesIdx>,
    pub ages: Vec<u32>,
    pub masses: Vec<f32>,
    pub persistent: Vec<PersistentFlags>,
    pub scratch: Vec<ScratchFlags>,
    pub jitter_growth: Vec<u32>,
    pub jitter_reproduction: Vec<u32>,
    pub met_properties: Vec<PropertyMask>,
    /// `resource_slots` per instance
    pub desired_resources: Vec<f32>,
    /// `resource_slots` per instance
    pub producing_resources: Vec<f32>,
    /// `resource_slots` per instance
    pub resource_starvation: Vec<u32>,
    /// `property_slots` per instance
    pub property_starvation: Vec<u32>,
}

impl ActorArchetype {
    pub fn new(resource_slots: usize, property_slots: usize) -> Self {
        Self {
            resource_slots,
            property_slots,
            ..Default::default()
        }
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }

    pub fn resource_slots(&self) -> usize {
        self.resource_slots
    }

    pub fn property_slots(&self) -> usize {
        self.property_slots
    }

    /// Append a fresh live instance, returning its slot
    pub fn spawn(
        &mut self,
        id: InstanceId,
        species: SpeciesIdx,
        mass: f32,
        jitter_growth: u32,
        jitter_reproduction: u32,
    ) -> usize {
        debug_assert!(self.ids.last().map_or(true, |last| *last < id), "instance ids must increase");
        self.ids.push(id);
        self.species.push(species);
        self.ages.push(0);
        self.masses.push(mass);
        self.persistent.push(PersistentFlags::ALIVE);
        self.scratch.push(ScratchFlags::default());
        self.jitter_growth.push(jitter_growth);
        self.jitter_reproduction.push(jitter_reproduction);
        self.met_properties.push(PropertyMask::ALL);
        self.desired_resources.extend(std::iter::repeat(0.0).take(self.resource_slots));
        self.producing_resources.extend(std::iter::repeat(0.0).take(self.resource_slots));
        self.resource_starvation.extend(std::iter::repeat(0).take(self.resource_slots));
        self.property_starvation.extend(std::iter::repeat(0).take(self.property_slots));
        self.ids.len() - 1
    }

    /// Ids are assigned in increasing order and removal preserves order
    pub fn index_of(&self, id: InstanceId) -> Option<usize> {
        self.ids.binary_search(&id).ok()
    }

    pub fn is_alive(&self, idx: usize) -> bool {
        self.persistent[idx].contains(PersistentFlags::ALIVE)
    }

    pub fn kill(&mut self, idx: usize) {
        self.persistent[idx].remove(PersistentFlags::ALIVE);
    }

    pub fn iter_living(&self) -> impl Iterator<Item = usize> + '_ {
        self.persistent
            .iter()
            .enumerate()
            .filter(|(_, flags)| flags.contains(PersistentFlags::ALIVE))
            .map(|(i, _)| i)
    }

    pub fn iter_species(&self, species: SpeciesIdx) -> impl Iterator<Item = usize> + '_ {
        self.iter_living().filter(move |&i| self.species[i] == species)
    }

    fn resource_range(&self, idx: usize) -> std::ops::Range<usize> {
        idx * self.resource_slots..(idx + 1) * self.resource_slots
    }

    fn property_range(&self, idx: usize) -> std::ops::Range<usize> {
        idx * self.property_slots..(idx + 1) * self.property_slots
    }

    pub fn row(&self, idx: usize) -> ActorRow<'_> {
        let res = self.resource_range(idx);
        let prop = self.property_range(idx);
        ActorRow {
            id: self.ids[idx],
            species: self.species[idx],
            age: self.ages[idx],
            mass: self.masses[idx],
            persistent: self.persistent[idx],
            scratch: self.scratch[idx],
            jitter_growth: self.jitter_growth[idx],
            jitter_reproduction: self.jitter_reproduction[idx],
            met_properties: self.met_properties[idx],
            desired_resources: &self.desired_resources[res.clone()],
            producing_resources: &self.producing_resources[res.clone()],
            resource_starvation: &self.resource_starvation[res],
            property_starvation: &self.property_starvation[prop],
        }
    }

    pub fn state(&self, idx: usize) -> ActorState {
        self.row(idx).to_state()
    }

    pub fn resource_starvation_mut(&mut self, idx: usize) -> &mut [u32] {
        let range = self.resource_range(idx);
        &mut self.resource_starvation[range]
    }

    pub fn property_starvation_mut(&mut self, idx: usize) -> &mut [u32] {
        let range = self.property_range(idx);
        &mut self.property_starvation[range]
    }

    pub fn clear_scratch(&mut self) {
        for flags in &mut self.scratch {
            *flags = ScratchFlags::default();
        }
    }

    /// Remove every instance whose alive flag is cleared, preserving order
    pub fn sweep_dead(&mut self) -> Vec<RemovedActor> {
        let keep: Vec<bool> = self
            .persistent
            .iter()
            .map(|flags| flags.contains(PersistentFlags::ALIVE))
            .collect();
        if keep.iter().all(|&k| k) {
            return Vec::new();
        }

        let removed = keep
            .iter()
            .enumerate()
            .filter(|(_, &k)| !k)
            .map(|(i, _)| RemovedActor {
                id: self.ids[i],
                species: self.species[i],
                age: self.ages[i],
                mass: self.masses[i],
            })
            .collect();

        retain_by_mask(&mut self.ids, &keep, 1);
        retain_by_mask(&mut self.species, &keep, 1);
        retain_by_mask(&mut self.ages, &keep, 1);
        retain_by_mask(&mut self.masses, &keep, 1);
        retain_by_mask(&mut self.persistent, &keep, 1);
        retain_by_mask(&mut self.scratch, &keep, 1);
        retain_by_mask(&mut self.jitter_growth, &keep, 1);
        retain_by_mask(&mut self.jitter_reproduction, &keep, 1);
        retain_by_mask(&mut self.met_properties, &keep, 1);
        retain_by_mask(&mut self.desired_resources, &keep, self.resource_slots);
        retain_by_mask(&mut self.producing_resources, &keep, self.resource_slots);
        retain_by_mask(&mut self.resource_starvation, &keep, self.resource_slots);
        retain_by_mask(&mut self.property_starvation, &keep, self.property_slots);

        removed
    }
}

/// Keep the `stride`-sized chunks of `column` whose mask entry is true
fn retain_by_mask<T>(column: &mut Vec<T>, keep: &[bool], stride: usize) {
    if stride == 0 {
        return;
    }
    let mut i = 0;
    column.retain(|_| {
        let kept = keep[i / stride];
        i += 1;
        kept
    });
}
