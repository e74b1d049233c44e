//! Type registry mapping human-authored codes to dense indices
//!
//! Every resource, property and species code is registered once while a
//! scenario loads. Rules and actors only ever hold the resulting indices.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{EcoError, Result};
use crate::core::types::{Code, IdentifierKind, PropertyIdx, ResourceIdx, SpeciesIdx};

/// Property satisfaction is tracked in a 64-bit mask
pub const MAX_PROPERTIES: usize = 64;

/// One code table, assigning indices in registration order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Interner {
    codes: Vec<Code>,
    by_code: AHashMap<Code, u16>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a code, returning its index. Registering twice is a no-op.
    ///
    /// Fails once every `u16` index is taken.
    pub fn register(&mut self, code: Code, kind: IdentifierKind) -> Result<u16> {
        if let Some(&idx) = self.by_code.get(&code) {
            return Ok(idx);
        }
        let idx = u16::try_from(self.codes.len()).map_err(|_| EcoError::TooManyIdentifiers {
            kind,
            count: self.codes.len() + 1,
        })?;
        self.codes.push(code);
        self.by_code.insert(code, idx);
        Ok(idx)
    }

    pub fn get(&self, code: Code) -> Option<u16> {
        self.by_code.get(&code).copied()
    }

    pub fn code(&self, idx: u16) -> Option<Code> {
        self.codes.get(idx as usize).copied()
    }

    pub fn codes(&self) -> &[Code] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Scenario-scoped registry for all identifier kinds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeRegistry {
    resources: Interner,
    properties: Interner,
    species: Interner,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_resource(&mut self, code: Code) -> Result<ResourceIdx> {
        self.resources
            .register(code, IdentifierKind::Resource)
            .map(ResourceIdx)
    }

    pub fn register_property(&mut self, code: Code) -> Result<PropertyIdx> {
        if self.properties.get(code).is_none() && self.properties.len() >= MAX_PROPERTIES {
            return Err(EcoError::TooManyProperties(self.properties.len() + 1));
        }
        self.properties
            .register(code, IdentifierKind::Property)
            .map(PropertyIdx)
    }

    pub fn register_species(&mut self, code: Code) -> Result<SpeciesIdx> {
        self.species
            .register(code, IdentifierKind::Species)
            .map(SpeciesIdx)
    }

    pub fn resolve_resource(&self, code: Code) -> Result<ResourceIdx> {
        self.resources
            .get(code)
            .map(ResourceIdx)
            .ok_or(EcoError::UnknownIdentifier { kind: IdentifierKind::Resource, code })
    }

    pub fn resolve_property(&self, code: Code) -> Result<PropertyIdx> {
        self.properties
            .get(code)
            .map(PropertyIdx)
            .ok_or(EcoError::UnknownIdentifier { kind: IdentifierKind::Property, code })
    }

    pub fn resolve_species(&self, code: Code) -> Result<SpeciesIdx> {
        self.species
            .get(code)
            .map(SpeciesIdx)
            .ok_or(EcoError::UnknownIdentifier { kind: IdentifierKind::Species, code })
    }

    pub fn resource_code(&self, idx: ResourceIdx) -> Option<Code> {
        self.resources.code(idx.0)
    }

    pub fn property_code(&self, idx: PropertyIdx) -> Option<Code> {
        self.properties.code(idx.0)
    }

    pub fn species_code(&self, idx: SpeciesIdx) -> Option<Code> {
        self.species.code(idx.0)
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    pub fn species_codes(&self) -> &[Code] {
        self.species.codes()
    }

    pub fn resource_codes(&self) -> &[Code] {
        self.resources.codes()
    }

    pub fn property_codes(&self) -> &[Code] {
        self.properties.codes()
    }
}
