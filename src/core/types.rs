//! Core type definitions used throughout the codebase

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::EcoError;

/// Simulation tick counter (simulation time unit)
pub type Tick = u64;

/// Longest human-authored identifier, in bytes
pub const CODE_LEN: usize = 4;

/// Short human-readable identifier for resources, properties and species
///
/// Codes are what scenario files, save data and UI panels use. They are
/// resolved into dense indices once at load time and never looked up in the
/// tick loop.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code([u8; CODE_LEN]);

impl Code {
    pub fn new(text: &str) -> Result<Self, EcoError> {
        let bytes = text.as_bytes();
        if bytes.is_empty()
            || bytes.len() > CODE_LEN
            || !bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'_')
        {
            return Err(EcoError::InvalidCode(text.to_string()));
        }
        let mut raw = [0u8; CODE_LEN];
        raw[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(CODE_LEN);
        // Only ASCII bytes are ever stored
        std::str::from_utf8(&self.0[..len]).unwrap_or("")
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code({})", self.as_str())
    }
}

impl FromStr for Code {
    type Err = EcoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Code::new(s)
    }
}

impl TryFrom<String> for Code {
    type Error = EcoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Code::new(&value)
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.as_str().to_string()
    }
}

/// Which registry table an identifier belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentifierKind {
    Resource,
    Property,
    Species,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdentifierKind::Resource => "resource",
            IdentifierKind::Property => "property",
            IdentifierKind::Species => "species",
        };
        f.write_str(name)
    }
}

macro_rules! dense_index {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u16);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

dense_index!(
    /// Dense index of a registered resource
    ResourceIdx
);
dense_index!(
    /// Dense index of a registered environmental property
    PropertyIdx
);
dense_index!(
    /// Dense index of a registered species
    SpeciesIdx
);

/// Unique identifier for actor instances
///
/// Monotonic for the lifetime of a simulation and never reused, so a removed
/// instance can never be confused with a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u64);

/// One bit per tracked property; a set bit means the threshold is satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyMask(pub u64);

impl PropertyMask {
    pub const ALL: PropertyMask = PropertyMask(u64::MAX);

    pub fn is_met(self, property: PropertyIdx) -> bool {
        self.0 & (1u64 << property.0) != 0
    }

    pub fn clear(&mut self, property: PropertyIdx) {
        self.0 &= !(1u64 << property.0);
    }

    pub fn set(&mut self, property: PropertyIdx) {
        self.0 |= 1u64 << property.0;
    }
}

impl Default for PropertyMask {
    fn default() -> Self {
        Self::ALL
    }
}
