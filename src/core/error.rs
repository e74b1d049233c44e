use thiserror::Error;

use crate::core::types::{Code, IdentifierKind};

#[derive(Error, Debug)]
pub enum EcoError {
    #[error("Unknown {kind} identifier: {code}")]
    UnknownIdentifier { kind: IdentifierKind, code: Code },

    #[error("Duplicate {kind} identifier: {code}")]
    DuplicateIdentifier { kind: IdentifierKind, code: Code },

    #[error("Invalid identifier code {0:?}: expected 1-4 ASCII letters, digits or '_'")]
    InvalidCode(String),

    #[error("Invalid threshold for species {species}: {field} {reason}")]
    InvalidThreshold {
        species: Code,
        field: &'static str,
        reason: String,
    },

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Too many properties: {0} registered, at most 64 can be tracked")]
    TooManyProperties(usize),

    #[error("Too many {kind} identifiers: {count} registered, at most 65536 fit")]
    TooManyIdentifiers { kind: IdentifierKind, count: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML export error: {0}")]
    TomlExport(#[from] toml::ser::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EcoError>;
