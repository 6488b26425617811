use crate::types::Day;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot encode or decode a value of type '{type_name}'")]
    UnsupportedValue { type_name: String },

    #[error("Unknown variant tag '{tag}'")]
    UnknownVariant { tag: String },

    #[error("Expected a '{expected}' document, found '{found}'")]
    UnexpectedVariant { expected: &'static str, found: String },

    #[error("Variant '{tag}' is missing field '{field}'")]
    MissingField { tag: &'static str, field: String },

    #[error("Field '{field}' of variant '{tag}' is not a valid {expected}")]
    FieldType {
        tag:      &'static str,
        field:    String,
        expected: &'static str,
    },

    #[error("Invalid decimal literal '{literal}'")]
    InvalidDecimal { literal: String },

    #[error("View history desync: day counter is at {expected}, history holds {actual} days")]
    Desync { expected: Day, actual: u64 },

    #[error("Day length must be at least one second")]
    InvalidDayLength,

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Save slot '{name}' does not exist")]
    SlotNotFound { name: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
