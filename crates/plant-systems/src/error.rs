//! Error Types for Plant Systems

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlantError>;

#[derive(Error, Debug)]
pub enum PlantError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid {field}: '{value}' (expected one of: {expected})")]
    InvalidArgument {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PlantError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}
