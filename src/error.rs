use thiserror::Error;

use crate::types::FlightField;

/// Errors produced by the encode → predict pipeline.
#[derive(Debug, Error)]
pub enum DelayError {
    #[error("record {index}: invalid field {field}: {reason}")]
    Validation {
        index: usize,
        field: FlightField,
        reason: String,
    },

    #[error("feature width mismatch: got {actual}, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("model is not loaded")]
    ModelNotLoaded,

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("invalid feature column: {0}")]
    InvalidColumn(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DelayError {
    pub fn validation(index: usize, field: FlightField, reason: impl Into<String>) -> Self {
        DelayError::Validation {
            index,
            field,
            reason: reason.into(),
        }
    }

    /// True when the caller can fix the problem by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, DelayError::Validation { .. })
    }

    /// True when the model artifact is missing or unusable.
    pub fn is_model_unavailable(&self) -> bool {
        matches!(self, DelayError::ModelNotLoaded | DelayError::ModelLoad(_))
    }

    pub fn field(&self) -> Option<FlightField> {
        match self {
            DelayError::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            DelayError::Validation { index, .. } => Some(*index),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DelayError>;
