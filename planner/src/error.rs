//! Planner-specific error types

use shared::{EntryId, SharedError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Network request failed: {message}")]
    NetworkError { message: String, status: Option<u16> },

    /// Two live entries share a placement. Reported by store consistency
    /// checks and logged; never returned to callers of the runtime.
    #[error("Placement conflict between {incoming} and {existing}")]
    ConflictError { incoming: EntryId, existing: EntryId },

    #[error("Entry not found: {id}")]
    NotFoundError { id: EntryId },

    #[error("Entry {id} is still awaiting server confirmation")]
    UnconfirmedError { id: EntryId },

    #[error("Count must be at least 1, got {count}")]
    InvalidCountError { count: u32 },

    #[error("Invalid position range: {lower:?} must sort before {upper:?}")]
    InvalidRangeError { lower: String, upper: String },

    #[error("Invalid position key: {key:?}")]
    InvalidPositionError { key: String },

    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Shared component error")]
    SharedError(#[from] SharedError),
}

impl PlannerError {
    pub fn network(message: impl Into<String>) -> Self {
        PlannerError::NetworkError {
            message: message.into(),
            status: None,
        }
    }

    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        PlannerError::NetworkError {
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn config(field: impl Into<String>) -> Self {
        PlannerError::ConfigurationError { field: field.into() }
    }

    /// Errors that leave the store untouched and are safe to ignore
    pub fn is_stale_reference(&self) -> bool {
        matches!(self, PlannerError::NotFoundError { .. })
    }
}

impl From<reqwest::Error> for PlannerError {
    fn from(err: reqwest::Error) -> Self {
        PlannerError::NetworkError {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

pub type PlannerResult<T> = Result<T, PlannerError>;
