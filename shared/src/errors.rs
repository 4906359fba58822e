//! Shared error types for the recipe planner

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid date (expected YYYY-MM-DD): {input}")]
    InvalidDate { input: String },

    #[error("Invalid entry id: {input}")]
    InvalidEntryId { input: String },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
