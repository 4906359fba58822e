//! Shared types for the recipe planner
//!
//! Domain types, REST wire messages, shared errors and logging setup used by
//! every crate in the workspace.

pub mod types;
pub mod errors;
pub mod logging;
pub mod messages;

pub use types::*;
pub use errors::*;

pub use messages::{CreateEntryRequest, EntryDto, RecipeRef, SettingsDto};
