//! Wire messages exchanged with the recipe API
//!
//! - `calendar`: scheduled entry payloads and calendar settings

pub mod calendar;

pub use calendar::{CreateEntryRequest, EntryDto, RecipeRef, SettingsDto};
