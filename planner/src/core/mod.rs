//! Core scheduling logic
//!
//! Pure state transitions and key arithmetic with no I/O dependencies.
//! Remote effects leave this module only as [`coordinator::Command`] values.

pub mod coordinator;
pub mod merge;
pub mod policy;
pub mod position;
pub mod store;
pub mod views;

pub use coordinator::{
    ActionId, ActionKind, ActionState, Command, Completion, Coordinator, Intent, Notice, Outcome, Transition,
};
pub use merge::MergeDecision;
pub use policy::{ChangeWindow, Clock, FixedClock, MoveKind, SystemClock};
pub use position::{
    first_position, initial_positions, position_after, position_before, position_between, position_for_slot,
    sort_positioned, Positioned,
};
pub use store::{DateRange, EntrySnapshot, MoveOutcome, RangeStatus, ScheduleStore, SetOutcome};
pub use views::DayMap;
