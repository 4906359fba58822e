//! Recipe planner scheduling core
//!
//! Keeps a calendar of scheduled recipes consistent under optimistic edits:
//! changes apply locally at once, are sent to the server in the background,
//! and are reconciled or rolled back when the server answers. Also provides
//! fractional position keys for drag-and-drop ordered lists.

pub mod config;
pub mod core;
pub mod error;
pub mod planner_impl;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::PlannerConfig;
pub use core::{
    ActionId, ActionKind, ActionState, ChangeWindow, Clock, Coordinator, DateRange, FixedClock, Intent, Notice,
    Outcome, ScheduleStore, SystemClock,
};
pub use error::{PlannerError, PlannerResult};
pub use planner_impl::{ActionHandle, CalendarSubscription, Planner};
pub use traits::{MockNotifier, MockScheduleApi, Notifier, ScheduleApi};
