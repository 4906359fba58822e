//! Service trait definitions for dependency injection
//!
//! All I/O the planner performs goes through these traits so the runtime can
//! be driven by mocks in tests.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::core::Notice;
use crate::error::PlannerResult;
use shared::{CalendarSettings, EntryPatch, Owner, RecipeId, ScheduledRecipeEntry};

/// Remote calendar API
#[mockall::automock]
#[async_trait]
pub trait ScheduleApi: Send + Sync {
    /// Entries scheduled for `owner` between `start` and `end`, inclusive
    async fn fetch_schedule_range(
        &self,
        owner: Owner,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PlannerResult<Vec<ScheduledRecipeEntry>>;

    /// Schedule a recipe; returns the entry as stored by the server
    async fn create_scheduled_entry(
        &self,
        recipe_id: RecipeId,
        owner: Owner,
        on: NaiveDate,
        count: u32,
    ) -> PlannerResult<ScheduledRecipeEntry>;

    /// Patch the day and/or count of an entry
    async fn update_scheduled_entry(&self, id: u64, owner: Owner, patch: EntryPatch) -> PlannerResult<ScheduledRecipeEntry>;

    async fn delete_scheduled_entry(&self, id: u64, owner: Owner) -> PlannerResult<()>;

    /// Calendar sharing settings for `owner`
    async fn fetch_settings(&self, owner: Owner) -> PlannerResult<CalendarSettings>;
}

/// Sink for user-facing action results
#[mockall::automock]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: Notice);
}
