//! Collision detection and merging of duplicate placements
//!
//! Two live entries may never share a [`Placement`]. When a write would create
//! such a pair, the two are folded into one entry whose count is the sum.

use chrono::NaiveDate;
use shared::{EntryId, Placement, ScheduledRecipeEntry};

/// Outcome of checking an incoming entry against the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// No other entry shares the placement
    Insert,
    /// `absorbed` shares the placement and must be folded into the incoming entry
    Absorb { absorbed: EntryId, count: u32 },
}

/// Entry occupying `placement`, if any
pub fn entry_at<'a, I>(entries: I, placement: &Placement) -> Option<&'a ScheduledRecipeEntry>
where
    I: IntoIterator<Item = &'a ScheduledRecipeEntry>,
{
    entries.into_iter().find(|entry| entry.placement() == *placement)
}

/// Find another entry occupying `placement`, ignoring `exclude`
pub fn find_collision<'a, I>(entries: I, placement: &Placement, exclude: EntryId) -> Option<&'a ScheduledRecipeEntry>
where
    I: IntoIterator<Item = &'a ScheduledRecipeEntry>,
{
    entries
        .into_iter()
        .find(|entry| entry.id != exclude && entry.placement() == *placement)
}

/// Find where `mover` would land if moved to `to`
pub fn find_move_target<'a, I>(entries: I, mover: &ScheduledRecipeEntry, to: NaiveDate) -> Option<&'a ScheduledRecipeEntry>
where
    I: IntoIterator<Item = &'a ScheduledRecipeEntry>,
{
    let placement = Placement { on: to, ..mover.placement() };
    find_collision(entries, &placement, mover.id)
}

/// Decide how `incoming` is written given the current entries
pub fn plan_upsert<'a, I>(entries: I, incoming: &ScheduledRecipeEntry) -> MergeDecision
where
    I: IntoIterator<Item = &'a ScheduledRecipeEntry>,
{
    match find_collision(entries, &incoming.placement(), incoming.id) {
        Some(existing) => MergeDecision::Absorb {
            absorbed: existing.id,
            count: merged_count(incoming.count, existing.count),
        },
        None => MergeDecision::Insert,
    }
}

/// Combined count of two merged entries
pub fn merged_count(a: u32, b: u32) -> u32 {
    a.saturating_add(b)
}
