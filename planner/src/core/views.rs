//! Read-only projections over the schedule store

use chrono::NaiveDate;
use shared::{Owner, OwnerKind, ScheduledRecipeEntry};
use std::collections::BTreeMap;

use super::store::{DateRange, ScheduleStore};

/// Calendar days mapped to the entries scheduled on them
pub type DayMap = BTreeMap<NaiveDate, Vec<ScheduledRecipeEntry>>;

/// Entries whose owner is of the given kind
pub fn entries_of_kind(store: &ScheduleStore, kind: OwnerKind) -> Vec<&ScheduledRecipeEntry> {
    store.entries().filter(|entry| entry.owner.kind() == kind).collect()
}

pub fn team_entries(store: &ScheduleStore) -> Vec<&ScheduledRecipeEntry> {
    entries_of_kind(store, OwnerKind::Team)
}

pub fn personal_entries(store: &ScheduleStore) -> Vec<&ScheduledRecipeEntry> {
    entries_of_kind(store, OwnerKind::Personal)
}

/// Entries for one owner grouped by day.
///
/// Only days holding entries appear. Each day lists entries by recipe name,
/// then id, so renders are stable across store orderings.
pub fn by_day(store: &ScheduleStore, range: &DateRange) -> DayMap {
    let mut days = DayMap::new();
    for entry in store.entries() {
        if entry.owner == range.owner && range.contains(entry.on) {
            days.entry(entry.on).or_default().push(entry.clone());
        }
    }
    for entries in days.values_mut() {
        entries.sort_by(|a, b| a.recipe_name.cmp(&b.recipe_name).then_with(|| a.id.cmp(&b.id)));
    }
    days
}

/// Total servings scheduled per day for one owner
pub fn counts_by_day(store: &ScheduleStore, owner: Owner) -> BTreeMap<NaiveDate, u32> {
    let mut totals = BTreeMap::new();
    for entry in store.entries().filter(|entry| entry.owner == owner) {
        *totals.entry(entry.on).or_insert(0u32) += entry.count;
    }
    totals
}
