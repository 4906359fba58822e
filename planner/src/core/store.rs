//! Normalized store of scheduled recipe entries
//!
//! Pure state transitions with no I/O. Every write that could place two
//! entries on the same (owner, user, day, recipe) slot goes through the
//! collision merger, and no entry with a zero count is ever stored.

use chrono::NaiveDate;
use shared::{component_debug, CalendarSettings, ComponentId, EntryId, Owner, ScheduledRecipeEntry};
use std::collections::HashMap;

use super::merge::{self, MergeDecision};
use crate::error::{PlannerError, PlannerResult};

/// Inclusive day range fetched for one owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub owner: Owner,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, swapping the bounds if they arrive reversed
    pub fn new(owner: Owner, start: NaiveDate, end: NaiveDate) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self { owner, start, end }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Loading state of a fetched range
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeStatus {
    pub loading: bool,
    pub loaded: bool,
    pub error: Option<String>,
}

/// Result of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Inserted,
    Updated,
    /// The incoming entry absorbed `absorbed` and now holds `count`
    Merged { absorbed: EntryId, count: u32 },
    /// A zero count removed the entry
    Removed,
}

/// Result of a move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Entry kept its identity and changed day
    Moved { id: EntryId, from: NaiveDate, to: NaiveDate },
    /// Entry was folded into `into`, which now holds `count`
    Merged { id: EntryId, into: EntryId, count: u32 },
    /// Entry was already on the target day
    Unchanged { id: EntryId },
}

/// Exact prior state of a set of entries, including their index positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySnapshot {
    slots: Vec<SnapshotSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SnapshotSlot {
    id: EntryId,
    /// `None` when the id was not live at snapshot time
    saved: Option<(usize, ScheduledRecipeEntry)>,
}

impl EntrySnapshot {
    /// Entries that were live when the snapshot was taken
    pub fn entries(&self) -> impl Iterator<Item = &ScheduledRecipeEntry> + '_ {
        self.slots.iter().filter_map(|slot| slot.saved.as_ref().map(|(_, entry)| entry))
    }

    pub fn ids(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.slots.iter().map(|slot| slot.id)
    }
}

/// In-memory schedule state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleStore {
    by_id: HashMap<EntryId, ScheduledRecipeEntry>,
    all_ids: Vec<EntryId>,
    ranges: HashMap<DateRange, RangeStatus>,
    settings: HashMap<Owner, CalendarSettings>,
}

impl ScheduleStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: EntryId) -> Option<&ScheduledRecipeEntry> {
        self.by_id.get(&id)
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.all_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all_ids.is_empty()
    }

    /// Entry ids in index order
    pub fn ids(&self) -> &[EntryId] {
        &self.all_ids
    }

    /// Entries in index order
    pub fn entries(&self) -> impl Iterator<Item = &ScheduledRecipeEntry> + '_ {
        self.all_ids.iter().filter_map(|id| self.by_id.get(id))
    }

    pub fn range_status(&self, range: &DateRange) -> Option<&RangeStatus> {
        self.ranges.get(range)
    }

    pub fn settings(&self, owner: &Owner) -> Option<&CalendarSettings> {
        self.settings.get(owner)
    }

    pub fn set_settings(&mut self, owner: Owner, settings: CalendarSettings) {
        self.settings.insert(owner, settings);
    }

    /// Mark a range as loading
    pub fn fetch_range_start(&mut self, range: DateRange) {
        let status = self.ranges.entry(range).or_default();
        status.loading = true;
        status.error = None;
    }

    /// Merge a fetched range into the cache.
    ///
    /// Entries are upserted by id; entries outside the payload are kept. A
    /// local entry left on the placement of a fetched one is dropped in favour
    /// of the server's row, so repeating a payload yields the same state. Two
    /// fetched rows on one placement are merged.
    pub fn fetch_range_success(&mut self, range: DateRange, entries: Vec<ScheduledRecipeEntry>) {
        let mut fetched: Vec<EntryId> = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.count == 0 {
                self.delete_entry(entry.id);
                continue;
            }

            let id = entry.id;
            let placement = entry.placement();
            self.upsert_in_place(entry);

            let occupant = merge::find_collision(self.by_id.values(), &placement, id).map(|other| (other.id, other.count));
            if let Some((other, other_count)) = occupant {
                self.delete_entry(other);
                if fetched.contains(&other) {
                    if let Some(kept) = self.by_id.get_mut(&id) {
                        kept.count = merge::merged_count(kept.count, other_count);
                    }
                } else {
                    component_debug!(ComponentId::current(), "🔀 Fetched {} replaces local {} on {}", id, other, placement.on);
                }
            }
            fetched.push(id);
        }

        let status = self.ranges.entry(range).or_default();
        status.loading = false;
        status.loaded = true;
        status.error = None;
    }

    /// Record a failed range fetch
    pub fn fetch_range_failure(&mut self, range: DateRange, message: impl Into<String>) {
        let status = self.ranges.entry(range).or_default();
        status.loading = false;
        status.error = Some(message.into());
    }

    /// Upsert an entry, folding in any other entry on the same placement
    pub fn set_entry(&mut self, entry: ScheduledRecipeEntry) -> SetOutcome {
        if entry.count == 0 {
            self.delete_entry(entry.id);
            return SetOutcome::Removed;
        }

        match merge::plan_upsert(self.by_id.values(), &entry) {
            MergeDecision::Absorb { absorbed, count } => {
                component_debug!(
                    ComponentId::current(),
                    "🔀 {} absorbs {} on {} (count {})",
                    entry.id,
                    absorbed,
                    entry.on,
                    count
                );
                self.delete_entry(absorbed);
                self.upsert_in_place(ScheduledRecipeEntry { count, ..entry });
                SetOutcome::Merged { absorbed, count }
            }
            MergeDecision::Insert => {
                if self.upsert_in_place(entry) {
                    SetOutcome::Updated
                } else {
                    SetOutcome::Inserted
                }
            }
        }
    }

    /// Move an entry to another day, merging into an entry already there
    pub fn move_entry(&mut self, id: EntryId, to: NaiveDate) -> PlannerResult<MoveOutcome> {
        let mover = self.by_id.get(&id).ok_or(PlannerError::NotFoundError { id })?;
        if mover.on == to {
            return Ok(MoveOutcome::Unchanged { id });
        }

        let from = mover.on;
        let mover_count = mover.count;
        let target = merge::find_move_target(self.by_id.values(), mover, to).map(|entry| entry.id);

        match target {
            Some(into) => {
                let count = match self.by_id.get_mut(&into) {
                    Some(target) => {
                        target.count = merge::merged_count(target.count, mover_count);
                        target.count
                    }
                    None => return Err(PlannerError::NotFoundError { id: into }),
                };
                self.delete_entry(id);
                component_debug!(ComponentId::current(), "🔀 {} merged into {} on {} (count {})", id, into, to, count);
                Ok(MoveOutcome::Merged { id, into, count })
            }
            None => {
                if let Some(entry) = self.by_id.get_mut(&id) {
                    entry.on = to;
                }
                Ok(MoveOutcome::Moved { id, from, to })
            }
        }
    }

    /// Change an entry's count; zero removes the entry
    pub fn set_count(&mut self, id: EntryId, count: u32) -> PlannerResult<SetOutcome> {
        if !self.by_id.contains_key(&id) {
            return Err(PlannerError::NotFoundError { id });
        }
        if count == 0 {
            self.delete_entry(id);
            return Ok(SetOutcome::Removed);
        }
        if let Some(entry) = self.by_id.get_mut(&id) {
            entry.count = count;
        }
        Ok(SetOutcome::Updated)
    }

    /// Remove an entry. Absent ids are ignored.
    pub fn delete_entry(&mut self, id: EntryId) -> Option<ScheduledRecipeEntry> {
        let removed = self.by_id.remove(&id)?;
        self.all_ids.retain(|existing| *existing != id);
        Some(removed)
    }

    /// Swap `old_id` for `entry`, typically a pending id for its confirmed twin
    pub fn replace_entry(&mut self, old_id: EntryId, entry: ScheduledRecipeEntry) -> SetOutcome {
        self.delete_entry(old_id);
        self.set_entry(entry)
    }

    /// Capture the current state of `ids`, live or not
    pub fn snapshot(&self, ids: &[EntryId]) -> EntrySnapshot {
        let mut slots: Vec<SnapshotSlot> = Vec::with_capacity(ids.len());
        for id in ids {
            if slots.iter().any(|slot| slot.id == *id) {
                continue;
            }
            let saved = self.by_id.get(id).and_then(|entry| {
                self.all_ids
                    .iter()
                    .position(|existing| existing == id)
                    .map(|index| (index, entry.clone()))
            });
            slots.push(SnapshotSlot { id: *id, saved });
        }
        EntrySnapshot { slots }
    }

    /// Put the captured entries back exactly as they were.
    ///
    /// Ids that were absent at snapshot time are removed. No merging happens.
    pub fn restore(&mut self, snapshot: &EntrySnapshot) {
        for slot in &snapshot.slots {
            self.delete_entry(slot.id);
        }

        let mut saved: Vec<&(usize, ScheduledRecipeEntry)> =
            snapshot.slots.iter().filter_map(|slot| slot.saved.as_ref()).collect();
        saved.sort_by_key(|(index, _)| *index);

        for (index, entry) in saved {
            let index = (*index).min(self.all_ids.len());
            self.all_ids.insert(index, entry.id);
            self.by_id.insert(entry.id, entry.clone());
        }
    }

    /// True if every entry in `snapshot` is still exactly as captured.
    ///
    /// Ids that were absent at snapshot time must still be absent. Index
    /// positions are not compared.
    pub fn unchanged_since(&self, snapshot: &EntrySnapshot) -> bool {
        snapshot.slots.iter().all(|slot| match &slot.saved {
            Some((_, entry)) => self.by_id.get(&slot.id) == Some(entry),
            None => !self.by_id.contains_key(&slot.id),
        })
    }

    /// Fails with the first pair of entries sharing a placement
    pub fn check_consistency(&self) -> PlannerResult<()> {
        match self.placement_conflicts().first() {
            Some(&(existing, incoming)) => Err(PlannerError::ConflictError { incoming, existing }),
            None => Ok(()),
        }
    }

    /// Pairs of live entries sharing a placement. Empty whenever the store is consistent.
    pub fn placement_conflicts(&self) -> Vec<(EntryId, EntryId)> {
        let mut seen = HashMap::new();
        let mut conflicts = Vec::new();
        for entry in self.entries() {
            if let Some(first) = seen.insert(entry.placement(), entry.id) {
                conflicts.push((first, entry.id));
            }
        }
        conflicts
    }

    /// Insert or overwrite by id without merging. Returns true if the id existed.
    fn upsert_in_place(&mut self, entry: ScheduledRecipeEntry) -> bool {
        let id = entry.id;
        let existed = self.by_id.insert(id, entry).is_some();
        if !existed {
            self.all_ids.push(id);
        }
        existed
    }
}
