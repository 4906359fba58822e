//! Optimistic mutation coordinator
//!
//! Each user action is applied to the store immediately and turned into
//! commands for the runtime to execute. When the remote call finishes, the
//! runtime feeds a [`Completion`] back and the coordinator either keeps the
//! optimistic state (reconciled with the server's answer) or restores the
//! exact state captured before the action.
//!
//! Nothing here performs I/O. Network calls and notifications only leave as
//! [`Command`] values.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    component_debug, component_warn, ComponentId, EntryId, EntryPatch, Owner, Placement, RecipeId,
    ScheduledRecipeEntry, UserId,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use uuid::Uuid;

use super::merge;
use super::policy::{ChangeWindow, MoveKind};
use super::store::{EntrySnapshot, MoveOutcome, ScheduleStore};
use crate::error::{PlannerError, PlannerResult};

/// Finished actions remembered for state queries
const MAX_HISTORY: usize = 100;

/// Identifier of one dispatched user action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(Uuid);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Create {
        recipe_id: RecipeId,
        recipe_name: String,
        owner: Owner,
        on: NaiveDate,
        count: u32,
    },
    Move {
        id: EntryId,
        to: NaiveDate,
        /// Modifier key held: keep the original and schedule a copy
        duplicate: bool,
    },
    Delete {
        id: EntryId,
    },
    ChangeCount {
        id: EntryId,
        count: u32,
    },
}

/// Kind of action, as reported to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Create,
    Move,
    Copy,
    Delete,
    ChangeCount,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Create => write!(f, "create"),
            ActionKind::Move => write!(f, "move"),
            ActionKind::Copy => write!(f, "copy"),
            ActionKind::Delete => write!(f, "delete"),
            ActionKind::ChangeCount => write!(f, "change count"),
        }
    }
}

/// Lifecycle of one action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Idle,
    Applied,
    Confirmed,
    RolledBack,
}

/// Final result reported for an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed { reason: String },
}

/// User-facing completion signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub action: ActionId,
    pub kind: ActionKind,
    pub entry: EntryId,
    pub outcome: Outcome,
}

impl Notice {
    pub fn succeeded(&self) -> bool {
        self.outcome == Outcome::Succeeded
    }
}

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateRemote {
        action: ActionId,
        pending: EntryId,
        recipe_id: RecipeId,
        owner: Owner,
        on: NaiveDate,
        count: u32,
    },
    UpdateRemote {
        action: ActionId,
        id: u64,
        owner: Owner,
        patch: EntryPatch,
    },
    DeleteRemote {
        action: ActionId,
        id: u64,
        owner: Owner,
    },
    Notify(Notice),
}

/// Result of a remote call, fed back by the runtime
#[derive(Debug)]
pub enum Completion {
    Created {
        action: ActionId,
        result: PlannerResult<ScheduledRecipeEntry>,
    },
    Updated {
        action: ActionId,
        result: PlannerResult<ScheduledRecipeEntry>,
    },
    Deleted {
        action: ActionId,
        result: PlannerResult<()>,
    },
}

impl Completion {
    pub fn action(&self) -> ActionId {
        match self {
            Completion::Created { action, .. } | Completion::Updated { action, .. } | Completion::Deleted { action, .. } => {
                *action
            }
        }
    }
}

/// State change produced by a dispatch or completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub action: ActionId,
    pub kind: ActionKind,
    pub state: ActionState,
    pub commands: Vec<Command>,
}

/// Bookkeeping for an action awaiting its remote call
#[derive(Debug, Clone)]
struct InFlight {
    kind: ActionKind,
    /// Entry the notice reports on
    subject: EntryId,
    effect: Effect,
    /// Touched entries just before and just after the optimistic write
    before: EntrySnapshot,
    after: EntrySnapshot,
}

/// Local change an action made, kept to undo it or replay it over fresh data
#[derive(Debug, Clone)]
enum Effect {
    Create {
        pending: EntryId,
        placement: Placement,
        count: u32,
        /// Entry folded into the pending one when it was written
        absorbed: Option<ScheduledRecipeEntry>,
    },
    Move {
        mover: ScheduledRecipeEntry,
        to: NaiveDate,
    },
    Count {
        entry: ScheduledRecipeEntry,
        count: u32,
    },
    Delete {
        entry: ScheduledRecipeEntry,
    },
}

impl Effect {
    /// Count this action added on `placement` that the server has not acknowledged
    fn carried_on(&self, placement: &Placement) -> u32 {
        match self {
            Effect::Create {
                placement: own, count, ..
            } if own == placement => *count,
            Effect::Move { mover, to } if destination(mover, *to) == *placement => mover.count,
            _ => 0,
        }
    }
}

fn destination(mover: &ScheduledRecipeEntry, to: NaiveDate) -> Placement {
    Placement { on: to, ..mover.placement() }
}

/// Set a live entry's count, removing it at zero
fn adjust(store: &mut ScheduleStore, id: EntryId, count: u32) {
    if let Err(err) = store.set_count(id, count) {
        component_debug!(ComponentId::current(), "Skipping count adjustment: {}", err);
    }
}

/// Put a snapshot back, then let each restored entry fold in whatever has
/// been written onto its placement since
fn restore_and_fold(store: &mut ScheduleStore, snapshot: &EntrySnapshot) {
    store.restore(snapshot);
    for id in snapshot.ids() {
        if let Some(entry) = store.get(id).cloned() {
            store.set_entry(entry);
        }
    }
}

/// Coordinates optimistic create/move/delete/count actions
pub struct Coordinator {
    user_id: UserId,
    window: ChangeWindow,
    in_flight: HashMap<ActionId, InFlight>,
    history: VecDeque<(ActionId, ActionState)>,
    rng: StdRng,
}

impl Coordinator {
    /// Create a coordinator acting as `user_id`
    pub fn new(user_id: UserId, window: ChangeWindow) -> Self {
        Self {
            user_id,
            window,
            in_flight: HashMap::new(),
            history: VecDeque::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic pending ids, for tests
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn window(&self) -> ChangeWindow {
        self.window
    }

    /// Number of actions awaiting a remote response
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Pending ids owned by creates still awaiting the server
    pub fn pending_ids(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.in_flight.values().filter_map(|flight| match flight.effect {
            Effect::Create { pending, .. } => Some(pending),
            _ => None,
        })
    }

    pub fn state(&self, action: ActionId) -> ActionState {
        if self.in_flight.contains_key(&action) {
            return ActionState::Applied;
        }
        self.history
            .iter()
            .rev()
            .find(|(id, _)| *id == action)
            .map(|(_, state)| *state)
            .unwrap_or(ActionState::Idle)
    }

    /// Apply an intent optimistically and return the remote commands to run.
    ///
    /// Fails with `NotFoundError` for ids no longer in the store (nothing is
    /// changed), `UnconfirmedError` when moving, deleting or recounting an
    /// entry that has no server id yet, and `InvalidCountError` for a create
    /// with a zero count.
    pub fn dispatch(&mut self, store: &mut ScheduleStore, intent: Intent, today: NaiveDate) -> PlannerResult<Transition> {
        match intent {
            Intent::Create {
                recipe_id,
                recipe_name,
                owner,
                on,
                count,
            } => {
                if count == 0 {
                    return Err(PlannerError::InvalidCountError { count });
                }
                Ok(self.begin_create(store, ActionKind::Create, recipe_id, recipe_name, owner, on, count))
            }
            Intent::Move { id, to, duplicate } => self.begin_move(store, id, to, duplicate, today),
            Intent::Delete { id } => self.begin_delete(store, id),
            Intent::ChangeCount { id, count } => self.begin_change_count(store, id, count),
        }
    }

    /// Reconcile the store with a finished remote call.
    ///
    /// Returns `None` for completions of unknown or already finished actions.
    pub fn complete(&mut self, store: &mut ScheduleStore, completion: Completion) -> Option<Transition> {
        let action = completion.action();
        let Some(flight) = self.in_flight.remove(&action) else {
            component_warn!(ComponentId::current(), "⚠️ Ignoring completion for unknown action {}", action);
            return None;
        };

        let failure = match completion {
            Completion::Created { result, .. } => match result {
                Ok(confirmed) => {
                    component_debug!(ComponentId::current(), "✅ {} confirmed as {}", flight.subject, confirmed.id);
                    store.delete_entry(flight.subject);
                    self.reconcile(store, confirmed);
                    None
                }
                Err(err) => Some(err),
            },
            Completion::Updated { result, .. } => match result {
                Ok(confirmed) => {
                    if self.undisturbed(store, &flight) {
                        // The local merge folded away the id the server answered for
                        if !store.contains(confirmed.id) {
                            restore_and_fold(store, &flight.before);
                        }
                        store.set_entry(confirmed);
                    } else {
                        self.reconcile(store, confirmed);
                    }
                    None
                }
                Err(err) => Some(err),
            },
            Completion::Deleted { result, .. } => result.err(),
        };

        let (state, outcome) = match failure {
            None => (ActionState::Confirmed, Outcome::Succeeded),
            Some(err) => {
                component_warn!(
                    ComponentId::current(),
                    "↩️ Rolling back {} of {}: {}",
                    flight.kind,
                    flight.subject,
                    err
                );
                self.roll_back(store, &flight);
                (ActionState::RolledBack, Outcome::Failed { reason: err.to_string() })
            }
        };

        if let Err(conflict) = store.check_consistency() {
            component_warn!(ComponentId::current(), "⚠️ Store inconsistent after {}: {}", flight.kind, conflict);
        }

        self.record(action, state);
        Some(Transition {
            action,
            kind: flight.kind,
            state,
            commands: vec![Command::Notify(Notice {
                action,
                kind: flight.kind,
                entry: flight.subject,
                outcome,
            })],
        })
    }

    /// Replay in-flight actions over entries a range fetch just overwrote.
    ///
    /// `fetched` holds the ids of the payload. Actions whose local change was
    /// reset to the server's row are applied again; the rest are untouched.
    pub fn rebase(&self, store: &mut ScheduleStore, fetched: &HashSet<EntryId>) {
        let fetched_at = |store: &ScheduleStore, placement: &Placement| {
            merge::entry_at(store.entries(), placement)
                .filter(|entry| fetched.contains(&entry.id))
                .map(|entry| (entry.id, entry.count))
        };

        for flight in self.in_flight.values() {
            match &flight.effect {
                Effect::Create {
                    pending, placement, count, ..
                } => {
                    if store.contains(*pending) {
                        continue;
                    }
                    if let Some((holder, current)) = fetched_at(&*store, placement) {
                        adjust(store, holder, merge::merged_count(current, *count));
                    }
                }
                Effect::Move { mover, to } => {
                    if fetched.contains(&mover.id) {
                        if let Err(err) = store.move_entry(mover.id, *to) {
                            component_debug!(ComponentId::current(), "Not replaying move: {}", err);
                        }
                    } else if !store.contains(mover.id) {
                        if let Some((holder, current)) = fetched_at(&*store, &destination(mover, *to)) {
                            adjust(store, holder, merge::merged_count(current, mover.count));
                        }
                    }
                }
                Effect::Count { entry, count } => {
                    if fetched.contains(&entry.id) && store.contains(entry.id) {
                        adjust(store, entry.id, *count);
                    }
                }
                Effect::Delete { entry } => {
                    if fetched.contains(&entry.id) {
                        store.delete_entry(entry.id);
                    }
                }
            }
        }
    }

    /// Write a server answer, keeping the counts other in-flight actions
    /// still carry on its placement
    fn reconcile(&self, store: &mut ScheduleStore, confirmed: ScheduledRecipeEntry) {
        let placement = confirmed.placement();
        let carried = self
            .in_flight
            .values()
            .fold(0, |total, flight| merge::merged_count(total, flight.effect.carried_on(&placement)));

        if let Some(holder) = merge::find_collision(store.entries(), &placement, confirmed.id).map(|entry| entry.id) {
            store.delete_entry(holder);
        }
        let count = merge::merged_count(confirmed.count, carried);
        store.set_entry(ScheduledRecipeEntry { count, ..confirmed });
    }

    /// Undo a failed action.
    ///
    /// When nothing has touched its entries since, the captured state is put
    /// back verbatim. Otherwise only the action's own contribution is taken
    /// out of wherever it now lives.
    fn roll_back(&mut self, store: &mut ScheduleStore, flight: &InFlight) {
        if self.undisturbed(store, flight) {
            restore_and_fold(store, &flight.before);
        } else {
            match &flight.effect {
                Effect::Create {
                    pending,
                    placement,
                    count,
                    absorbed,
                } => self.withdraw_create(store, *pending, placement, *count, absorbed.as_ref()),
                Effect::Move { mover, to } => match store.get(mover.id).cloned() {
                    Some(current) if current.on == *to => {
                        store.set_entry(ScheduledRecipeEntry { on: mover.on, ..current });
                    }
                    // Moved again since; the later action owns it
                    Some(_) => {}
                    None => {
                        let target = merge::entry_at(store.entries(), &destination(mover, *to))
                            .map(|entry| (entry.id, entry.count));
                        if let Some((holder, current)) = target {
                            adjust(store, holder, current.saturating_sub(mover.count));
                        }
                        store.set_entry(mover.clone());
                    }
                },
                Effect::Count { entry, count } => {
                    let undo = |current: u32| current.saturating_add(entry.count).saturating_sub(*count);
                    match store.get(entry.id).map(|live| live.count) {
                        Some(current) => adjust(store, entry.id, undo(current)),
                        None if *count == 0 => {
                            store.set_entry(entry.clone());
                        }
                        None => {
                            let holder = merge::entry_at(store.entries(), &entry.placement())
                                .map(|holder| (holder.id, holder.count));
                            if let Some((holder, current)) = holder {
                                adjust(store, holder, undo(current));
                            }
                        }
                    }
                }
                Effect::Delete { entry } => {
                    if !store.contains(entry.id) {
                        store.set_entry(entry.clone());
                    }
                }
            }
        }

        // Creates that folded this pending entry in now answer for what it had absorbed
        if let Effect::Create { pending, absorbed, .. } = &flight.effect {
            for other in self.in_flight.values_mut() {
                if let Effect::Create { absorbed: theirs, .. } = &mut other.effect {
                    if theirs.as_ref().map(|entry| entry.id) == Some(*pending) {
                        *theirs = absorbed.clone();
                    }
                }
            }
        }
    }

    /// Take a failed create's count back out of its placement
    fn withdraw_create(
        &self,
        store: &mut ScheduleStore,
        pending: EntryId,
        placement: &Placement,
        count: u32,
        absorbed: Option<&ScheduledRecipeEntry>,
    ) {
        let Some((holder, current)) = merge::entry_at(store.entries(), placement).map(|entry| (entry.id, entry.count))
        else {
            return;
        };
        let remaining = current.saturating_sub(count);
        if holder != pending || remaining == 0 {
            adjust(store, holder, remaining);
            return;
        }

        // The pending entry still holds what it absorbed; hand it back
        store.delete_entry(pending);
        match absorbed.filter(|entry| self.restorable(entry.id)) {
            Some(entry) => {
                store.set_entry(ScheduledRecipeEntry {
                    count: remaining,
                    ..entry.clone()
                });
            }
            None => component_warn!(
                ComponentId::current(),
                "⚠️ Dropping count {} on {} with no owning entry",
                remaining,
                placement.on
            ),
        }
    }

    /// Nothing has touched the action's entries since it was applied, and
    /// putting them back would not revive a pending entry nobody owns
    fn undisturbed(&self, store: &ScheduleStore, flight: &InFlight) -> bool {
        store.unchanged_since(&flight.after) && flight.before.entries().all(|entry| self.restorable(entry.id))
    }

    fn restorable(&self, id: EntryId) -> bool {
        !id.is_pending() || self.pending_ids().any(|pending| pending == id)
    }

    #[allow(clippy::too_many_arguments)]
    fn begin_create(
        &mut self,
        store: &mut ScheduleStore,
        kind: ActionKind,
        recipe_id: RecipeId,
        recipe_name: String,
        owner: Owner,
        on: NaiveDate,
        count: u32,
    ) -> Transition {
        let action = ActionId::new();
        let pending = ScheduledRecipeEntry {
            id: self.allocate_pending_id(store),
            recipe_id,
            recipe_name,
            owner,
            user_id: self.user_id,
            on,
            count,
        };
        let pending_id = pending.id;
        let placement = pending.placement();

        let absorbed = merge::find_collision(store.entries(), &placement, pending_id).cloned();
        let mut touched = vec![pending_id];
        touched.extend(absorbed.as_ref().map(|entry| entry.id));

        let before = store.snapshot(&touched);
        store.set_entry(pending);
        let after = store.snapshot(&touched);

        self.in_flight.insert(
            action,
            InFlight {
                kind,
                subject: pending_id,
                effect: Effect::Create {
                    pending: pending_id,
                    placement,
                    count,
                    absorbed,
                },
                before,
                after,
            },
        );

        Transition {
            action,
            kind,
            state: ActionState::Applied,
            commands: vec![Command::CreateRemote {
                action,
                pending: pending_id,
                recipe_id,
                owner,
                on,
                count,
            }],
        }
    }

    fn begin_move(
        &mut self,
        store: &mut ScheduleStore,
        id: EntryId,
        to: NaiveDate,
        duplicate: bool,
        today: NaiveDate,
    ) -> PlannerResult<Transition> {
        let entry = store.get(id).cloned().ok_or(PlannerError::NotFoundError { id })?;

        if self.window.classify(entry.on, today, duplicate) == MoveKind::Copy {
            return Ok(self.begin_create(
                store,
                ActionKind::Copy,
                entry.recipe_id,
                entry.recipe_name,
                entry.owner,
                to,
                entry.count,
            ));
        }

        let server_id = id.server_id().ok_or(PlannerError::UnconfirmedError { id })?;

        let mut touched = vec![id];
        touched.extend(merge::find_move_target(store.entries(), &entry, to).map(|e| e.id));
        let before = store.snapshot(&touched);

        let action = ActionId::new();
        match store.move_entry(id, to)? {
            MoveOutcome::Unchanged { .. } => return Ok(self.finish_immediately(action, ActionKind::Move, id)),
            MoveOutcome::Moved { .. } => {}
            MoveOutcome::Merged { into, count, .. } => {
                component_debug!(ComponentId::current(), "🔀 Move of {} merged into {} (count {})", id, into, count);
            }
        }
        let after = store.snapshot(&touched);

        let owner = entry.owner;
        self.in_flight.insert(
            action,
            InFlight {
                kind: ActionKind::Move,
                subject: id,
                effect: Effect::Move { mover: entry, to },
                before,
                after,
            },
        );

        Ok(Transition {
            action,
            kind: ActionKind::Move,
            state: ActionState::Applied,
            commands: vec![Command::UpdateRemote {
                action,
                id: server_id,
                owner,
                patch: EntryPatch::date(to),
            }],
        })
    }

    fn begin_delete(&mut self, store: &mut ScheduleStore, id: EntryId) -> PlannerResult<Transition> {
        let entry = store.get(id).cloned().ok_or(PlannerError::NotFoundError { id })?;
        let server_id = id.server_id().ok_or(PlannerError::UnconfirmedError { id })?;

        let before = store.snapshot(&[id]);
        store.delete_entry(id);
        let after = store.snapshot(&[id]);

        let action = ActionId::new();
        let owner = entry.owner;
        self.in_flight.insert(
            action,
            InFlight {
                kind: ActionKind::Delete,
                subject: id,
                effect: Effect::Delete { entry },
                before,
                after,
            },
        );

        Ok(Transition {
            action,
            kind: ActionKind::Delete,
            state: ActionState::Applied,
            commands: vec![Command::DeleteRemote {
                action,
                id: server_id,
                owner,
            }],
        })
    }

    fn begin_change_count(&mut self, store: &mut ScheduleStore, id: EntryId, count: u32) -> PlannerResult<Transition> {
        let entry = store.get(id).cloned().ok_or(PlannerError::NotFoundError { id })?;
        let server_id = id.server_id().ok_or(PlannerError::UnconfirmedError { id })?;

        let action = ActionId::new();
        if entry.count == count {
            return Ok(self.finish_immediately(action, ActionKind::ChangeCount, id));
        }

        let before = store.snapshot(&[id]);
        store.set_count(id, count)?;
        let after = store.snapshot(&[id]);

        let owner = entry.owner;
        self.in_flight.insert(
            action,
            InFlight {
                kind: ActionKind::ChangeCount,
                subject: id,
                effect: Effect::Count { entry, count },
                before,
                after,
            },
        );

        let command = if count == 0 {
            Command::DeleteRemote {
                action,
                id: server_id,
                owner,
            }
        } else {
            Command::UpdateRemote {
                action,
                id: server_id,
                owner,
                patch: EntryPatch::count(count),
            }
        };

        Ok(Transition {
            action,
            kind: ActionKind::ChangeCount,
            state: ActionState::Applied,
            commands: vec![command],
        })
    }

    /// Action with nothing to send: confirmed on the spot
    fn finish_immediately(&mut self, action: ActionId, kind: ActionKind, id: EntryId) -> Transition {
        self.record(action, ActionState::Confirmed);
        Transition {
            action,
            kind,
            state: ActionState::Confirmed,
            commands: vec![Command::Notify(Notice {
                action,
                kind,
                entry: id,
                outcome: Outcome::Succeeded,
            })],
        }
    }

    fn allocate_pending_id(&mut self, store: &ScheduleStore) -> EntryId {
        loop {
            let candidate = EntryId::Pending(self.rng.gen());
            if !store.contains(candidate) {
                return candidate;
            }
        }
    }

    fn record(&mut self, action: ActionId, state: ActionState) {
        self.history.push_back((action, state));
        while self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 5, d).unwrap()
    }

    fn confirmed(id: u64, recipe: u64, d: u32, count: u32) -> ScheduledRecipeEntry {
        ScheduledRecipeEntry {
            id: EntryId::Confirmed(id),
            recipe_id: RecipeId(recipe),
            recipe_name: format!("recipe {recipe}"),
            owner: Owner::Personal,
            user_id: UserId(1),
            on: day(d),
            count,
        }
    }

    fn coordinator() -> Coordinator {
        Coordinator::new(UserId(1), ChangeWindow::default()).with_seed(7)
    }

    fn create(recipe: u64, d: u32) -> Intent {
        Intent::Create {
            recipe_id: RecipeId(recipe),
            recipe_name: format!("recipe {recipe}"),
            owner: Owner::Personal,
            on: day(d),
            count: 1,
        }
    }

    fn notice(transition: &Transition) -> &Notice {
        match &transition.commands[0] {
            Command::Notify(notice) => notice,
            other => panic!("expected notice, got {other:?}"),
        }
    }

    #[test]
    fn test_create_applies_pending_entry_and_emits_remote_call() {
        let mut store = ScheduleStore::new();
        let mut coordinator = coordinator();

        let transition = coordinator.dispatch(&mut store, create(9, 11), day(1)).unwrap();

        assert_eq!(transition.state, ActionState::Applied);
        let Command::CreateRemote { pending, .. } = transition.commands[0].clone() else {
            panic!("expected create command");
        };
        assert!(pending.is_pending());
        assert!(store.contains(pending));
        assert_eq!(coordinator.state(transition.action), ActionState::Applied);
    }

    #[test]
    fn test_failed_create_restores_absorbed_entry() {
        let mut store = ScheduleStore::new();
        store.set_entry(confirmed(1, 9, 11, 2));
        let before = store.clone();
        let mut coordinator = coordinator();

        let transition = coordinator.dispatch(&mut store, create(9, 11), day(1)).unwrap();
        assert_eq!(store.len(), 1);
        assert!(!store.contains(EntryId::Confirmed(1)));

        let done = coordinator
            .complete(
                &mut store,
                Completion::Created {
                    action: transition.action,
                    result: Err(PlannerError::network("offline")),
                },
            )
            .unwrap();

        assert_eq!(done.state, ActionState::RolledBack);
        assert!(!notice(&done).succeeded());
        assert_eq!(store, before);
    }

    #[test]
    fn test_past_entry_move_becomes_copy() {
        let mut store = ScheduleStore::new();
        store.set_entry(confirmed(1, 9, 2, 3));
        let mut coordinator = coordinator();

        let transition = coordinator
            .dispatch(
                &mut store,
                Intent::Move {
                    id: EntryId::Confirmed(1),
                    to: day(12),
                    duplicate: false,
                },
                day(10),
            )
            .unwrap();

        assert_eq!(transition.kind, ActionKind::Copy);
        assert_eq!(store.get(EntryId::Confirmed(1)).unwrap().on, day(2));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_moving_pending_entry_is_rejected() {
        let mut store = ScheduleStore::new();
        let mut coordinator = coordinator();
        let created = coordinator.dispatch(&mut store, create(9, 11), day(1)).unwrap();
        let Command::CreateRemote { pending, .. } = created.commands[0].clone() else {
            panic!("expected create command");
        };

        let err = coordinator
            .dispatch(
                &mut store,
                Intent::Move {
                    id: pending,
                    to: day(12),
                    duplicate: false,
                },
                day(1),
            )
            .unwrap_err();

        assert!(matches!(err, PlannerError::UnconfirmedError { .. }));
    }

    #[test]
    fn test_move_success_keeps_server_answer() {
        let mut store = ScheduleStore::new();
        store.set_entry(confirmed(1, 9, 11, 3));
        store.set_entry(confirmed(2, 9, 12, 3));
        let mut coordinator = coordinator();

        let transition = coordinator
            .dispatch(
                &mut store,
                Intent::Move {
                    id: EntryId::Confirmed(1),
                    to: day(12),
                    duplicate: false,
                },
                day(1),
            )
            .unwrap();

        let done = coordinator
            .complete(
                &mut store,
                Completion::Updated {
                    action: transition.action,
                    result: Ok(confirmed(2, 9, 12, 6)),
                },
            )
            .unwrap();

        assert_eq!(done.state, ActionState::Confirmed);
        assert_eq!(store.ids(), &[EntryId::Confirmed(2)]);
        assert_eq!(store.get(EntryId::Confirmed(2)).unwrap().count, 6);
    }

    #[test]
    fn test_unmerged_server_answer_reconciles_to_one_entry() {
        let mut store = ScheduleStore::new();
        store.set_entry(confirmed(1, 9, 11, 3));
        store.set_entry(confirmed(2, 9, 12, 3));
        let mut coordinator = coordinator();

        let transition = coordinator
            .dispatch(
                &mut store,
                Intent::Move {
                    id: EntryId::Confirmed(1),
                    to: day(12),
                    duplicate: false,
                },
                day(1),
            )
            .unwrap();

        coordinator.complete(
            &mut store,
            Completion::Updated {
                action: transition.action,
                result: Ok(confirmed(1, 9, 12, 3)),
            },
        );

        assert_eq!(store.ids(), &[EntryId::Confirmed(1)]);
        assert_eq!(store.get(EntryId::Confirmed(1)).unwrap().count, 6);
        assert!(store.placement_conflicts().is_empty());
    }

    #[test]
    fn test_failed_delete_reinserts_entry() {
        let mut store = ScheduleStore::new();
        store.set_entry(confirmed(1, 9, 11, 3));
        let mut coordinator = coordinator();

        let transition = coordinator
            .dispatch(&mut store, Intent::Delete { id: EntryId::Confirmed(1) }, day(1))
            .unwrap();
        assert!(store.is_empty());

        coordinator.complete(
            &mut store,
            Completion::Deleted {
                action: transition.action,
                result: Err(PlannerError::http_status(500, "boom")),
            },
        );

        assert_eq!(store.get(EntryId::Confirmed(1)).unwrap().count, 3);
        assert_eq!(coordinator.state(transition.action), ActionState::RolledBack);
    }

    #[test]
    fn test_change_count_to_zero_deletes_remotely() {
        let mut store = ScheduleStore::new();
        store.set_entry(confirmed(1, 9, 11, 3));
        let mut coordinator = coordinator();

        let transition = coordinator
            .dispatch(
                &mut store,
                Intent::ChangeCount {
                    id: EntryId::Confirmed(1),
                    count: 0,
                },
                day(1),
            )
            .unwrap();

        assert!(store.is_empty());
        assert!(matches!(transition.commands[0], Command::DeleteRemote { id: 1, .. }));
    }

    #[test]
    fn test_unchanged_count_finishes_without_remote_call() {
        let mut store = ScheduleStore::new();
        store.set_entry(confirmed(1, 9, 11, 3));
        let mut coordinator = coordinator();

        let transition = coordinator
            .dispatch(
                &mut store,
                Intent::ChangeCount {
                    id: EntryId::Confirmed(1),
                    count: 3,
                },
                day(1),
            )
            .unwrap();

        assert_eq!(transition.state, ActionState::Confirmed);
        assert!(notice(&transition).succeeded());
        assert_eq!(coordinator.in_flight(), 0);
    }

    fn pending_of(transition: &Transition) -> EntryId {
        match &transition.commands[0] {
            Command::CreateRemote { pending, .. } => *pending,
            other => panic!("expected create command, got {other:?}"),
        }
    }

    fn fail_create(coordinator: &mut Coordinator, store: &mut ScheduleStore, transition: &Transition) {
        coordinator.complete(
            store,
            Completion::Created {
                action: transition.action,
                result: Err(PlannerError::network("offline")),
            },
        );
    }

    fn assert_no_orphans(coordinator: &Coordinator, store: &ScheduleStore) {
        let owned: Vec<EntryId> = coordinator.pending_ids().collect();
        for id in store.ids() {
            assert!(!id.is_pending() || owned.contains(id), "{id} outlived its action");
        }
    }

    #[test]
    fn test_zero_count_create_is_rejected() {
        let mut store = ScheduleStore::new();
        let mut coordinator = coordinator();
        let intent = Intent::Create {
            recipe_id: RecipeId(9),
            recipe_name: "recipe 9".to_string(),
            owner: Owner::Personal,
            on: day(11),
            count: 0,
        };

        let err = coordinator.dispatch(&mut store, intent, day(1)).unwrap_err();

        assert!(matches!(err, PlannerError::InvalidCountError { count: 0 }));
        assert!(store.is_empty());
        assert_eq!(coordinator.in_flight(), 0);
    }

    #[test]
    fn test_two_failed_creates_on_one_placement_leave_nothing() {
        for first_fails_first in [true, false] {
            let mut store = ScheduleStore::new();
            let mut coordinator = coordinator();

            let first = coordinator.dispatch(&mut store, create(9, 11), day(1)).unwrap();
            let second = coordinator.dispatch(&mut store, create(9, 11), day(1)).unwrap();
            assert_eq!(store.ids(), &[pending_of(&second)]);
            assert_eq!(store.get(pending_of(&second)).unwrap().count, 2);

            if first_fails_first {
                fail_create(&mut coordinator, &mut store, &first);
                assert_eq!(store.get(pending_of(&second)).unwrap().count, 1);
                assert_no_orphans(&coordinator, &store);
                fail_create(&mut coordinator, &mut store, &second);
            } else {
                fail_create(&mut coordinator, &mut store, &second);
                assert_eq!(store.ids(), &[pending_of(&first)]);
                assert_no_orphans(&coordinator, &store);
                fail_create(&mut coordinator, &mut store, &first);
            }

            assert!(store.is_empty(), "store still holds {:?}", store.ids());
            assert_eq!(coordinator.in_flight(), 0);
        }
    }

    #[test]
    fn test_failed_create_gives_back_count_folded_into_confirmed_entry() {
        let mut store = ScheduleStore::new();
        let mut coordinator = coordinator();

        let first = coordinator.dispatch(&mut store, create(9, 11), day(1)).unwrap();
        let second = coordinator.dispatch(&mut store, create(9, 11), day(1)).unwrap();

        coordinator.complete(
            &mut store,
            Completion::Created {
                action: first.action,
                result: Ok(confirmed(40, 9, 11, 1)),
            },
        );
        assert_eq!(store.ids(), &[EntryId::Confirmed(40)]);
        assert_eq!(store.get(EntryId::Confirmed(40)).unwrap().count, 2);

        fail_create(&mut coordinator, &mut store, &second);

        assert_eq!(store.ids(), &[EntryId::Confirmed(40)]);
        assert_eq!(store.get(EntryId::Confirmed(40)).unwrap().count, 1);
        assert_no_orphans(&coordinator, &store);
    }

    #[test]
    fn test_failed_create_hands_back_absorbed_entry_after_later_create() {
        let mut store = ScheduleStore::new();
        store.set_entry(confirmed(1, 9, 11, 2));
        let mut coordinator = coordinator();

        let first = coordinator.dispatch(&mut store, create(9, 11), day(1)).unwrap();
        let second = coordinator.dispatch(&mut store, create(9, 11), day(1)).unwrap();
        assert_eq!(store.get(pending_of(&second)).unwrap().count, 4);

        fail_create(&mut coordinator, &mut store, &first);
        fail_create(&mut coordinator, &mut store, &second);

        assert_eq!(store.ids(), &[EntryId::Confirmed(1)]);
        assert_eq!(store.get(EntryId::Confirmed(1)).unwrap().count, 2);
    }

    #[test]
    fn test_failed_move_after_create_absorbed_the_mover() {
        let mut store = ScheduleStore::new();
        store.set_entry(confirmed(1, 9, 11, 3));
        let mut coordinator = coordinator();

        let moved = coordinator
            .dispatch(
                &mut store,
                Intent::Move {
                    id: EntryId::Confirmed(1),
                    to: day(12),
                    duplicate: false,
                },
                day(1),
            )
            .unwrap();
        let created = coordinator.dispatch(&mut store, create(9, 12), day(1)).unwrap();
        assert_eq!(store.ids(), &[pending_of(&created)]);

        coordinator.complete(
            &mut store,
            Completion::Updated {
                action: moved.action,
                result: Err(PlannerError::network("offline")),
            },
        );

        let back = store.get(EntryId::Confirmed(1)).unwrap();
        assert_eq!((back.on, back.count), (day(11), 3));
        assert_eq!(store.get(pending_of(&created)).unwrap().count, 1);
        assert!(store.placement_conflicts().is_empty());
        assert_no_orphans(&coordinator, &store);
    }

    #[test]
    fn test_rebase_replays_move_over_fetched_rows() {
        let mut store = ScheduleStore::new();
        store.set_entry(confirmed(1, 9, 11, 3));
        let mut coordinator = coordinator();
        coordinator
            .dispatch(
                &mut store,
                Intent::Move {
                    id: EntryId::Confirmed(1),
                    to: day(20),
                    duplicate: false,
                },
                day(1),
            )
            .unwrap();

        let range = crate::core::store::DateRange::new(Owner::Personal, day(15), day(25));
        let payload = vec![confirmed(6, 9, 20, 2)];
        let fetched: HashSet<EntryId> = payload.iter().map(|entry| entry.id).collect();

        store.fetch_range_success(range, payload.clone());
        coordinator.rebase(&mut store, &fetched);
        assert_eq!(store.ids(), &[EntryId::Confirmed(6)]);
        assert_eq!(store.get(EntryId::Confirmed(6)).unwrap().count, 5);

        let once = store.clone();
        store.fetch_range_success(range, payload);
        coordinator.rebase(&mut store, &fetched);
        assert_eq!(store, once);
    }

    #[test]
    fn test_unknown_completion_is_ignored() {
        let mut store = ScheduleStore::new();
        let mut coordinator = coordinator();

        let result = coordinator.complete(
            &mut store,
            Completion::Deleted {
                action: ActionId::new(),
                result: Ok(()),
            },
        );

        assert!(result.is_none());
    }
}
