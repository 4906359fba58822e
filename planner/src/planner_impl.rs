//! Planner runtime
//!
//! Owns the schedule store and the coordinator, executes the commands they
//! produce against the injected services, and publishes store snapshots to
//! subscribers. Remote calls run as spawned tasks and report back through a
//! channel; completions are applied one at a time by whoever owns the planner.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

use shared::{
    component_debug, component_info, component_warn, logging, CalendarSettings, ComponentId, EntryId, Owner, UserId,
};

use crate::core::{
    views, ActionId, ActionKind, ActionState, ChangeWindow, Clock, Command, Completion, Coordinator, DateRange,
    DayMap, Intent, Notice, ScheduleStore, SystemClock,
};
use crate::error::PlannerResult;
use crate::traits::{Notifier, ScheduleApi};

const COMPLETION_BUFFER: usize = 100;

/// Handle to one dispatched action
#[derive(Debug)]
pub struct ActionHandle {
    pub action: ActionId,
    pub kind: ActionKind,
    receiver: oneshot::Receiver<Notice>,
}

impl ActionHandle {
    /// Wait for the action's notice. `None` if the planner was dropped first.
    pub async fn finished(self) -> Option<Notice> {
        self.receiver.await.ok()
    }
}

/// Live day-by-day view of one owner's date range
#[derive(Debug, Clone)]
pub struct CalendarSubscription {
    range: DateRange,
    receiver: watch::Receiver<Arc<ScheduleStore>>,
}

impl CalendarSubscription {
    pub fn range(&self) -> DateRange {
        self.range
    }

    /// Projection of the latest published snapshot
    pub fn current(&self) -> DayMap {
        views::by_day(&self.receiver.borrow(), &self.range)
    }

    /// Wait for the next published snapshot. `None` once the planner is gone.
    pub async fn changed(&mut self) -> Option<DayMap> {
        self.receiver.changed().await.ok()?;
        Some(self.current())
    }
}

/// Optimistic schedule runtime
pub struct Planner<A, N>
where
    A: ScheduleApi + 'static,
    N: Notifier + 'static,
{
    store: ScheduleStore,
    coordinator: Coordinator,

    /// Injected services
    api: Arc<A>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,

    completion_tx: mpsc::Sender<Completion>,
    completion_rx: mpsc::Receiver<Completion>,
    waiters: HashMap<ActionId, oneshot::Sender<Notice>>,
    snapshot_tx: watch::Sender<Arc<ScheduleStore>>,
}

impl<A, N> Planner<A, N>
where
    A: ScheduleApi + 'static,
    N: Notifier + 'static,
{
    /// Create a planner acting as `user_id`
    pub fn new(api: A, notifier: N, user_id: UserId, window: ChangeWindow) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel(COMPLETION_BUFFER);
        let (snapshot_tx, _) = watch::channel(Arc::new(ScheduleStore::new()));

        Self {
            store: ScheduleStore::new(),
            coordinator: Coordinator::new(user_id, window),
            api: Arc::new(api),
            notifier: Arc::new(notifier),
            clock: Arc::new(SystemClock),
            completion_tx,
            completion_rx,
            waiters: HashMap::new(),
            snapshot_tx,
        }
    }

    /// Replace the wall clock used by the change window
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn store(&self) -> &ScheduleStore {
        &self.store
    }

    /// Owned copy of the current store
    pub fn snapshot(&self) -> Arc<ScheduleStore> {
        Arc::new(self.store.clone())
    }

    pub fn user_id(&self) -> UserId {
        self.coordinator.user_id()
    }

    pub fn action_state(&self, action: ActionId) -> ActionState {
        self.coordinator.state(action)
    }

    /// Actions still waiting for the server
    pub fn in_flight(&self) -> usize {
        self.coordinator.in_flight()
    }

    /// Day map for `range` from the current store
    pub fn schedule(&self, range: &DateRange) -> DayMap {
        views::by_day(&self.store, range)
    }

    pub fn subscribe(&self, range: DateRange) -> CalendarSubscription {
        CalendarSubscription {
            range,
            receiver: self.snapshot_tx.subscribe(),
        }
    }

    /// Apply an intent optimistically and start its remote call.
    ///
    /// Returns `Ok(None)` when the intent names an entry that no longer
    /// exists; nothing is changed in that case.
    pub async fn dispatch(&mut self, intent: Intent) -> PlannerResult<Option<ActionHandle>> {
        let today = self.clock.today();
        let transition = match self.coordinator.dispatch(&mut self.store, intent, today) {
            Ok(transition) => transition,
            Err(err) if err.is_stale_reference() => {
                component_debug!(ComponentId::current(), "Ignoring intent for stale entry: {}", err);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let (sender, receiver) = oneshot::channel();
        self.waiters.insert(transition.action, sender);
        let handle = ActionHandle {
            action: transition.action,
            kind: transition.kind,
            receiver,
        };

        self.publish();
        self.execute(transition.commands).await;
        Ok(Some(handle))
    }

    /// Wait for and apply the next remote completion.
    ///
    /// Returns `None` without waiting when nothing is in flight.
    pub async fn process_next(&mut self) -> Option<Notice> {
        if self.coordinator.in_flight() == 0 {
            return None;
        }

        let completion = self.completion_rx.recv().await?;
        let transition = self.coordinator.complete(&mut self.store, completion)?;
        self.publish();

        let notice = transition.commands.iter().find_map(|command| match command {
            Command::Notify(notice) => Some(notice.clone()),
            _ => None,
        });
        self.execute(transition.commands).await;
        notice
    }

    /// Apply completions until no action is in flight
    pub async fn settle(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        while self.coordinator.in_flight() > 0 {
            if let Some(notice) = self.process_next().await {
                notices.push(notice);
            }
        }
        notices
    }

    /// Fetch a date range and merge it into the store
    pub async fn load_range(&mut self, range: DateRange) -> PlannerResult<usize> {
        self.store.fetch_range_start(range);
        self.publish();

        match self.api.fetch_schedule_range(range.owner, range.start, range.end).await {
            Ok(entries) => {
                let count = entries.len();
                let fetched: HashSet<EntryId> = entries.iter().map(|entry| entry.id).collect();
                self.store.fetch_range_success(range, entries);
                // Actions still in flight are not in the server's rows yet
                self.coordinator.rebase(&mut self.store, &fetched);
                self.publish();
                component_info!(
                    ComponentId::current(),
                    "📅 Loaded {} entries for {} ({} to {})",
                    count,
                    range.owner,
                    range.start,
                    range.end
                );
                Ok(count)
            }
            Err(err) => {
                self.store.fetch_range_failure(range, err.to_string());
                self.publish();
                logging::log_error(ComponentId::current(), "Range fetch", &err);
                Err(err)
            }
        }
    }

    /// Fetch calendar settings for `owner` and keep them in the store
    pub async fn load_settings(&mut self, owner: Owner) -> PlannerResult<CalendarSettings> {
        let settings = self.api.fetch_settings(owner).await?;
        self.store.set_settings(owner, settings.clone());
        self.publish();
        logging::log_success(ComponentId::current(), &format!("Loaded calendar settings for {owner}"));
        Ok(settings)
    }

    async fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Notify(notice) => self.deliver(notice).await,
                Command::CreateRemote {
                    action,
                    recipe_id,
                    owner,
                    on,
                    count,
                    ..
                } => {
                    let api = Arc::clone(&self.api);
                    let tx = self.completion_tx.clone();
                    tokio::spawn(async move {
                        let result = api.create_scheduled_entry(recipe_id, owner, on, count).await;
                        if tx.send(Completion::Created { action, result }).await.is_err() {
                            component_warn!(ComponentId::current(), "Planner dropped before create completed");
                        }
                    });
                }
                Command::UpdateRemote { action, id, owner, patch } => {
                    let api = Arc::clone(&self.api);
                    let tx = self.completion_tx.clone();
                    tokio::spawn(async move {
                        let result = api.update_scheduled_entry(id, owner, patch).await;
                        if tx.send(Completion::Updated { action, result }).await.is_err() {
                            component_warn!(ComponentId::current(), "Planner dropped before update completed");
                        }
                    });
                }
                Command::DeleteRemote { action, id, owner } => {
                    let api = Arc::clone(&self.api);
                    let tx = self.completion_tx.clone();
                    tokio::spawn(async move {
                        let result = api.delete_scheduled_entry(id, owner).await;
                        if tx.send(Completion::Deleted { action, result }).await.is_err() {
                            component_warn!(ComponentId::current(), "Planner dropped before delete completed");
                        }
                    });
                }
            }
        }
    }

    async fn deliver(&mut self, notice: Notice) {
        self.notifier.notify(notice.clone()).await;
        if let Some(waiter) = self.waiters.remove(&notice.action) {
            // Receiver may have been dropped by a caller that did not wait
            let _ = waiter.send(notice);
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}
