//! Test helpers and builder patterns for planner tests

use chrono::NaiveDate;
use tokio::sync::mpsc;

use planner::services::ChannelNotifier;
use planner::{ChangeWindow, Coordinator, FixedClock, MockScheduleApi, Notice, Planner, PlannerError, ScheduleStore};
use shared::{EntryId, EntryPatch, Owner, RecipeId, ScheduledRecipeEntry};

use super::fixtures::TestFixtures;

pub type TestPlanner = Planner<MockScheduleApi, ChannelNotifier>;

/// Builder for planners wired to a mocked API and a fixed clock
pub struct PlannerBuilder {
    api: MockScheduleApi,
    today: NaiveDate,
    window: ChangeWindow,
    seed: Vec<ScheduledRecipeEntry>,
}

impl PlannerBuilder {
    pub fn new() -> Self {
        Self {
            api: MockScheduleApi::new(),
            today: TestFixtures::today(),
            window: ChangeWindow::default(),
            seed: Vec::new(),
        }
    }

    /// Entries served by the initial month fetch
    pub fn with_entries(mut self, entries: Vec<ScheduledRecipeEntry>) -> Self {
        self.seed = entries;
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn with_window(mut self, window: ChangeWindow) -> Self {
        self.window = window;
        self
    }

    /// Configure further API expectations
    pub fn with_api(mut self, configure: impl FnOnce(&mut MockScheduleApi)) -> Self {
        configure(&mut self.api);
        self
    }

    /// Build the planner and load the seed entries, if any
    pub async fn build(self) -> (TestPlanner, mpsc::Receiver<Notice>) {
        let mut api = self.api;
        let seeded = !self.seed.is_empty();
        if seeded {
            let seed = self.seed;
            api.expect_fetch_schedule_range()
                .times(1)
                .returning(move |_, _, _| Ok(seed.clone()));
        }

        let (notifier, notices) = ChannelNotifier::channel(64);
        let mut planner =
            Planner::new(api, notifier, TestFixtures::user(), self.window).with_clock(FixedClock(self.today));

        if seeded {
            planner
                .load_range(TestFixtures::month())
                .await
                .expect("seed fetch should succeed");
        }

        (planner, notices)
    }
}

impl Default for PlannerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Common expectations and assertions
pub struct TestHelpers;

impl TestHelpers {
    /// Create requests succeed, echoing the request under `server_id`
    pub fn create_succeeds(api: &mut MockScheduleApi, server_id: u64) {
        api.expect_create_scheduled_entry()
            .times(1)
            .returning(move |recipe_id: RecipeId, owner: Owner, on, count| {
                Ok(ScheduledRecipeEntry {
                    id: EntryId::Confirmed(server_id),
                    recipe_id,
                    recipe_name: TestFixtures::recipe_name(recipe_id.0),
                    owner,
                    user_id: TestFixtures::user(),
                    on,
                    count,
                })
            });
    }

    pub fn create_fails(api: &mut MockScheduleApi) {
        api.expect_create_scheduled_entry()
            .times(1)
            .returning(|_, _, _, _| Err(PlannerError::http_status(500, "server error")));
    }

    /// Update requests answer with `response`
    pub fn update_returns(api: &mut MockScheduleApi, response: ScheduledRecipeEntry) {
        api.expect_update_scheduled_entry()
            .times(1)
            .returning(move |_, _, _: EntryPatch| Ok(response.clone()));
    }

    pub fn update_fails(api: &mut MockScheduleApi) {
        api.expect_update_scheduled_entry()
            .times(1)
            .returning(|_, _, _| Err(PlannerError::network("connection reset")));
    }

    pub fn delete_succeeds(api: &mut MockScheduleApi) {
        api.expect_delete_scheduled_entry().times(1).returning(|_, _| Ok(()));
    }

    pub fn delete_fails(api: &mut MockScheduleApi) {
        api.expect_delete_scheduled_entry()
            .times(1)
            .returning(|_, _| Err(PlannerError::http_status(503, "unavailable")));
    }

    /// No two live entries share a placement and no count is zero
    pub fn assert_consistent(store: &ScheduleStore) {
        if let Err(conflict) = store.check_consistency() {
            panic!("{conflict}; all conflicts: {:?}", store.placement_conflicts());
        }
        assert!(store.entries().all(|entry| entry.count >= 1));
        assert_eq!(store.entries().count(), store.len());
    }

    /// Every pending entry in the store belongs to a create still in flight
    pub fn assert_no_orphans(store: &ScheduleStore, coordinator: &Coordinator) {
        let owned: Vec<EntryId> = coordinator.pending_ids().collect();
        for id in store.ids() {
            assert!(!id.is_pending() || owned.contains(id), "{id} outlived its action");
        }
    }
}
