//! Change-window policy for moving scheduled entries

use chrono::{Days, Local, NaiveDate};

/// Source of the current calendar day
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock day
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to one day
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// How a drag of an entry to another day is carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// Patch the entry's day in place
    Move,
    /// Leave the original and schedule a new entry at the destination
    Copy,
}

/// Days that may still be edited in place.
///
/// Today and later are always inside; `grace_days` extends the window into
/// the past.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeWindow {
    pub grace_days: u32,
}

impl ChangeWindow {
    pub fn new(grace_days: u32) -> Self {
        Self { grace_days }
    }

    pub fn contains(&self, day: NaiveDate, today: NaiveDate) -> bool {
        let earliest = today
            .checked_sub_days(Days::new(u64::from(self.grace_days)))
            .unwrap_or(NaiveDate::MIN);
        day >= earliest
    }

    /// Entries outside the window, or dragged with duplicate intent, are copied
    pub fn classify(&self, current_day: NaiveDate, today: NaiveDate, duplicate_intent: bool) -> MoveKind {
        if duplicate_intent || !self.contains(current_day, today) {
            MoveKind::Copy
        } else {
            MoveKind::Move
        }
    }
}
