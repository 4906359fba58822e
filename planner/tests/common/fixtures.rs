//! Test fixtures and data for planner tests

use chrono::NaiveDate;
use planner::DateRange;
use shared::{EntryId, Owner, RecipeId, ScheduledRecipeEntry, UserId};

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    pub const USER: u64 = 1;
    pub const TEAM: u64 = 5;
    pub const PANCAKES: u64 = 9;
    pub const CURRY: u64 = 7;

    pub fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 5, d).unwrap()
    }

    /// First day of the fixture month; D1 and D2 lie ahead of it
    pub fn today() -> NaiveDate {
        Self::day(1)
    }

    pub fn d1() -> NaiveDate {
        Self::day(11)
    }

    pub fn d2() -> NaiveDate {
        Self::day(12)
    }

    pub fn user() -> UserId {
        UserId(Self::USER)
    }

    /// Whole fixture month for the personal calendar
    pub fn month() -> DateRange {
        DateRange::new(Owner::Personal, Self::day(1), Self::day(31))
    }

    pub fn recipe_name(recipe: u64) -> String {
        match recipe {
            Self::PANCAKES => "Pancakes".to_string(),
            Self::CURRY => "Curry".to_string(),
            other => format!("Recipe {other}"),
        }
    }

    /// Confirmed personal entry for the fixture user
    pub fn entry(id: u64, recipe: u64, on: NaiveDate, count: u32) -> ScheduledRecipeEntry {
        ScheduledRecipeEntry {
            id: EntryId::Confirmed(id),
            recipe_id: RecipeId(recipe),
            recipe_name: Self::recipe_name(recipe),
            owner: Owner::Personal,
            user_id: Self::user(),
            on,
            count,
        }
    }

    /// Entries 1 and 2: pancakes three times on D1 and on D2
    pub fn two_pancake_days() -> Vec<ScheduledRecipeEntry> {
        vec![
            Self::entry(1, Self::PANCAKES, Self::d1(), 3),
            Self::entry(2, Self::PANCAKES, Self::d2(), 3),
        ]
    }

    /// Pancakes on D1, curry on D2
    pub fn mixed_days() -> Vec<ScheduledRecipeEntry> {
        vec![
            Self::entry(1, Self::PANCAKES, Self::d1(), 3),
            Self::entry(2, Self::CURRY, Self::d2(), 3),
        ]
    }
}
