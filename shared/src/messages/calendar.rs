//! Calendar payloads as the REST API sends and accepts them

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{CalendarSettings, EntryId, Owner, RecipeId, ScheduledRecipeEntry, TeamId, UserId};

/// Recipe reference embedded in a calendar entry
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RecipeRef {
    pub id: u64,
    pub name: String,
}

/// Scheduled entry as returned by the server
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EntryDto {
    pub id: u64,
    pub count: u32,
    pub on: NaiveDate,
    pub recipe: RecipeRef,
    pub user: u64,
    #[serde(default)]
    pub team: Option<u64>,
}

impl EntryDto {
    pub fn owner(&self) -> Owner {
        match self.team {
            Some(team_id) => Owner::Team { team_id: TeamId(team_id) },
            None => Owner::Personal,
        }
    }
}

impl From<EntryDto> for ScheduledRecipeEntry {
    fn from(dto: EntryDto) -> Self {
        let owner = dto.owner();
        ScheduledRecipeEntry {
            id: EntryId::Confirmed(dto.id),
            recipe_id: RecipeId(dto.recipe.id),
            recipe_name: dto.recipe.name,
            owner,
            user_id: UserId(dto.user),
            on: dto.on,
            count: dto.count,
        }
    }
}

/// Body of a create request
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreateEntryRequest {
    pub recipe: u64,
    pub on: NaiveDate,
    pub count: u32,
}

/// Calendar settings as returned by the server
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SettingsDto {
    #[serde(default)]
    pub sync_enabled: bool,
    #[serde(default)]
    pub calendar_link: Option<String>,
}

impl From<SettingsDto> for CalendarSettings {
    fn from(dto: SettingsDto) -> Self {
        CalendarSettings {
            sync_enabled: dto.sync_enabled,
            calendar_link: dto.calendar_link,
        }
    }
}
