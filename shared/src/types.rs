//! Core shared types and identifiers

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::errors::{SharedError, SharedResult};

static COMPONENT_ID: OnceLock<ComponentId> = OnceLock::new();

/// Component identifier used to tag log output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentId {
    /// Command-line front end
    Cli,
    /// Embedded planner runtime (library use)
    Planner,
}

impl ComponentId {
    /// Initialize the global component ID for the CLI binary
    pub fn init_cli() -> &'static ComponentId {
        COMPONENT_ID.get_or_init(|| ComponentId::Cli)
    }

    /// Get the global component ID, defaulting to the planner runtime
    pub fn current() -> &'static ComponentId {
        COMPONENT_ID.get_or_init(|| ComponentId::Planner)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentId::Cli => write!(f, "cli"),
            ComponentId::Planner => write!(f, "planner"),
        }
    }
}

/// Server-side recipe identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(pub u64);

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-side user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-side team identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub u64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a scheduled entry.
///
/// A pending id is generated locally while the create request is in flight;
/// a confirmed id is issued by the server. The two never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum EntryId {
    Pending(u32),
    Confirmed(u64),
}

impl EntryId {
    pub fn is_pending(&self) -> bool {
        matches!(self, EntryId::Pending(_))
    }

    /// Server id, if this entry has been confirmed
    pub fn server_id(&self) -> Option<u64> {
        match self {
            EntryId::Confirmed(id) => Some(*id),
            EntryId::Pending(_) => None,
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryId::Pending(id) => write!(f, "pending:{id:08x}"),
            EntryId::Confirmed(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for EntryId {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SharedError::InvalidEntryId { input: s.to_string() };
        match s.strip_prefix("pending:") {
            Some(hex) => u32::from_str_radix(hex, 16).map(EntryId::Pending).map_err(|_| invalid()),
            None => s.parse::<u64>().map(EntryId::Confirmed).map_err(|_| invalid()),
        }
    }
}

/// Scope an entry is scheduled under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Owner {
    Personal,
    Team { team_id: TeamId },
}

/// Owner kind without the team payload, for filtered views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerKind {
    Personal,
    Team,
}

impl Owner {
    pub fn kind(&self) -> OwnerKind {
        match self {
            Owner::Personal => OwnerKind::Personal,
            Owner::Team { .. } => OwnerKind::Team,
        }
    }

    pub fn team(team_id: u64) -> Self {
        Owner::Team { team_id: TeamId(team_id) }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Personal => write!(f, "personal"),
            Owner::Team { team_id } => write!(f, "team:{team_id}"),
        }
    }
}

/// A recipe placed on a calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledRecipeEntry {
    pub id: EntryId,
    pub recipe_id: RecipeId,
    pub recipe_name: String,
    pub owner: Owner,
    pub user_id: UserId,
    pub on: NaiveDate,
    pub count: u32,
}

impl ScheduledRecipeEntry {
    /// Tuple that must be unique among live entries
    pub fn placement(&self) -> Placement {
        Placement {
            owner: self.owner,
            user_id: self.user_id,
            on: self.on,
            recipe_id: self.recipe_id,
        }
    }
}

/// Uniqueness key of a scheduled entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Placement {
    pub owner: Owner,
    pub user_id: UserId,
    pub on: NaiveDate,
    pub recipe_id: RecipeId,
}

/// Partial update sent with an entry update request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

impl EntryPatch {
    pub fn date(on: NaiveDate) -> Self {
        Self { on: Some(on), count: None }
    }

    pub fn count(count: u32) -> Self {
        Self { on: None, count: Some(count) }
    }
}

/// Calendar sharing settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSettings {
    pub sync_enabled: bool,
    pub calendar_link: Option<String>,
}

/// Parse a `YYYY-MM-DD` calendar day
pub fn parse_day(input: &str) -> SharedResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| SharedError::InvalidDate {
        input: input.to_string(),
    })
}
