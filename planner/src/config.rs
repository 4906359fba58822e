//! Runtime configuration loaded from the environment

use std::time::Duration;

use crate::error::{PlannerError, PlannerResult};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Planner settings. Command-line flags override these after loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
    /// Past days still editable in place
    pub change_window_days: u32,
    /// Acting user; entries only merge with this user's own
    pub user_id: Option<u64>,
    pub log_level: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            change_window_days: 0,
            user_id: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl PlannerConfig {
    /// Load from process environment, reading `.env` first if present
    pub fn from_env() -> PlannerResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> PlannerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("PLANNER_API_URL").filter(|v| !v.trim().is_empty()) {
            config.api_url = url.trim().trim_end_matches('/').to_string();
        }
        config.api_token = lookup("PLANNER_API_TOKEN").filter(|v| !v.trim().is_empty());

        if let Some(secs) = lookup("PLANNER_TIMEOUT_SECS") {
            let secs: u64 = parse_number("PLANNER_TIMEOUT_SECS", &secs)?;
            if secs == 0 {
                return Err(PlannerError::config("PLANNER_TIMEOUT_SECS must be at least 1"));
            }
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(days) = lookup("PLANNER_CHANGE_WINDOW_DAYS") {
            config.change_window_days = parse_number("PLANNER_CHANGE_WINDOW_DAYS", &days)?;
        }
        if let Some(user) = lookup("PLANNER_USER_ID").filter(|v| !v.trim().is_empty()) {
            config.user_id = Some(parse_number("PLANNER_USER_ID", &user)?);
        }
        if let Some(level) = lookup("PLANNER_LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
            config.log_level = level.trim().to_string();
        }

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> PlannerResult<T> {
    value.trim().parse().map_err(|_| {
        PlannerError::SharedError(shared::SharedError::InvalidConfig {
            field: field.to_string(),
            value: value.to_string(),
        })
    })
}
