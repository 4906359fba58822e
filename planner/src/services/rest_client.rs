//! REST binding of the calendar API
//!
//! Personal entries live under `/api/v1/calendar`, team entries under
//! `/api/v1/t/{team_id}/calendar`.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{RequestBuilder, Response};
use std::time::Duration;

use crate::config::PlannerConfig;
use crate::error::{PlannerError, PlannerResult};
use crate::traits::ScheduleApi;
use shared::{
    component_debug, CalendarSettings, ComponentId, CreateEntryRequest, EntryDto, EntryPatch, Owner, RecipeId,
    ScheduledRecipeEntry, SettingsDto,
};

/// `ScheduleApi` over HTTP with JSON bodies
#[derive(Clone)]
pub struct RealScheduleApi {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl RealScheduleApi {
    /// Create a client for `base_url`. A bare host gets `http://` prepended.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> PlannerResult<Self> {
        let base_url = if base_url.starts_with("http") {
            base_url.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", base_url.trim_end_matches('/'))
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlannerError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { base_url, token, client })
    }

    pub fn from_config(config: &PlannerConfig) -> PlannerResult<Self> {
        Self::new(&config.api_url, config.api_token.clone(), config.timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn prefix(&self, owner: Owner) -> String {
        match owner {
            Owner::Personal => format!("{}/api/v1/calendar", self.base_url),
            Owner::Team { team_id } => format!("{}/api/v1/t/{}/calendar", self.base_url, team_id),
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Turn non-2xx responses into network errors carrying the status
    async fn check(response: Response) -> PlannerResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = if body.is_empty() {
            format!("request failed with status {status}")
        } else {
            format!("request failed with status {status}: {body}")
        };
        Err(PlannerError::http_status(status.as_u16(), message))
    }

    async fn entry_from(response: Response) -> PlannerResult<ScheduledRecipeEntry> {
        let dto: EntryDto = Self::check(response).await?.json().await?;
        Ok(dto.into())
    }
}

#[async_trait]
impl ScheduleApi for RealScheduleApi {
    async fn fetch_schedule_range(
        &self,
        owner: Owner,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PlannerResult<Vec<ScheduledRecipeEntry>> {
        let url = format!("{}/", self.prefix(owner));
        component_debug!(ComponentId::current(), "📅 GET {} ({} to {})", url, start, end);

        let response = self
            .authorize(self.client.get(&url))
            .query(&[("start", start.to_string()), ("end", end.to_string())])
            .send()
            .await?;

        let entries: Vec<EntryDto> = Self::check(response).await?.json().await?;
        Ok(entries.into_iter().map(ScheduledRecipeEntry::from).collect())
    }

    async fn create_scheduled_entry(
        &self,
        recipe_id: RecipeId,
        owner: Owner,
        on: NaiveDate,
        count: u32,
    ) -> PlannerResult<ScheduledRecipeEntry> {
        let url = format!("{}/", self.prefix(owner));
        let request = CreateEntryRequest {
            recipe: recipe_id.0,
            on,
            count,
        };
        component_debug!(ComponentId::current(), "➕ POST {} recipe {} on {}", url, recipe_id, on);

        let response = self.authorize(self.client.post(&url)).json(&request).send().await?;
        Self::entry_from(response).await
    }

    async fn update_scheduled_entry(&self, id: u64, owner: Owner, patch: EntryPatch) -> PlannerResult<ScheduledRecipeEntry> {
        let url = format!("{}/{}/", self.prefix(owner), id);
        component_debug!(ComponentId::current(), "✏️ PATCH {}", url);

        let response = self.authorize(self.client.patch(&url)).json(&patch).send().await?;
        Self::entry_from(response).await
    }

    async fn delete_scheduled_entry(&self, id: u64, owner: Owner) -> PlannerResult<()> {
        let url = format!("{}/{}/", self.prefix(owner), id);
        component_debug!(ComponentId::current(), "🗑️ DELETE {}", url);

        let response = self.authorize(self.client.delete(&url)).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn fetch_settings(&self, owner: Owner) -> PlannerResult<CalendarSettings> {
        let url = format!("{}/settings/", self.prefix(owner));

        let response = self.authorize(self.client.get(&url)).send().await?;
        let settings: SettingsDto = Self::check(response).await?.json().await?;
        Ok(settings.into())
    }
}
