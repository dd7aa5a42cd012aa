//! Harvest v2 API (https://api.harvestapp.com/v2).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::{ProviderConfig, Tier};
use crate::prompt::Named;
use crate::providers::http::{Auth, HttpClient, extract};
use crate::signal::Signal;

const BASE_URL: &str = "https://api.harvestapp.com/v2/";
const PER_PAGE: u32 = 100;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const ACCOUNT_ID_KEY: &str = "accountId";
pub const USER_ID_KEY: &str = "userId";

const TOKEN_HELP: &str = "Create a personal access token at https://id.getharvest.com/developers";

/// Any `{ id, name }` object (project, client, task).
#[derive(Debug, Clone, Deserialize)]
pub struct Entity {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskAssignment {
    pub task: Entity,
    #[serde(default = "active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectAssignment {
    pub project: Entity,
    pub client: Entity,
    #[serde(default)]
    pub task_assignments: Vec<TaskAssignment>,
    /// `client > project`, filled after deserialization for searching.
    #[serde(skip)]
    pub label: String,
}

impl ProjectAssignment {
    pub fn active_tasks(&self) -> Vec<Entity> {
        self.task_assignments
            .iter()
            .filter(|t| t.is_active)
            .map(|t| t.task.clone())
            .collect()
    }

    pub fn task(&self, task_id: u64) -> Option<&Entity> {
        self.task_assignments
            .iter()
            .map(|t| &t.task)
            .find(|t| t.id == task_id)
    }
}

impl Named for ProjectAssignment {
    fn name(&self) -> &str {
        &self.label
    }
}

impl Named for Entity {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeEntry {
    pub id: u64,
    #[serde(default)]
    pub notes: Option<String>,
    pub project: Entity,
    pub task: Entity,
    #[serde(default)]
    pub hours: f64,
}

/// Reference to the originating item in another tool, shown in Harvest next to the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalReference {
    pub id: String,
    pub group_id: String,
    pub permalink: String,
}

/// What another provider contributes to a new time entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntryData {
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<ExternalReference>,
}

pub struct NewTimeEntry<'a> {
    pub project_id: u64,
    pub task_id: u64,
    pub spent_date: String,
    pub notes: Option<String>,
    pub external_reference: Option<&'a ExternalReference>,
}

fn active() -> bool {
    true
}

pub struct HarvestApi {
    http: HttpClient,
    config: ProviderConfig,
}

impl HarvestApi {
    pub fn connect(config: &ProviderConfig) -> Result<Self, Signal> {
        let token = config.prompt_and_persist(
            Tier::User,
            ACCESS_TOKEN_KEY,
            "Harvest personal access token",
            TOKEN_HELP,
        )?;
        let account_id = config.prompt_and_persist(
            Tier::User,
            ACCOUNT_ID_KEY,
            "Harvest account ID",
            "The account ID is listed next to the token",
        )?;
        let http = HttpClient::new(BASE_URL, Auth::Bearer(token))?
            .header("Harvest-Account-Id", account_id);
        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    /// Stored user id, or the id of the token owner (persisted).
    pub fn user_id(&self) -> Result<String, Signal> {
        if let Some(id) = self.config.lookup(USER_ID_KEY)? {
            return Ok(id);
        }
        let me: User = extract(self.http.get("users/me")?, "")?;
        let id = me.id.to_string();
        self.config.set(Tier::User, USER_ID_KEY, &id)?;
        Ok(id)
    }

    pub fn project_assignments(&self) -> Result<Vec<ProjectAssignment>> {
        let mut assignments: Vec<ProjectAssignment> = extract(
            self.http.get(&format!(
                "users/me/project_assignments?is_active=true&per_page={PER_PAGE}"
            ))?,
            "project_assignments",
        )?;
        for a in &mut assignments {
            a.label = format!("{} > {}", a.client.name, a.project.name);
        }
        Ok(assignments)
    }

    pub fn project_assignment(&self, project_id: u64) -> Result<Option<ProjectAssignment>> {
        Ok(self
            .project_assignments()?
            .into_iter()
            .find(|a| a.project.id == project_id))
    }

    pub fn start(&self, user_id: &str, entry: NewTimeEntry<'_>) -> Result<TimeEntry> {
        let user_id: u64 = user_id
            .parse()
            .with_context(|| format!("Invalid Harvest user id '{user_id}'"))?;
        let mut body = json!({
            "user_id": user_id,
            "project_id": entry.project_id,
            "task_id": entry.task_id,
            "spent_date": entry.spent_date,
        });
        if let Some(notes) = entry.notes {
            body["notes"] = json!(notes);
        }
        if let Some(reference) = entry.external_reference {
            body["external_reference"] = serde_json::to_value(reference)?;
        }
        extract(self.http.post("time_entries", &body)?, "")
    }

    pub fn running_entries(&self, user_id: &str) -> Result<Vec<TimeEntry>> {
        extract(
            self.http
                .get(&format!("time_entries?is_running=true&user_id={user_id}"))?,
            "time_entries",
        )
    }

    pub fn stop(&self, entry_id: u64) -> Result<TimeEntry> {
        extract(
            self.http
                .patch(&format!("time_entries/{entry_id}/stop"), None)?,
            "",
        )
    }
}

#[derive(Debug, Deserialize)]
struct User {
    id: u64,
}
