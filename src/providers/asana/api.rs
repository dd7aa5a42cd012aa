//! Asana REST API (https://app.asana.com/api/1.0).

use anyhow::Result;
use serde::Deserialize;
use serde_json::json;

use crate::config::{ProviderConfig, Tier};
use crate::prompt::{Named, Prompt};
use crate::providers::http::{Auth, HttpClient, extract};
use crate::signal::{AbortContext, Signal};

const BASE_URL: &str = "https://app.asana.com/api/1.0/";
const PAGE_LIMIT: u32 = 100;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const WORKSPACE_KEY: &str = "workspaceGid";

#[derive(Debug, Clone, Deserialize)]
pub struct Workspace {
    pub gid: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub gid: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    pub gid: String,
    pub name: String,
    #[serde(default)]
    pub permalink_url: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

impl Named for Workspace {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Project {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Task {
    fn name(&self) -> &str {
        &self.name
    }
}

pub struct AsanaApi {
    http: HttpClient,
    config: ProviderConfig,
}

impl AsanaApi {
    /// Client authenticated with the stored token, asking for it on first use.
    pub fn connect(config: &ProviderConfig) -> Result<Self, Signal> {
        let token = config.prompt_and_persist(
            Tier::User,
            ACCESS_TOKEN_KEY,
            "Asana personal access token",
            "Create a personal access token at https://app.asana.com/0/my-apps",
        )?;
        Ok(Self {
            http: HttpClient::new(BASE_URL, Auth::Bearer(token))?,
            config: config.clone(),
        })
    }

    /// Stored workspace, or the only/selected workspace of the user (persisted).
    pub fn workspace_gid(&self, prompt: &mut Prompt) -> Result<String, Signal> {
        if let Some(gid) = self.config.lookup(WORKSPACE_KEY)? {
            return Ok(gid);
        }
        let workspaces: Vec<Workspace> = extract(self.http.get("workspaces")?, "data")?;
        let chosen = match workspaces.as_slice() {
            [only] => only.clone(),
            many => prompt
                .choice("Select Asana workspace", many, None)?
                .cloned()
                .abort_with("No Asana workspace selected")?,
        };
        self.config.set(Tier::User, WORKSPACE_KEY, &chosen.gid)?;
        Ok(chosen.gid)
    }

    pub fn projects(&self, workspace_gid: &str) -> Result<Vec<Project>> {
        extract(
            self.http.get(&format!(
                "workspaces/{workspace_gid}/projects?archived=false&opt_fields=name&limit={PAGE_LIMIT}"
            ))?,
            "data",
        )
    }

    pub fn project(&self, project_gid: &str) -> Result<Project> {
        extract(
            self.http
                .get(&format!("projects/{project_gid}?opt_fields=name"))?,
            "data",
        )
    }

    /// Incomplete tasks of a project.
    pub fn tasks(&self, project_gid: &str) -> Result<Vec<Task>> {
        let tasks: Vec<Task> = extract(
            self.http.get(&format!(
                "projects/{project_gid}/tasks?completed_since=now&opt_fields=name,permalink_url,completed&limit={PAGE_LIMIT}"
            ))?,
            "data",
        )?;
        Ok(tasks.into_iter().filter(|t| !t.completed).collect())
    }

    pub fn task(&self, task_gid: &str) -> Result<Task> {
        extract(
            self.http.get(&format!(
                "tasks/{task_gid}?opt_fields=name,permalink_url,completed"
            ))?,
            "data",
        )
    }

    pub fn assign_to_me(&self, task_gid: &str) -> Result<()> {
        self.http
            .put(&format!("tasks/{task_gid}"), &json!({"data": {"assignee": "me"}}))?;
        Ok(())
    }
}
