//! Azure DevOps REST API (https://dev.azure.com/<organization>).

use anyhow::Result;
use serde::Deserialize;
use serde_json::json;

use crate::config::{ProviderConfig, Tier};
use crate::prompt::Named;
use crate::providers::http::{Auth, HttpClient, extract};
use crate::signal::Signal;

const API_VERSION: &str = "7.0";
/// Upper bound of ids the work item batch endpoint accepts.
const BATCH_LIMIT: usize = 200;

pub const USERNAME_KEY: &str = "username";

/// Organization scoped token key: `accessToken-<organization>`.
pub fn access_token_key(organization: &str) -> String {
    format!("accessToken-{organization}")
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkItem {
    pub id: u64,
    pub fields: WorkItemFields,
    /// `Type #id: title`, filled after deserialization for searching.
    #[serde(skip)]
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkItemFields {
    #[serde(rename = "System.Title")]
    pub title: String,
    #[serde(rename = "System.WorkItemType", default)]
    pub kind: String,
}

impl WorkItem {
    fn labelled(mut self) -> Self {
        self.label = format!("{} #{}: {}", self.fields.kind, self.id, self.fields.title);
        self
    }
}

impl Named for WorkItem {
    fn name(&self) -> &str {
        &self.label
    }
}

#[derive(Debug, Deserialize)]
struct WiqlResult {
    #[serde(rename = "workItems", default)]
    work_items: Vec<WorkItemRef>,
}

#[derive(Debug, Deserialize)]
struct WorkItemRef {
    id: u64,
}

pub struct DevOpsApi {
    http: HttpClient,
    organization: String,
}

impl DevOpsApi {
    pub fn connect(config: &ProviderConfig, organization: &str) -> Result<Self, Signal> {
        let username = config.prompt_and_persist(
            Tier::User,
            USERNAME_KEY,
            "Azure DevOps username (email)",
            "",
        )?;
        let token = config.prompt_and_persist(
            Tier::User,
            &access_token_key(organization),
            &format!("Azure DevOps personal access token for {organization}"),
            &format!(
                "Create a token with work item read/write scope at https://dev.azure.com/{organization}/_usersSettings/tokens"
            ),
        )?;
        let http = HttpClient::new(
            &format!("https://dev.azure.com/{organization}/"),
            Auth::Basic {
                username,
                password: token,
            },
        )?;
        Ok(Self {
            http,
            organization: organization.to_string(),
        })
    }

    /// Open work items assigned to the token owner, most recently changed first.
    pub fn assigned_work_items(&self, project: &str) -> Result<Vec<WorkItem>> {
        let query = json!({
            "query": "SELECT [System.Id] FROM WorkItems \
                      WHERE [System.TeamProject] = @project \
                      AND [System.AssignedTo] = @Me \
                      AND [System.State] NOT IN ('Closed', 'Removed', 'Done') \
                      ORDER BY [System.ChangedDate] DESC"
        });
        let result: WiqlResult = extract(
            self.http.post(
                &format!("{project}/_apis/wit/wiql?api-version={API_VERSION}"),
                &query,
            )?,
            "",
        )?;
        let ids: Vec<u64> = result
            .work_items
            .into_iter()
            .map(|r| r.id)
            .take(BATCH_LIMIT)
            .collect();
        self.work_items(&ids)
    }

    pub fn work_items(&self, ids: &[u64]) -> Result<Vec<WorkItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let items: Vec<WorkItem> = extract(
            self.http.get(&format!(
                "_apis/wit/workitems?ids={ids}&fields=System.Title,System.WorkItemType&api-version={API_VERSION}"
            ))?,
            "value",
        )?;
        Ok(items.into_iter().map(WorkItem::labelled).collect())
    }

    pub fn work_item(&self, id: u64) -> Result<WorkItem> {
        let item: WorkItem = extract(
            self.http.get(&format!(
                "_apis/wit/workitems/{id}?fields=System.Title,System.WorkItemType&api-version={API_VERSION}"
            ))?,
            "",
        )?;
        Ok(item.labelled())
    }

    pub fn permalink(&self, project: &str, id: u64) -> String {
        format!(
            "https://dev.azure.com/{}/{}/_workitems/edit/{id}",
            urlencoding::encode(&self.organization),
            urlencoding::encode(project)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_item_labels() {
        let value = json!({
            "count": 1,
            "value": [{
                "id": 42,
                "fields": {"System.Title": "Broken login", "System.WorkItemType": "Bug"}
            }]
        });
        let items: Vec<WorkItem> = extract(value, "value").unwrap();
        let item = items.into_iter().next().unwrap().labelled();
        assert_eq!(item.name(), "Bug #42: Broken login");
    }

    #[test]
    fn token_key_is_per_organization() {
        assert_eq!(access_token_key("acme"), "accessToken-acme");
    }
}
