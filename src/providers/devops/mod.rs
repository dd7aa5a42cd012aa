//! Azure DevOps: `devops:<organization>/<project>[/<work_item_id>]`.
//!
//! Organization and project are percent-encoded when rendered (`Web%20Shop`) so that output
//! lines survive being piped back in.

pub mod api;

use std::fmt;

use api::{DevOpsApi, WorkItem};

use super::harvest::api::{ExternalReference, TimeEntryData};
use super::{Backend, shared, slug};
use crate::dispatch::{Command, CommandSpec, Context, FlagSpec, Invocation};
use crate::signal::{AbortContext, Signal};

pub const SCHEME: &str = "devops";

const PICK_FLAGS: &[FlagSpec] =
    &[FlagSpec::switch('d', "dry-run", "Print the selection without remembering it")];

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new(
        "current",
        "current devops[:<organization>/<project>/<work_item_id>]",
        "Remember a work item, or show the remembered one",
        shared::current::<DevOps>,
    ),
    CommandSpec::new("clear", "clear devops", "Forget the remembered work item", shared::clear)
        .with_flags(shared::CLEAR_FLAGS),
    CommandSpec::new(
        "share",
        "share devops[:<organization>/<project>/<work_item_id>]",
        "Print the work item for another tool",
        shared::share,
    ),
    CommandSpec::new(
        "write-config",
        "write-config devops[:<organization>/<project>[/<work_item_id>]]",
        "Store the path in .abt.yml",
        shared::write_config,
    )
    .with_flags(shared::WRITE_CONFIG_FLAGS),
    CommandSpec::new(
        "work-items",
        "work-items devops[:<organization>/<project>]",
        "List open work items assigned to you",
        work_items,
    ),
    CommandSpec::new(
        "pick",
        "pick devops[:<organization>/<project>]",
        "Search your open work items",
        pick,
    )
    .with_flags(PICK_FLAGS),
    CommandSpec::new(
        "branch-name",
        "branch-name devops[:<organization>/<project>/<work_item_id>]",
        "Suggest a git branch name for the work item",
        branch_name,
    ),
    CommandSpec::new(
        "harvest-time-entry-data",
        "harvest-time-entry-data devops[:<organization>/<project>/<work_item_id>]",
        "Notes and reference for a Harvest timer",
        harvest_time_entry_data,
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevOpsPath {
    pub organization: String,
    pub project: String,
    pub work_item: Option<u64>,
}

impl DevOpsPath {
    pub fn parse(path: &str) -> Result<Self, Signal> {
        let invalid = || {
            Signal::abort(format!(
                "Invalid DevOps path '{path}', expected <organization>/<project>[/<work_item_id>]"
            ))
        };
        let segment = |s: Option<&str>| -> Result<String, Signal> {
            let s = s.filter(|s| !s.is_empty()).ok_or_else(invalid)?;
            let decoded = urlencoding::decode(s).map_err(|_| invalid())?;
            Ok(decoded.into_owned())
        };
        let mut parts = path.splitn(3, '/');
        let organization = segment(parts.next())?;
        let project = segment(parts.next())?;
        let work_item = match parts.next().filter(|s| !s.is_empty()) {
            Some(id) => Some(id.parse::<u64>().map_err(|_| invalid())?),
            None => None,
        };
        Ok(Self {
            organization,
            project,
            work_item,
        })
    }

    pub fn with_work_item(&self, id: u64) -> Self {
        Self {
            work_item: Some(id),
            ..self.clone()
        }
    }

    pub fn require_work_item(&self) -> Result<u64, Signal> {
        self.work_item.abort_with(format!(
            "{SCHEME}:{self} does not name a work item, use `abt pick {SCHEME}`"
        ))
    }
}

impl fmt::Display for DevOpsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            urlencoding::encode(&self.organization),
            urlencoding::encode(&self.project)
        )?;
        if let Some(id) = self.work_item {
            write!(f, "/{id}")?;
        }
        Ok(())
    }
}

pub struct DevOps;

impl Backend for DevOps {
    const SCHEME: &'static str = SCHEME;

    fn validate(path: &str) -> Result<(), Signal> {
        DevOpsPath::parse(path).map(|_| ())
    }

    fn describe(invocation: &Invocation, path: &str) -> Result<Option<String>, Signal> {
        let path = DevOpsPath::parse(path)?;
        let Some(id) = path.work_item else {
            return Ok(None);
        };
        let api = DevOpsApi::connect(&invocation.config, &path.organization)?;
        Ok(Some(api.work_item(id)?.label))
    }
}

pub fn time_entry_data(path: &DevOpsPath, item: &WorkItem, permalink: String) -> TimeEntryData {
    TimeEntryData {
        notes: item.label.clone(),
        external_reference: Some(ExternalReference {
            id: item.id.to_string(),
            group_id: format!("{}/{}", path.organization, path.project),
            permalink,
        }),
    }
}

fn current_work_item(invocation: &Invocation) -> Result<(DevOpsPath, DevOpsApi, WorkItem), Signal> {
    let path = DevOpsPath::parse(&invocation.require_path()?)?;
    let id = path.require_work_item()?;
    let api = DevOpsApi::connect(&invocation.config, &path.organization)?;
    let item = api.work_item(id)?;
    Ok((path, api, item))
}

fn work_items(invocation: Invocation) -> Box<dyn Command> {
    Box::new(WorkItems(invocation))
}

fn pick(invocation: Invocation) -> Box<dyn Command> {
    Box::new(Pick(invocation))
}

fn branch_name(invocation: Invocation) -> Box<dyn Command> {
    Box::new(BranchName(invocation))
}

fn harvest_time_entry_data(invocation: Invocation) -> Box<dyn Command> {
    Box::new(HarvestTimeEntryData(invocation))
}

struct WorkItems(Invocation);

impl Command for WorkItems {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let path = DevOpsPath::parse(&self.0.require_path()?)?;
        let api = DevOpsApi::connect(&self.0.config, &path.organization)?;
        for item in api.assigned_work_items(&path.project)? {
            ctx.print_ari(SCHEME, &path.with_work_item(item.id).to_string(), Some(&item.label))?;
        }
        Ok(())
    }
}

struct Pick(Invocation);

impl Command for Pick {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let path = DevOpsPath::parse(&self.0.require_path()?)?;
        let api = DevOpsApi::connect(&self.0.config, &path.organization)?;
        let items = api.assigned_work_items(&path.project)?;
        let item = ctx
            .prompt()
            .search("Select a work item", &items)?
            .abort_with("No work item selected")?;

        let picked = path.with_work_item(item.id).to_string();
        ctx.print_ari(SCHEME, &picked, Some(&item.label))?;
        if !self.0.flags.is_set("dry-run") {
            self.0.config.remember_path(&picked)?;
        }
        Ok(())
    }
}

struct BranchName(Invocation);

impl Command for BranchName {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let (_, _, item) = current_work_item(&self.0)?;
        ctx.puts(format!("{}-{}", item.id, slug(&item.fields.title)))
    }
}

struct HarvestTimeEntryData(Invocation);

impl Command for HarvestTimeEntryData {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let (path, api, item) = current_work_item(&self.0)?;
        let data = time_entry_data(&path, &item, api.permalink(&path.project, item.id));
        ctx.puts(serde_json::to_string(&data).abort_with("Unable to encode time entry data")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ari::{self, Ari};
    use crate::providers::shared::testing::run;
    use crate::session::testing::memory_session;

    #[test]
    fn paths() {
        let p = DevOpsPath::parse("acme/Web%20Shop/42").unwrap();
        assert_eq!(p.organization, "acme");
        assert_eq!(p.project, "Web Shop");
        assert_eq!(p.require_work_item().unwrap(), 42);
        assert_eq!(p.to_string(), "acme/Web%20Shop/42");
        assert_eq!(DevOpsPath::parse("acme/Web Shop/42").unwrap(), p);

        let project = DevOpsPath::parse("acme/web").unwrap();
        assert_eq!(project.with_work_item(7).to_string(), "acme/web/7");
        assert!(project.require_work_item().is_err());

        assert!(DevOpsPath::parse("acme").is_err());
        assert!(DevOpsPath::parse("acme/web/x").is_err());
        assert!(DevOpsPath::parse("/web").is_err());
    }

    #[test]
    fn project_with_spaces_survives_a_pipe() {
        let path = DevOpsPath::parse("acme/Web Shop").unwrap().with_work_item(42);
        let line = Ari::new(SCHEME, Some(&path.to_string())).output_line(Some("Bug #42: Broken login"));
        let aris = ari::parse(&ari::piped_tokens(&line)).unwrap();
        assert_eq!(aris.len(), 1);
        assert_eq!(aris[0].scheme(), Some(SCHEME));
        assert_eq!(DevOpsPath::parse(aris[0].path().unwrap()).unwrap(), path);
    }

    #[test]
    fn entry_data() {
        let path = DevOpsPath::parse("acme/web/42").unwrap();
        let item: WorkItem = serde_json::from_value(serde_json::json!({
            "id": 42,
            "fields": {"System.Title": "Broken login", "System.WorkItemType": "Bug"}
        }))
        .unwrap();
        let item = WorkItem {
            label: "Bug #42: Broken login".into(),
            ..item
        };
        let data = time_entry_data(&path, &item, "https://dev.azure.com/acme/web/_workitems/edit/42".into());
        assert_eq!(data.notes, "Bug #42: Broken login");
        let reference = data.external_reference.unwrap();
        assert_eq!(reference.id, "42");
        assert_eq!(reference.group_id, "acme/web");
    }

    #[test]
    fn work_items_need_organization_and_project() {
        let (session, _) = memory_session("");
        let (result, _) = run(&session, "work-items", &["devops:acme"]);
        assert!(result.unwrap_err().message().contains("Invalid DevOps path"));
    }
}
