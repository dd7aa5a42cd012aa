//! Asana: `asana:<project_gid>[/<task_gid>]`.

pub mod api;

use std::fmt;

use api::{AsanaApi, Task};

use super::harvest::api::{ExternalReference, TimeEntryData};
use super::{Backend, shared, slug};
use crate::dispatch::{Command, CommandSpec, Context, FlagSpec, Invocation};
use crate::signal::{AbortContext, Signal};

pub const SCHEME: &str = "asana";

const PICK_FLAGS: &[FlagSpec] =
    &[FlagSpec::switch('d', "dry-run", "Print the selection without remembering it")];

const START_FLAGS: &[FlagSpec] =
    &[FlagSpec::switch('a', "assign", "Assign the task to yourself")];

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new(
        "current",
        "current asana[:<project_gid>/<task_gid>]",
        "Remember a project/task, or show the remembered one",
        shared::current::<Asana>,
    ),
    CommandSpec::new("clear", "clear asana", "Forget the remembered project/task", shared::clear)
        .with_flags(shared::CLEAR_FLAGS),
    CommandSpec::new(
        "share",
        "share asana[:<project_gid>/<task_gid>]",
        "Print the project/task for another tool",
        shared::share,
    ),
    CommandSpec::new(
        "write-config",
        "write-config asana[:<project_gid>/<task_gid>]",
        "Store the project/task in .abt.yml",
        shared::write_config,
    )
    .with_flags(shared::WRITE_CONFIG_FLAGS),
    CommandSpec::new("projects", "projects asana", "List the projects of the workspace", projects),
    CommandSpec::new(
        "tasks",
        "tasks asana[:<project_gid>]",
        "List the incomplete tasks of a project",
        tasks,
    ),
    CommandSpec::new(
        "pick",
        "pick asana[:<project_gid>]",
        "Search for a project and a task",
        pick,
    )
    .with_flags(PICK_FLAGS),
    CommandSpec::new(
        "branch-name",
        "branch-name asana[:<project_gid>/<task_gid>]",
        "Suggest a git branch name for the task",
        branch_name,
    ),
    CommandSpec::new(
        "harvest-time-entry-data",
        "harvest-time-entry-data asana[:<project_gid>/<task_gid>]",
        "Notes and reference for a Harvest timer",
        harvest_time_entry_data,
    ),
    CommandSpec::new(
        "start",
        "start asana[:<project_gid>/<task_gid>]",
        "Make the task current",
        start,
    )
    .with_flags(START_FLAGS),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsanaPath {
    pub project: String,
    pub task: Option<String>,
}

impl AsanaPath {
    pub fn parse(path: &str) -> Result<Self, Signal> {
        let (project, task) = match path.split_once('/') {
            Some((p, t)) => (p, Some(t).filter(|t| !t.is_empty())),
            None => (path, None),
        };
        let numeric = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
        if !numeric(project) || task.is_some_and(|t| !numeric(t)) {
            return Err(Signal::abort(format!(
                "Invalid Asana path '{path}', expected <project_gid>[/<task_gid>]"
            )));
        }
        Ok(Self {
            project: project.to_string(),
            task: task.map(str::to_string),
        })
    }

    pub fn require_task(&self) -> Result<&str, Signal> {
        self.task.as_deref().abort_with(format!(
            "{SCHEME}:{self} does not name a task, use `abt pick {SCHEME}`"
        ))
    }
}

impl fmt::Display for AsanaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.task {
            Some(task) => write!(f, "{}/{task}", self.project),
            None => f.write_str(&self.project),
        }
    }
}

pub struct Asana;

impl Backend for Asana {
    const SCHEME: &'static str = SCHEME;

    fn validate(path: &str) -> Result<(), Signal> {
        AsanaPath::parse(path).map(|_| ())
    }

    fn describe(invocation: &Invocation, path: &str) -> Result<Option<String>, Signal> {
        let path = AsanaPath::parse(path)?;
        let api = AsanaApi::connect(&invocation.config)?;
        let name = match &path.task {
            Some(task) => api.task(task)?.name,
            None => api.project(&path.project)?.name,
        };
        Ok(Some(name))
    }
}

/// Time entry payload describing an Asana task.
pub fn time_entry_data(path: &AsanaPath, task: &Task) -> TimeEntryData {
    TimeEntryData {
        notes: format!("Asana: {}", task.name),
        external_reference: Some(ExternalReference {
            id: task.gid.clone(),
            group_id: path.project.clone(),
            permalink: task.permalink_url.clone().unwrap_or_else(|| {
                format!("https://app.asana.com/0/{}/{}", path.project, task.gid)
            }),
        }),
    }
}

/// The task an invocation points at (explicit path or remembered).
fn current_task(invocation: &Invocation) -> Result<(AsanaPath, Task), Signal> {
    let path = AsanaPath::parse(&invocation.require_path()?)?;
    let gid = path.require_task()?.to_string();
    let api = AsanaApi::connect(&invocation.config)?;
    let task = api.task(&gid)?;
    Ok((path, task))
}

fn projects(invocation: Invocation) -> Box<dyn Command> {
    Box::new(Projects(invocation))
}

fn tasks(invocation: Invocation) -> Box<dyn Command> {
    Box::new(Tasks(invocation))
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

fn start(invocation: Invocation) -> Box<dyn Command> {
    Box::new(Start(invocation))
}

struct Projects(Invocation);

impl Command for Projects {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let api = AsanaApi::connect(&self.0.config)?;
        let workspace = api.workspace_gid(&mut ctx.prompt())?;
        for project in api.projects(&workspace)? {
            ctx.print_ari(SCHEME, &project.gid, Some(&project.name))?;
        }
        Ok(())
    }
}

struct Tasks(Invocation);

impl Command for Tasks {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let path = AsanaPath::parse(&self.0.require_path()?)?;
        let api = AsanaApi::connect(&self.0.config)?;
        for task in api.tasks(&path.project)? {
            ctx.print_ari(
                SCHEME,
                &format!("{}/{}", path.project, task.gid),
                Some(&task.name),
            )?;
        }
        Ok(())
    }
}

struct Pick(Invocation);

impl Command for Pick {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let api = AsanaApi::connect(&self.0.config)?;

        let project = match self.0.path() {
            Some(path) => AsanaPath::parse(path)?.project,
            None => {
                let workspace = api.workspace_gid(&mut ctx.prompt())?;
                let projects = api.projects(&workspace)?;
                ctx.prompt()
                    .search("Select an Asana project", &projects)?
                    .abort_with("No project selected")?
                    .gid
                    .clone()
            }
        };

        let tasks = api.tasks(&project)?;
        let task = ctx
            .prompt()
            .search("Select a task", &tasks)?
            .abort_with("No task selected")?;

        let path = AsanaPath {
            project,
            task: Some(task.gid.clone()),
        }
        .to_string();
        ctx.print_ari(SCHEME, &path, Some(&task.name))?;
        if !self.0.flags.is_set("dry-run") {
            self.0.config.remember_path(&path)?;
        }
        Ok(())
    }
}

struct BranchName(Invocation);

impl Command for BranchName {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let (_, task) = current_task(&self.0)?;
        ctx.puts(slug(&task.name))
    }
}

struct HarvestTimeEntryData(Invocation);

impl Command for HarvestTimeEntryData {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let (path, task) = current_task(&self.0)?;
        let data = time_entry_data(&path, &task);
        ctx.puts(serde_json::to_string(&data).abort_with("Unable to encode time entry data")?)
    }
}

struct Start(Invocation);

impl Command for Start {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let Some(path) = shared::show_current::<Asana>(&self.0, ctx)? else {
            return Ok(());
        };
        if self.0.flags.is_set("assign") {
            let path = AsanaPath::parse(&path)?;
            let gid = path.require_task()?;
            AsanaApi::connect(&self.0.config)?.assign_to_me(gid)?;
            ctx.warn(format!("Assigned {SCHEME}:{path} to you"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::shared::testing::run;
    use crate::session::testing::memory_session;

    fn task(name: &str, permalink: Option<&str>) -> Task {
        Task {
            gid: "1207".into(),
            name: name.into(),
            permalink_url: permalink.map(str::to_string),
            completed: false,
        }
    }

    #[test]
    fn paths() {
        let p = AsanaPath::parse("1201/1305").unwrap();
        assert_eq!(p.project, "1201");
        assert_eq!(p.require_task().unwrap(), "1305");
        assert_eq!(p.to_string(), "1201/1305");

        let project_only = AsanaPath::parse("1201").unwrap();
        assert!(project_only.require_task().unwrap_err().message().contains("does not name a task"));
        assert!(AsanaPath::parse("abc/1").is_err());
        assert!(AsanaPath::parse("").is_err());
    }

    #[test]
    fn entry_data_for_harvest() {
        let path = AsanaPath::parse("1201/1207").unwrap();
        let data = time_entry_data(&path, &task("Fix login", Some("https://app.asana.com/0/1201/1207/f")));
        assert_eq!(data.notes, "Asana: Fix login");
        let reference = data.external_reference.unwrap();
        assert_eq!(reference.id, "1207");
        assert_eq!(reference.group_id, "1201");
        assert_eq!(reference.permalink, "https://app.asana.com/0/1201/1207/f");

        let fallback = time_entry_data(&path, &task("Fix login", None));
        assert_eq!(
            fallback.external_reference.unwrap().permalink,
            "https://app.asana.com/0/1201/1207"
        );
    }

    #[test]
    fn entry_data_round_trips_through_harvest_parser() {
        let path = AsanaPath::parse("1201/1207").unwrap();
        let data = time_entry_data(&path, &task("Fix login", None));
        let line = serde_json::to_string(&data).unwrap();
        let parsed = crate::providers::harvest::parse_entry_data(&line).unwrap();
        assert_eq!(parsed, Some(data));
    }

    #[test]
    fn branch_name_needs_a_task() {
        let (session, _) = memory_session("");
        let (result, _) = run(&session, "branch-name", &["asana:1201"]);
        assert!(result.unwrap_err().message().contains("does not name a task"));
    }
}
