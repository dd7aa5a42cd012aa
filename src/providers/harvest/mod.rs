//! Harvest time tracking: `harvest:<project_id>[/<task_id>]`.

pub mod api;

use std::fmt;

use api::{HarvestApi, NewTimeEntry, TimeEntryData};

use super::{Backend, shared};
use crate::dispatch::{Command, CommandSpec, Context, FlagSpec, Invocation};
use crate::signal::{AbortContext, Signal};

pub const SCHEME: &str = "harvest";

/// Command other providers implement to describe a new time entry.
pub const ENTRY_DATA_COMMAND: &str = "harvest-time-entry-data";

const PICK_FLAGS: &[FlagSpec] =
    &[FlagSpec::switch('d', "dry-run", "Print the selection without remembering it")];

const START_FLAGS: &[FlagSpec] =
    &[FlagSpec::option('c', "comment", "TEXT", "Extra notes for the time entry")];

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new(
        "current",
        "current harvest[:<project_id>/<task_id>]",
        "Remember a project/task, or show the remembered one",
        shared::current::<Harvest>,
    ),
    CommandSpec::new("clear", "clear harvest", "Forget the remembered project/task", shared::clear)
        .with_flags(shared::CLEAR_FLAGS),
    CommandSpec::new(
        "share",
        "share harvest[:<project_id>/<task_id>]",
        "Print the project/task for another tool",
        shared::share,
    ),
    CommandSpec::new(
        "write-config",
        "write-config harvest[:<project_id>/<task_id>]",
        "Store the project/task in .abt.yml",
        shared::write_config,
    )
    .with_flags(shared::WRITE_CONFIG_FLAGS),
    CommandSpec::new("projects", "projects harvest", "List your active project assignments", projects),
    CommandSpec::new(
        "tasks",
        "tasks harvest[:<project_id>]",
        "List the tasks of a project",
        tasks,
    ),
    CommandSpec::new(
        "pick",
        "pick harvest[:<project_id>]",
        "Search for a project and choose a task",
        pick,
    )
    .with_flags(PICK_FLAGS),
    CommandSpec::new(
        "start",
        "start harvest[:<project_id>/<task_id>] [<ari>...]",
        "Start a timer; other identifiers supply notes and a reference",
        start,
    )
    .with_flags(START_FLAGS),
    CommandSpec::new("stop", "stop harvest", "Stop the running timer", stop),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestPath {
    pub project: u64,
    pub task: Option<u64>,
}

impl HarvestPath {
    pub fn parse(path: &str) -> Result<Self, Signal> {
        let invalid = || {
            Signal::abort(format!(
                "Invalid Harvest path '{path}', expected <project_id>[/<task_id>]"
            ))
        };
        let (project, task) = match path.split_once('/') {
            Some((p, t)) => (p, Some(t).filter(|t| !t.is_empty())),
            None => (path, None),
        };
        let project: u64 = project.parse().map_err(|_| invalid())?;
        let task: Option<u64> = task
            .map(|t| t.parse().map_err(|_| invalid()))
            .transpose()?;
        Ok(Self { project, task })
    }

    pub fn require_task(&self) -> Result<u64, Signal> {
        self.task.abort_with(format!(
            "{SCHEME}:{self} does not name a task, use `abt pick {SCHEME}`"
        ))
    }
}

impl fmt::Display for HarvestPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.task {
            Some(task) => write!(f, "{}/{task}", self.project),
            None => write!(f, "{}", self.project),
        }
    }
}

pub struct Harvest;

impl Backend for Harvest {
    const SCHEME: &'static str = SCHEME;

    fn validate(path: &str) -> Result<(), Signal> {
        HarvestPath::parse(path).map(|_| ())
    }

    fn describe(invocation: &Invocation, path: &str) -> Result<Option<String>, Signal> {
        let path = HarvestPath::parse(path)?;
        let api = HarvestApi::connect(&invocation.config)?;
        let Some(assignment) = api.project_assignment(path.project)? else {
            return Ok(None);
        };
        let task = path.task.and_then(|id| assignment.task(id));
        Ok(Some(match task {
            Some(task) => format!("{} > {}", assignment.label, task.name),
            None => assignment.label.clone(),
        }))
    }
}

/// First non-empty line of a `harvest-time-entry-data` answer.
pub fn parse_entry_data(output: &str) -> Result<Option<TimeEntryData>, Signal> {
    let Some(line) = output.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return Ok(None);
    };
    let data = serde_json::from_str(line).abort_with("Invalid time entry data")?;
    Ok(Some(data))
}

/// Provider notes and the user's comment, joined.
pub fn compose_notes(data: Option<&str>, comment: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [data, comment]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(" - "))
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

fn start(invocation: Invocation) -> Box<dyn Command> {
    Box::new(Start(invocation))
}

fn stop(invocation: Invocation) -> Box<dyn Command> {
    Box::new(Stop(invocation))
}

struct Projects(Invocation);

impl Command for Projects {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let api = HarvestApi::connect(&self.0.config)?;
        for assignment in api.project_assignments()? {
            ctx.print_ari(
                SCHEME,
                &assignment.project.id.to_string(),
                Some(&assignment.label),
            )?;
        }
        Ok(())
    }
}

struct Tasks(Invocation);

impl Command for Tasks {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let path = HarvestPath::parse(&self.0.require_path()?)?;
        let api = HarvestApi::connect(&self.0.config)?;
        let assignment = api
            .project_assignment(path.project)?
            .abort_with(format!("No active assignment for {SCHEME}:{}", path.project))?;
        for task in assignment.active_tasks() {
            ctx.print_ari(
                SCHEME,
                &format!("{}/{}", path.project, task.id),
                Some(&format!("{} > {}", assignment.label, task.name)),
            )?;
        }
        Ok(())
    }
}

struct Pick(Invocation);

impl Command for Pick {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let api = HarvestApi::connect(&self.0.config)?;
        let assignments = api.project_assignments()?;

        let assignment = match self.0.path() {
            Some(path) => {
                let project = HarvestPath::parse(path)?.project;
                assignments
                    .iter()
                    .find(|a| a.project.id == project)
                    .abort_with(format!("No active assignment for {SCHEME}:{project}"))?
            }
            None => ctx
                .prompt()
                .search("Select a Harvest project", &assignments)?
                .abort_with("No project selected")?,
        };
        let tasks = assignment.active_tasks();
        let task = ctx
            .prompt()
            .choice("Select a task", &tasks, None)?
            .abort_with("No task selected")?;

        let path = HarvestPath {
            project: assignment.project.id,
            task: Some(task.id),
        }
        .to_string();
        ctx.print_ari(
            SCHEME,
            &path,
            Some(&format!("{} > {}", assignment.label, task.name)),
        )?;
        if !self.0.flags.is_set("dry-run") {
            self.0.config.remember_path(&path)?;
        }
        Ok(())
    }
}

struct Start(Invocation);

impl Command for Start {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let path = HarvestPath::parse(&self.0.require_path()?)?;
        let task_id = path.require_task()?;
        if let Some(explicit) = self.0.path() {
            self.0.config.remember_path(explicit)?;
        }

        let siblings = ctx.siblings();
        let data = parse_entry_data(&ctx.invoke(ENTRY_DATA_COMMAND, &siblings)?)?;
        let notes = compose_notes(
            data.as_ref().map(|d| d.notes.as_str()),
            self.0.flags.value("comment"),
        );
        let reference = data.as_ref().and_then(|d| d.external_reference.as_ref());

        let api = HarvestApi::connect(&self.0.config)?;
        let user_id = api.user_id()?;
        let entry = api.start(
            &user_id,
            NewTimeEntry {
                project_id: path.project,
                task_id,
                spent_date: chrono::Local::now().format("%Y-%m-%d").to_string(),
                notes,
                external_reference: reference,
            },
        )?;
        tracing::debug!(entry = entry.id, "started harvest timer");
        ctx.warn(format!("Started Harvest timer {}", entry.id));
        ctx.print_ari(
            SCHEME,
            &format!("{}/{}", entry.project.id, entry.task.id),
            Some(entry.notes.as_deref().unwrap_or(&entry.task.name)),
        )
    }
}

struct Stop(Invocation);

impl Command for Stop {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let api = HarvestApi::connect(&self.0.config)?;
        let user_id = api.user_id()?;
        let running = api.running_entries(&user_id)?;
        if running.is_empty() {
            ctx.warn("No running Harvest timer");
            return Ok(());
        }
        for entry in running {
            let stopped = api.stop(entry.id)?;
            let label = stopped.notes.as_deref().unwrap_or(&stopped.task.name);
            ctx.print_ari(
                SCHEME,
                &format!("{}/{}", stopped.project.id, stopped.task.id),
                Some(&format!("{label} ({:.2}h)", stopped.hours)),
            )?;
        }
        Ok(())
    }
}
