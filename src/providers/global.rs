//! Commands run without a provider identifier.

use crate::ari::Ari;
use crate::dispatch::{Command, CommandSpec, Context, Invocation, Registry};
use crate::format::{self, StyleOptions};
use crate::signal::Signal;

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new("help", "help", "Show usage, global commands and providers", help),
    CommandSpec::new("version", "version", "Show the version", version),
    CommandSpec::new("commands", "commands", "List every provider command", commands),
    CommandSpec::new("examples", "examples", "Show example pipelines", examples),
    CommandSpec::new(
        "share",
        "share",
        "Print the remembered identifier of every provider",
        share,
    ),
];

const USAGE: &str = "Usage: abt [-v|-vv|-q] <command> [<scheme>[:<path>] [<flags>...] [--]]...";

const EXAMPLES: &str = "\
Remember what you work on:
  abt pick asana
  abt pick harvest

Start working: remembered task current, timer running with the task as notes:
  abt start asana harvest

Same, with explicit identifiers and a comment for the timer:
  abt start asana:1201/1305 harvest:27/981 --comment=pairing

Branch named after the Azure DevOps work item:
  abt branch git devops:acme/web/42

Pipe identifiers between commands (everything after ' # ' is ignored):
  abt tasks asana | grep -i login | abt current
  abt share | ssh other-host abt current

Stop the timer:
  abt stop harvest";

fn help(_: Invocation) -> Box<dyn Command> {
    Box::new(Help)
}

fn version(_: Invocation) -> Box<dyn Command> {
    Box::new(Version)
}

fn commands(_: Invocation) -> Box<dyn Command> {
    Box::new(Commands)
}

fn examples(_: Invocation) -> Box<dyn Command> {
    Box::new(Examples)
}

fn share(_: Invocation) -> Box<dyn Command> {
    Box::new(Share)
}

struct Help;

impl Command for Help {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        Err(Signal::exit(help_text(ctx.registry())))
    }
}

pub fn help_text(registry: &Registry) -> String {
    let style = StyleOptions::plain();
    let globals: Vec<Vec<String>> = registry
        .globals()
        .iter()
        .map(|c| vec![c.name.to_string(), c.description.to_string()])
        .collect();
    let providers: Vec<Vec<String>> = registry
        .providers()
        .iter()
        .map(|p| vec![p.scheme.to_string(), p.description.to_string()])
        .collect();

    let mut out = String::new();
    out.push_str(env!("CARGO_PKG_DESCRIPTION"));
    out.push_str("\n\n");
    out.push_str(USAGE);
    out.push_str("\n\nGlobal commands:\n");
    out.push_str(&indent(&format::table(&globals, &style)));
    out.push_str("\nProviders:\n");
    out.push_str(&indent(&format::table(&providers, &style)));
    out.push_str(
        "\nRun `abt commands` to list provider commands and `abt <command> <scheme> -h` for flags.",
    );
    out
}

fn indent(block: &str) -> String {
    block.lines().map(|l| format!("  {l}\n")).collect()
}

struct Version;

impl Command for Version {
    fn perform(&mut self, _ctx: &mut Context<'_>) -> Result<(), Signal> {
        Err(Signal::exit(format!("abt {}", env!("CARGO_PKG_VERSION"))))
    }
}

struct Commands;

impl Command for Commands {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let rows: Vec<Vec<String>> = ctx
            .registry()
            .providers()
            .iter()
            .flat_map(|p| {
                p.commands.iter().map(move |c| {
                    vec![p.scheme.to_string(), c.name.to_string(), c.description.to_string()]
                })
            })
            .collect();
        let style = if ctx.output_is_tty() {
            StyleOptions::detect()
        } else {
            StyleOptions::plain()
        };
        for line in format::table(&rows, &style).lines() {
            ctx.puts(line)?;
        }
        Ok(())
    }
}

struct Examples;

impl Command for Examples {
    fn perform(&mut self, _ctx: &mut Context<'_>) -> Result<(), Signal> {
        Err(Signal::exit(EXAMPLES))
    }
}

/// Asks every provider implementing `share` for its identifier.
struct Share;

impl Command for Share {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let aris: Vec<Ari> = ctx
            .registry()
            .schemes_for("share")
            .into_iter()
            .map(|scheme| Ari::new(scheme, None))
            .collect();
        let shared = ctx.invoke("share", &aris)?;
        for line in shared.lines().filter(|l| !l.trim().is_empty()) {
            ctx.puts(line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::testing::settings;
    use crate::config::{DirectoryConfig, MemoryStore};
    use crate::providers::shared::testing::run;
    use crate::session::testing::{memory_session, session_with};

    #[test]
    fn help_lists_globals_and_providers() {
        let (session, _) = memory_session("");
        let (result, out) = run(&session, "help", &[]);
        assert!(result.is_ok());
        assert!(out.contains("Usage: abt"));
        assert!(out.contains("  examples"));
        for scheme in ["asana", "harvest", "devops", "git"] {
            assert!(out.contains(&format!("  {scheme} ")), "missing {scheme}");
        }
    }

    #[test]
    fn version_exits_with_package_version() {
        let (session, _) = memory_session("");
        let (result, out) = run(&session, "--version", &[]);
        assert!(result.is_ok());
        assert_eq!(out, format!("abt {}\n", env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn commands_lists_provider_commands() {
        let (session, _) = memory_session("");
        let (_, out) = run(&session, "commands", &[]);
        assert!(out.lines().any(|l| l.starts_with("asana ") && l.contains("branch-name")));
        assert!(out.lines().any(|l| l.starts_with("git ") && l.contains("branch")));
        assert!(out.lines().any(|l| l.starts_with("harvest") && l.contains("stop")));
    }

    #[test]
    fn examples_are_printed() {
        let (session, _) = memory_session("");
        let (result, out) = run(&session, "examples", &[]);
        assert!(result.is_ok());
        assert!(out.contains("abt start asana harvest"));
    }

    #[test]
    fn share_collects_remembered_identifiers() {
        let s = settings(
            MemoryStore::new("repo")
                .with("abt.asana.path", "1201/1305")
                .with("abt.harvest.path", "27/981"),
            MemoryStore::new("user"),
            DirectoryConfig::default(),
        );
        let (session, err) = session_with(s, "");
        let (result, out) = run(&session, "share", &[]);
        assert!(result.is_ok());
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines.contains(&"asana:1201/1305"));
        assert!(lines.contains(&"harvest:27/981"));
        assert!(err.contents().contains("No devops path to share"));
    }
}
