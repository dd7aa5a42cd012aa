//! Build-time command tables.

use super::command::{Command, Invocation};
use super::flags::FlagSpec;

/// Constructs one command instance for one invocation.
pub type Factory = fn(Invocation) -> Box<dyn Command>;

/// Static description of a command: how it is called and how it is built.
pub struct CommandSpec {
    /// Canonical kebab-case name.
    pub name: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
    pub flags: &'static [FlagSpec],
    pub build: Factory,
}

impl CommandSpec {
    pub const fn new(
        name: &'static str,
        usage: &'static str,
        description: &'static str,
        build: Factory,
    ) -> Self {
        Self {
            name,
            usage,
            description,
            flags: &[],
            build,
        }
    }

    pub const fn with_flags(mut self, flags: &'static [FlagSpec]) -> Self {
        self.flags = flags;
        self
    }
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("flags", &self.flags.len())
            .finish()
    }
}

/// One scheme and the commands it implements.
#[derive(Debug)]
pub struct Provider {
    pub scheme: &'static str,
    pub description: &'static str,
    pub commands: &'static [CommandSpec],
}

impl Provider {
    pub fn command(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.iter().find(|c| c.name == name)
    }
}

/// Provider and global command tables, declared as a `static`.
#[derive(Debug)]
pub struct Registry {
    pub providers: &'static [Provider],
    pub globals: &'static [CommandSpec],
}

impl Registry {
    pub fn providers(&self) -> &'static [Provider] {
        self.providers
    }

    pub fn globals(&self) -> &'static [CommandSpec] {
        self.globals
    }

    pub fn provider(&self, scheme: &str) -> Option<&'static Provider> {
        self.providers
            .iter()
            .find(|p| p.scheme.eq_ignore_ascii_case(scheme))
    }

    /// Command `command` of the provider registered for `scheme`. Not found is not an error.
    pub fn resolve(&self, scheme: &str, command: &str) -> Option<&'static CommandSpec> {
        let name = canonical_name(command);
        let provider = self.provider(scheme)?;
        provider.commands.iter().find(|c| c.name == name)
    }

    pub fn resolve_global(&self, command: &str) -> Option<&'static CommandSpec> {
        let name = canonical_name(command);
        self.globals.iter().find(|c| c.name == name)
    }

    /// Schemes implementing `command`, in registration order.
    pub fn schemes_for(&self, command: &str) -> Vec<&'static str> {
        let name = canonical_name(command);
        self.providers
            .iter()
            .filter(|p| p.command(&name).is_some())
            .map(|p| p.scheme)
            .collect()
    }
}

/// `Harvest_Time_Entry_Data ` -> `harvest-time-entry-data`
pub fn canonical_name(name: &str) -> String {
    name.trim().to_lowercase().replace('_', "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::command::Context;
    use crate::signal::Signal;

    struct Noop;

    impl Command for Noop {
        fn perform(&mut self, _ctx: &mut Context<'_>) -> Result<(), Signal> {
            Ok(())
        }
    }

    fn noop(_: Invocation) -> Box<dyn Command> {
        Box::new(Noop)
    }

    static REGISTRY: Registry = Registry {
        providers: &[
            Provider {
                scheme: "asana",
                description: "Asana",
                commands: &[
                    CommandSpec::new("start", "", "", noop),
                    CommandSpec::new("branch-name", "", "", noop),
                ],
            },
            Provider {
                scheme: "git",
                description: "Git",
                commands: &[CommandSpec::new("branch", "", "", noop)],
            },
        ],
        globals: &[CommandSpec::new("help", "", "", noop)],
    };

    #[test]
    fn canonical_names() {
        assert_eq!(canonical_name(" Branch_Name "), "branch-name");
        assert_eq!(canonical_name("pick"), "pick");
    }

    #[test]
    fn resolve_by_scheme_and_normalized_command() {
        assert_eq!(REGISTRY.resolve("asana", "branch_name").unwrap().name, "branch-name");
        assert_eq!(REGISTRY.resolve("ASANA", "start").unwrap().name, "start");
        assert!(REGISTRY.resolve("git", "start").is_none());
        assert!(REGISTRY.resolve("jira", "start").is_none());
    }

    #[test]
    fn globals_are_separate_from_providers() {
        assert!(REGISTRY.resolve_global("help").is_some());
        assert!(REGISTRY.resolve_global("start").is_none());
        assert!(REGISTRY.resolve("asana", "help").is_none());
    }

    #[test]
    fn schemes_for_command() {
        assert_eq!(REGISTRY.schemes_for("branch"), vec!["git"]);
        assert!(REGISTRY.schemes_for("nothing").is_empty());
    }
}
