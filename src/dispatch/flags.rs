//! Per-command flags.
//!
//! Commands declare a `&'static [FlagSpec]`; the flag tokens that followed an identifier are
//! parsed against it with the clap builder API. Values must be attached to their flag
//! (`--comment=text`, `-ctext`) because only `-` prefixed tokens belong to an identifier.

use clap::{Arg, ArgAction, ArgMatches};

use super::registry::CommandSpec;
use crate::signal::Signal;

#[derive(Debug, Clone, Copy)]
pub struct FlagSpec {
    pub short: Option<char>,
    pub long: &'static str,
    /// Value name for flags taking a value; `None` for switches.
    pub value: Option<&'static str>,
    pub help: &'static str,
}

impl FlagSpec {
    pub const fn switch(short: char, long: &'static str, help: &'static str) -> Self {
        Self {
            short: Some(short),
            long,
            value: None,
            help,
        }
    }

    pub const fn option(
        short: char,
        long: &'static str,
        value: &'static str,
        help: &'static str,
    ) -> Self {
        Self {
            short: Some(short),
            long,
            value: Some(value),
            help,
        }
    }

    fn to_arg(self) -> Arg {
        let mut arg = Arg::new(self.long).long(self.long).help(self.help);
        if let Some(short) = self.short {
            arg = arg.short(short);
        }
        match self.value {
            Some(name) => arg.value_name(name).action(ArgAction::Set),
            None => arg.action(ArgAction::SetTrue),
        }
    }

    fn signature(&self) -> String {
        let short = self.short.map(|c| format!("-{c}, ")).unwrap_or_default();
        match self.value {
            Some(v) => format!("{short}--{}=<{v}>", self.long),
            None => format!("{short}--{}", self.long),
        }
    }
}

const HELP_FLAG: FlagSpec = FlagSpec::switch('h', "help", "Show usage of this command");

/// Parsed flags of one invocation.
#[derive(Debug, Clone, Default)]
pub struct Flags {
    matches: Option<ArgMatches>,
}

impl Flags {
    /// Parse `tokens` against the flag table of `spec`.
    ///
    /// `-h/--help` stops with `Exit(help)`; unknown flags and stray values abort.
    pub fn parse(spec: &CommandSpec, tokens: &[String]) -> Result<Self, Signal> {
        let mut cmd = clap::Command::new(spec.name)
            .no_binary_name(true)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .arg(HELP_FLAG.to_arg());
        for flag in spec.flags {
            cmd = cmd.arg(flag.to_arg());
        }

        let matches = cmd
            .try_get_matches_from(tokens)
            .map_err(|e| Signal::abort(format!("{}\n\n{}", first_line(&e.to_string()), usage_line(spec))))?;

        if matches.get_flag(HELP_FLAG.long) {
            return Err(Signal::exit(help_text(spec)));
        }
        Ok(Self {
            matches: Some(matches),
        })
    }

    /// Whether switch `long` was given. Unknown names read as `false`.
    pub fn is_set(&self, long: &str) -> bool {
        self.matches
            .as_ref()
            .and_then(|m| m.try_get_one::<bool>(long).ok().flatten())
            .copied()
            .unwrap_or(false)
    }

    pub fn value(&self, long: &str) -> Option<&str> {
        self.matches
            .as_ref()
            .and_then(|m| m.try_get_one::<String>(long).ok().flatten())
            .map(String::as_str)
    }
}

fn first_line(rendered: &str) -> String {
    let line = rendered.lines().next().unwrap_or_default();
    line.strip_prefix("error: ").unwrap_or(line).to_string()
}

fn usage_line(spec: &CommandSpec) -> String {
    format!("Usage: abt {}", spec.usage)
}

/// Usage, description and flag table of a command.
pub fn help_text(spec: &CommandSpec) -> String {
    let mut out = format!("{}\n\n{}\n", usage_line(spec), spec.description);
    let rows: Vec<(String, &str)> = std::iter::once(&HELP_FLAG)
        .chain(spec.flags.iter())
        .map(|f| (f.signature(), f.help))
        .collect();
    let width = rows.iter().map(|(s, _)| s.len()).max().unwrap_or(0);
    out.push_str("\nFlags:\n");
    for (signature, help) in rows {
        out.push_str(&format!("  {signature:<width$}  {help}\n"));
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::command::{Command, Context, Invocation};

    struct Noop;

    impl Command for Noop {
        fn perform(&mut self, _ctx: &mut Context<'_>) -> Result<(), Signal> {
            Ok(())
        }
    }

    fn noop(_: Invocation) -> Box<dyn Command> {
        Box::new(Noop)
    }

    const START_FLAGS: &[FlagSpec] = &[
        FlagSpec::switch('d', "dry-run", "Do not remember the selection"),
        FlagSpec::option('c', "comment", "TEXT", "Notes for the time entry"),
    ];

    fn spec() -> CommandSpec {
        CommandSpec::new("start", "start <harvest[:<project>/<task>]>", "Start tracking time", noop)
            .with_flags(START_FLAGS)
    }

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn switches_and_attached_values() {
        let flags = Flags::parse(&spec(), &tokens(&["-d", "--comment=pairing"])).unwrap();
        assert!(flags.is_set("dry-run"));
        assert_eq!(flags.value("comment"), Some("pairing"));

        let short = Flags::parse(&spec(), &tokens(&["-creview"])).unwrap();
        assert!(!short.is_set("dry-run"));
        assert_eq!(short.value("comment"), Some("review"));
    }

    #[test]
    fn no_tokens_means_nothing_set() {
        let flags = Flags::parse(&spec(), &[]).unwrap();
        assert!(!flags.is_set("dry-run"));
        assert_eq!(flags.value("comment"), None);
        assert!(!flags.is_set("no-such-flag"));
    }

    #[test]
    fn unknown_flag_aborts_with_usage() {
        let err = Flags::parse(&spec(), &tokens(&["--force"])).unwrap_err();
        assert!(err.is_abort());
        assert!(err.message().contains("--force"));
        assert!(err.message().contains("Usage: abt start"));
    }

    #[test]
    fn help_exits_with_flag_table() {
        let err = Flags::parse(&spec(), &tokens(&["-h"])).unwrap_err();
        assert!(!err.is_abort());
        let help = err.message();
        assert!(help.starts_with("Usage: abt start"));
        assert!(help.contains("-d, --dry-run"));
        assert!(help.contains("-c, --comment=<TEXT>"));
    }
}
