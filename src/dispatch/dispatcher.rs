/*!
dispatcher.rs

  perform(command, args, streams)
    1. tokens = piped stdin tokens ++ args  -> ari::parse
    2. no identifiers, or a schemeless first one -> one global command
    3. otherwise every identifier in order, at most one command per scheme
  invoke(command, aris)
    nested dispatch on the same session, output captured in memory

Exit prints its message and counts as success. Abort ends the whole dispatch.
*/

use std::collections::HashSet;
use std::io::Write;
use std::rc::Rc;

use super::command::{Context, Invocation};
use super::flags::Flags;
use super::registry::{CommandSpec, Registry, canonical_name};
use crate::ari::{self, Ari};
use crate::config::ProviderConfig;
use crate::format::{self, StyleOptions};
use crate::session::Session;
use crate::signal::Signal;

/// Nested invocations deeper than this abort.
pub const MAX_INVOCATION_DEPTH: usize = 8;

/// Namespace used by global commands for their configuration handle.
const GLOBAL_NAMESPACE: &str = "global";

/// Input and output of one dispatch.
pub struct Streams<'a> {
    /// Piped input, read in full.
    pub input: Option<String>,
    pub output: &'a mut dyn Write,
    pub output_is_tty: bool,
}

pub struct Dispatcher {
    registry: &'static Registry,
    session: Rc<Session>,
    depth: usize,
}

impl Dispatcher {
    pub fn new(registry: &'static Registry, session: Rc<Session>) -> Self {
        Self {
            registry,
            session,
            depth: 0,
        }
    }

    pub fn registry(&self) -> &'static Registry {
        self.registry
    }

    pub fn session(&self) -> &Rc<Session> {
        &self.session
    }

    pub fn perform(
        &self,
        command: Option<&str>,
        args: &[String],
        streams: Streams<'_>,
    ) -> Result<(), Signal> {
        let Streams {
            input,
            output,
            output_is_tty,
        } = streams;

        let mut tokens = input.as_deref().map(ari::piped_tokens).unwrap_or_default();
        tokens.extend(args.iter().cloned());
        let aris = ari::parse(&tokens)?;
        let command = command_name(command);
        tracing::debug!(%command, aris = aris.len(), depth = self.depth, "dispatching");

        let global = aris.first().is_none_or(|a| a.scheme.is_none());
        if global {
            self.perform_global(&command, &aris, output, output_is_tty)
        } else {
            self.perform_scoped(&command, &aris, output, output_is_tty)
        }
    }

    fn perform_global(
        &self,
        command: &str,
        aris: &[Ari],
        output: &mut dyn Write,
        output_is_tty: bool,
    ) -> Result<(), Signal> {
        let spec = self.registry.resolve_global(command).ok_or_else(|| {
            Signal::abort(format!(
                "No such global command: {command}, perhaps you forgot to add an ARI?"
            ))
        })?;
        let index = if aris.is_empty() { None } else { Some(0) };
        match self.execute(spec, None, index, aris, output, output_is_tty) {
            Err(Signal::Exit(msg)) => {
                writeln!(output, "{msg}")?;
                Ok(())
            }
            other => other,
        }
    }

    fn perform_scoped(
        &self,
        command: &str,
        aris: &[Ari],
        output: &mut dyn Write,
        output_is_tty: bool,
    ) -> Result<(), Signal> {
        let mut used: HashSet<String> = HashSet::new();
        let mut executed = 0usize;
        let style = StyleOptions::detect();

        for (index, ari) in aris.iter().enumerate() {
            let Some(scheme) = ari.scheme() else {
                continue;
            };
            let scheme = scheme.to_lowercase();
            if used.contains(&scheme) {
                self.session
                    .warn(format!("Dropping command for already used scheme: {ari}"));
                continue;
            }
            let Some(spec) = self.registry.resolve(&scheme, command) else {
                tracing::debug!(%scheme, %command, "no command for scheme, skipping");
                continue;
            };
            used.insert(scheme.clone());
            executed += 1;

            if output_is_tty {
                let rendered = shell_words::join(
                    std::iter::once(ari.without_flags().to_string()).chain(ari.flags.iter().cloned()),
                );
                self.session.warn(format::banner(command, &rendered, &style));
            }

            match self.execute(spec, Some(&scheme), Some(index), aris, &mut *output, output_is_tty) {
                Ok(()) => {}
                Err(Signal::Exit(msg)) => writeln!(output, "{msg}")?,
                Err(abort) => return Err(abort),
            }
        }

        if executed == 0 && output_is_tty {
            return Err(Signal::abort("No providers found for command and ARI(s)"));
        }
        Ok(())
    }

    fn execute(
        &self,
        spec: &CommandSpec,
        scheme: Option<&str>,
        index: Option<usize>,
        aris: &[Ari],
        output: &mut dyn Write,
        output_is_tty: bool,
    ) -> Result<(), Signal> {
        let ari = index.and_then(|i| aris.get(i));
        let flags = Flags::parse(spec, ari.map(|a| a.flags.as_slice()).unwrap_or_default())?;
        let invocation = Invocation {
            path: ari.and_then(Ari::path).map(str::to_string),
            flags,
            config: ProviderConfig::new(
                scheme.unwrap_or(GLOBAL_NAMESPACE),
                Rc::clone(&self.session),
            ),
        };
        let mut command = (spec.build)(invocation);
        let mut ctx = Context {
            dispatcher: self,
            index,
            aris,
            output,
            output_is_tty,
        };
        tracing::trace!(command = spec.name, ?scheme, "performing");
        command.perform(&mut ctx)
    }

    /// Nested dispatch: `aris` become the piped input of a child dispatcher sharing this session.
    pub fn invoke(&self, command: &str, aris: &[Ari]) -> Result<String, Signal> {
        if aris.is_empty() {
            return Ok(String::new());
        }
        if self.depth >= MAX_INVOCATION_DEPTH {
            return Err(Signal::abort(format!(
                "Nested invocation of '{command}' exceeds the maximum depth of {MAX_INVOCATION_DEPTH}"
            )));
        }

        let child = Dispatcher {
            registry: self.registry,
            session: Rc::clone(&self.session),
            depth: self.depth + 1,
        };
        let input = aris
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        let mut buffer: Vec<u8> = Vec::new();
        child.perform(
            Some(command),
            &[],
            Streams {
                input: Some(input),
                output: &mut buffer,
                output_is_tty: false,
            },
        )?;
        let captured = String::from_utf8_lossy(&buffer).into_owned();
        tracing::debug!(%command, depth = child.depth, bytes = captured.len(), "nested invocation done");
        Ok(captured)
    }
}

fn command_name(command: Option<&str>) -> String {
    match command.map(str::trim) {
        None | Some("") | Some("-h") | Some("--help") => "help".to_string(),
        Some("--version") => "version".to_string(),
        Some(other) => canonical_name(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::command::Command;
    use crate::dispatch::flags::FlagSpec;
    use crate::dispatch::registry::Provider;
    use crate::session::testing::memory_session;
    use crate::utils::SharedBuffer;

    /// Prints what it was built from.
    struct Record(Invocation);

    impl Command for Record {
        fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
            let scheme = self.0.config.scheme();
            let path = self.0.path.clone().unwrap_or_else(|| "-".into());
            let loud = if self.0.flags.is_set("loud") { " loud" } else { "" };
            ctx.puts(format!("ran {scheme}:{path}{loud}"))
        }
    }

    struct Quit;

    impl Command for Quit {
        fn perform(&mut self, _ctx: &mut Context<'_>) -> Result<(), Signal> {
            Err(Signal::exit("stopped early"))
        }
    }

    struct Fail;

    impl Command for Fail {
        fn perform(&mut self, _ctx: &mut Context<'_>) -> Result<(), Signal> {
            Err(Signal::abort("broken"))
        }
    }

    /// Asks its siblings to `record` and prints the answer.
    struct Relay;

    impl Command for Relay {
        fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
            let siblings = ctx.siblings();
            let answer = ctx.invoke("record", &siblings)?;
            for line in answer.lines() {
                ctx.puts(format!("relayed {line}"))?;
            }
            Ok(())
        }
    }

    /// Invokes itself until the depth guard trips.
    struct Recurse;

    impl Command for Recurse {
        fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
            ctx.invoke("recurse", &[Ari::new("x", Some("1"))]).map(|_| ())
        }
    }

    fn record(i: Invocation) -> Box<dyn Command> {
        Box::new(Record(i))
    }
    fn quit(_: Invocation) -> Box<dyn Command> {
        Box::new(Quit)
    }
    fn fail(_: Invocation) -> Box<dyn Command> {
        Box::new(Fail)
    }
    fn relay(_: Invocation) -> Box<dyn Command> {
        Box::new(Relay)
    }
    fn recurse(_: Invocation) -> Box<dyn Command> {
        Box::new(Recurse)
    }

    const RECORD_FLAGS: &[FlagSpec] = &[FlagSpec::switch('l', "loud", "Say it loud")];

    static REGISTRY: Registry = Registry {
        providers: &[
            Provider {
                scheme: "x",
                description: "first",
                commands: &[
                    CommandSpec::new("start", "start <x:path>", "", record),
                    CommandSpec::new("record", "record <x:path>", "", record)
                        .with_flags(RECORD_FLAGS),
                    CommandSpec::new("stop", "stop <x>", "", quit),
                    CommandSpec::new("relay", "relay <x>", "", relay),
                    CommandSpec::new("recurse", "recurse <x>", "", recurse),
                ],
            },
            Provider {
                scheme: "y",
                description: "second",
                commands: &[
                    CommandSpec::new("record", "record <y:path>", "", record),
                    CommandSpec::new("stop", "stop <y>", "", record),
                    CommandSpec::new("explode", "explode <y>", "", fail),
                ],
            },
        ],
        globals: &[
            CommandSpec::new("help", "help", "", quit),
            CommandSpec::new("record", "record", "", record),
        ],
    };

    struct Run {
        result: Result<(), Signal>,
        out: String,
        err: String,
    }

    fn run(command: Option<&str>, args: &[&str], input: Option<&str>, tty: bool) -> Run {
        let (session, err) = memory_session("");
        let dispatcher = Dispatcher::new(&REGISTRY, session);
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let out = SharedBuffer::default();
        let mut writer = out.clone();
        let result = dispatcher.perform(
            command,
            &args,
            Streams {
                input: input.map(str::to_string),
                output: &mut writer,
                output_is_tty: tty,
            },
        );
        Run {
            result,
            out: out.contents(),
            err: err.contents(),
        }
    }

    #[test]
    fn only_implementing_schemes_execute() {
        let r = run(Some("start"), &["x:1", "y:2"], None, false);
        assert!(r.result.is_ok());
        assert_eq!(r.out, "ran x:1\n");
    }

    #[test]
    fn repeated_scheme_runs_once_and_warns() {
        let r = run(Some("record"), &["x:1", "x:2"], None, false);
        assert!(r.result.is_ok());
        assert_eq!(r.out, "ran x:1\n");
        assert!(r.err.contains("Dropping command for already used scheme: x:2"));
    }

    #[test]
    fn empty_input_goes_to_global_help() {
        let r = run(None, &[], None, true);
        assert!(r.result.is_ok());
        assert_eq!(r.out, "stopped early\n");

        let r = run(Some("--help"), &[], None, true);
        assert_eq!(r.out, "stopped early\n");
    }

    #[test]
    fn leading_flags_select_global_command() {
        let r = run(Some("record"), &["--loud"], None, false);
        assert!(r.result.is_err(), "global record has no flags");

        let r = run(Some("record"), &[], None, false);
        assert_eq!(r.out, "ran global:-\n");
    }

    #[test]
    fn unknown_global_command_aborts() {
        let r = run(Some("frobnicate"), &[], None, false);
        let err = r.result.unwrap_err();
        assert!(err.message().contains("No such global command: frobnicate"));
    }

    #[test]
    fn flags_reach_the_command() {
        let r = run(Some("record"), &["x:1", "--loud", "--", "y:2"], None, false);
        assert_eq!(r.out, "ran x:1 loud\nran y:2\n");
    }

    #[test]
    fn exit_prints_and_continues() {
        let r = run(Some("stop"), &["x", "y:9"], None, false);
        assert!(r.result.is_ok());
        assert_eq!(r.out, "stopped early\nran y:9\n");
    }

    #[test]
    fn abort_stops_the_dispatch() {
        let r = run(Some("explode"), &["y:1"], None, false);
        assert_eq!(r.result.unwrap_err(), Signal::abort("broken"));
        assert!(r.out.is_empty());
    }

    #[test]
    fn no_providers_aborts_only_on_terminal() {
        let r = run(Some("start"), &["y:2"], None, true);
        assert_eq!(
            r.result.unwrap_err().message(),
            "No providers found for command and ARI(s)"
        );

        let r = run(Some("start"), &["y:2"], None, false);
        assert!(r.result.is_ok());
        assert!(r.out.is_empty());
    }

    #[test]
    fn banner_on_terminal_output() {
        let r = run(Some("start"), &["x:1"], None, true);
        assert!(r.err.contains("===== START x:1 ====="));

        let r = run(Some("start"), &["x:1"], None, false);
        assert!(!r.err.contains("====="));
    }

    #[test]
    fn piped_identifiers_come_first() {
        let r = run(Some("record"), &["x:1"], Some("y:2 # second provider\n"), false);
        assert_eq!(r.out, "ran y:2\nran x:1\n");
    }

    #[test]
    fn invoke_captures_sibling_output() {
        let r = run(Some("relay"), &["x:1", "y:7"], None, false);
        assert!(r.result.is_ok());
        // y never runs relay itself, it only answers the nested record
        assert_eq!(r.out, "relayed ran y:7\n");
    }

    #[test]
    fn invoke_without_siblings_is_empty() {
        let r = run(Some("relay"), &["x:1"], None, false);
        assert!(r.result.is_ok());
        assert!(r.out.is_empty());
    }

    #[test]
    fn runaway_nesting_aborts() {
        let r = run(Some("recurse"), &["x:1"], None, false);
        let err = r.result.unwrap_err();
        assert!(err.message().contains("maximum depth"));
    }

    #[test]
    fn command_aliases() {
        assert_eq!(command_name(None), "help");
        assert_eq!(command_name(Some("-h")), "help");
        assert_eq!(command_name(Some("--version")), "version");
        assert_eq!(command_name(Some("Branch_Name")), "branch-name");
    }
}
