//! What a running command sees.

use std::cell::RefMut;
use std::io::Write;
use std::rc::Rc;

use super::dispatcher::Dispatcher;
use super::flags::Flags;
use super::registry::Registry;
use crate::ari::Ari;
use crate::config::ProviderConfig;
use crate::prompt::Prompt;
use crate::session::Session;
use crate::signal::Signal;

/// One unit of work, built fresh for every invocation.
pub trait Command {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal>;
}

/// Everything a command is constructed from.
#[derive(Clone)]
pub struct Invocation {
    pub path: Option<String>,
    pub flags: Flags,
    pub config: ProviderConfig,
}

impl Invocation {
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Explicit path, or the remembered one.
    pub fn current_path(&self) -> Result<Option<String>, Signal> {
        match &self.path {
            Some(p) => Ok(Some(p.clone())),
            None => self.config.path(),
        }
    }

    /// Like [`Invocation::current_path`], aborting when neither is set.
    pub fn require_path(&self) -> Result<String, Signal> {
        self.current_path()?.ok_or_else(|| {
            Signal::abort(format!(
                "No {0} path given and none remembered; run `abt pick {0}` or pass {0}:<path>",
                self.config.scheme()
            ))
        })
    }
}

/// Runtime surroundings of a command: output, sibling identifiers, prompt and the bridge.
pub struct Context<'a> {
    pub(super) dispatcher: &'a Dispatcher,
    pub(super) index: Option<usize>,
    pub(super) aris: &'a [Ari],
    pub(super) output: &'a mut dyn Write,
    pub(super) output_is_tty: bool,
}

impl<'a> Context<'a> {
    /// Other identifiers of the current dispatch, stripped of flags.
    pub fn siblings(&self) -> Vec<Ari> {
        self.aris
            .iter()
            .enumerate()
            .filter(|(i, a)| Some(*i) != self.index && a.scheme.is_some())
            .map(|(_, a)| a.without_flags())
            .collect()
    }

    pub fn registry(&self) -> &'static Registry {
        self.dispatcher.registry()
    }

    pub fn session(&self) -> &Rc<Session> {
        self.dispatcher.session()
    }

    pub fn output_is_tty(&self) -> bool {
        self.output_is_tty
    }

    /// Write one line to the command output (stdout, or the buffer of a nested invocation).
    pub fn puts(&mut self, line: impl AsRef<str>) -> Result<(), Signal> {
        writeln!(self.output, "{}", line.as_ref())?;
        Ok(())
    }

    /// Write a `scheme:path # description` line.
    pub fn print_ari(
        &mut self,
        scheme: &str,
        path: &str,
        description: Option<&str>,
    ) -> Result<(), Signal> {
        let line = Ari::new(scheme, Some(path)).output_line(description);
        self.puts(line)
    }

    /// Narration on stderr.
    pub fn warn(&self, msg: impl AsRef<str>) {
        self.session().warn(msg);
    }

    pub fn prompt(&self) -> RefMut<'_, Prompt> {
        self.session().prompt()
    }

    /// Run `command` for `aris` in a nested dispatch and return what it printed.
    pub fn invoke(&self, command: &str, aris: &[Ari]) -> Result<String, Signal> {
        self.dispatcher.invoke(command, aris)
    }
}
