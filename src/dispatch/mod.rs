/*!
Command routing.

  registry.rs    FlagSpec / CommandSpec / Provider tables + Registry lookups
  flags.rs       per-command flag parsing (clap builder over a FlagSpec table)
  command.rs     Command trait, Invocation, Context handed to running commands
  dispatcher.rs  global vs scoped dispatch, per-scheme dedup, nested invocation

Conventions:
  - Every command returns `Result<(), Signal>`; `Signal::Exit` is a successful stop.
  - Commands never print to stdout directly; they go through `Context::puts` so nested
    invocations can capture their output.
*/

pub mod command;
pub mod dispatcher;
pub mod flags;
pub mod registry;

pub use command::{Command, Context, Invocation};
pub use dispatcher::{Dispatcher, Streams};
pub use flags::FlagSpec;
pub use registry::{CommandSpec, Provider, Registry};
