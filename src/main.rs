use std::io::{IsTerminal, Read};
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::Context as _;
use clap::Parser;

mod ari;
mod config;
mod dispatch;
mod format;
mod prompt;
mod providers;
mod session;
mod signal;
mod utils;

use dispatch::{Dispatcher, Streams};
use session::Session;
use signal::Signal;

/// abt - one verb, many providers.
///
///   abt <command> <scheme>[:<path>] [<flags>...] [--] ...
///
/// Every identifier (ARI) names a provider and an optional path within it:
///   asana:<project_gid>/<task_gid>
///   harvest:<project_id>/<task_id>
///   devops:<organization>/<project>/<work_item_id>
///   git:<branch>
///
/// Each provider implementing <command> runs once, in identifier order. Identifiers piped on
/// stdin (one per line, `# comment` allowed) come before the ones on the command line, so the
/// output of one invocation can drive the next:
///   abt tasks asana | grep -i login | abt start harvest
///
/// Without identifiers a global command runs: help, version, commands, examples, share.
///
/// Global flags / env:
///   -v / -vv        Increase verbosity
///   -q / --quiet    Errors only
///   RUST_LOG        Overrides the log filter
///   NO_COLOR        Plain banners and tables
#[derive(Parser, Debug)]
#[command(
    name = "abt",
    author,
    about = "abt - compose Asana, Harvest, Azure DevOps and Git workflows from one command line",
    disable_help_flag = true,
    disable_version_flag = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Silence everything but errors
    #[arg(short, long)]
    quiet: bool,

    /// Print help (same as `abt help`); after a command, that command's flags
    #[arg(short = 'h', long = "help")]
    help: bool,

    /// Print version (same as `abt version`)
    #[arg(long = "version")]
    version: bool,

    /// Command to run (help when omitted)
    command: Option<String>,

    /// Identifiers and their flags
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Cli {
    /// Command name and tokens for the dispatcher. A help flag given together with a command
    /// goes to that command's own flag table.
    fn dispatch_target(&self) -> (Option<&str>, Vec<String>) {
        match (self.command.as_deref(), self.help) {
            (Some(command), true) => {
                let args = std::iter::once("-h".to_string())
                    .chain(self.args.iter().cloned())
                    .collect();
                (Some(command), args)
            }
            (None, true) => (Some("--help"), self.args.clone()),
            (_, false) if self.version => (Some("--version"), self.args.clone()),
            (command, false) => (command, self.args.clone()),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    utils::init_logging(utils::derive_level(cli.verbose, cli.quiet));

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(signal) if signal.is_abort() => {
            eprintln!("Error: {}", signal.message());
            ExitCode::FAILURE
        }
        Err(signal) => {
            println!("{}", signal.message());
            ExitCode::SUCCESS
        }
    }
}

fn run(cli: &Cli) -> Result<(), Signal> {
    let session = Rc::new(Session::from_environment()?);
    let dispatcher = Dispatcher::new(&providers::REGISTRY, session);

    let input = read_piped_stdin()?;
    let stdout = std::io::stdout();
    let output_is_tty = stdout.is_terminal();
    let mut output = stdout.lock();

    let (command, args) = cli.dispatch_target();
    dispatcher.perform(
        command,
        &args,
        Streams {
            input,
            output: &mut output,
            output_is_tty,
        },
    )
}

/// Whole stdin when it is piped, `None` on a terminal.
fn read_piped_stdin() -> anyhow::Result<Option<String>> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let mut buf = String::new();
    stdin
        .read_to_string(&mut buf)
        .context("Failed to read identifiers from stdin")?;
    Ok(Some(buf))
}
