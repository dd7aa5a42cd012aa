//! Git branches of the repository in the working directory: `git[:<branch>]`.

use std::path::Path;
use std::process::Command as Process;

use anyhow::{Context as _, Result, bail};

use crate::dispatch::{Command, CommandSpec, Context, Invocation};
use crate::signal::{AbortContext, Signal};

pub const SCHEME: &str = "git";

/// Command other providers implement to suggest a branch.
pub const BRANCH_NAME_COMMAND: &str = "branch-name";

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new(
        "branch",
        "branch git[:<branch>] [<ari>...]",
        "Switch to (or create) a branch; other identifiers suggest the name",
        branch,
    ),
    CommandSpec::new("share", "share git", "Print the current branch", share),
];

fn branch(invocation: Invocation) -> Box<dyn Command> {
    Box::new(Branch(invocation))
}

fn share(invocation: Invocation) -> Box<dyn Command> {
    Box::new(Share(invocation))
}

struct Branch(Invocation);

impl Command for Branch {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let name = match self.0.path() {
            Some(name) => name.to_string(),
            None => {
                let siblings = ctx.siblings();
                let answer = ctx.invoke(BRANCH_NAME_COMMAND, &siblings)?;
                first_branch_name(&answer).abort_with(
                    "No branch name given; pass git:<branch> or an identifier that suggests one",
                )?
            }
        };

        let workdir = ctx.session().settings().workdir().to_path_buf();
        let exists = branch_exists(&workdir, &name)?;
        switch_branch(&workdir, &name, !exists)?;
        ctx.warn(if exists {
            format!("Switched to branch {name}")
        } else {
            format!("Created and switched to branch {name}")
        });
        ctx.print_ari(SCHEME, &name, None)
    }
}

struct Share(Invocation);

impl Command for Share {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let name = match self.0.path() {
            Some(name) => name.to_string(),
            None => match current_branch(ctx.session().settings().workdir()) {
                Ok(name) => name,
                Err(e) => {
                    ctx.warn(format!("No git branch to share: {e:#}"));
                    return Ok(());
                }
            },
        };
        ctx.print_ari(SCHEME, &name, None)
    }
}

/// First non-empty line, without any trailing annotation.
pub fn first_branch_name(output: &str) -> Option<String> {
    output
        .lines()
        .map(|l| l.split(crate::ari::COMMENT_SEPARATOR).next().unwrap_or(l).trim())
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

fn git(workdir: &Path, args: &[&str]) -> Result<std::process::Output> {
    tracing::debug!(?args, "git");
    Process::new("git")
        .args(args)
        .current_dir(workdir)
        .output()
        .with_context(|| format!("Failed to run git {}", args.join(" ")))
}

pub fn current_branch(workdir: &Path) -> Result<String> {
    let out = git(workdir, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    if !out.status.success() {
        bail!(
            "Unable to determine the current branch: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

pub fn branch_exists(workdir: &Path, name: &str) -> Result<bool> {
    let reference = format!("refs/heads/{name}");
    let out = git(workdir, &["rev-parse", "--verify", "--quiet", &reference])?;
    Ok(out.status.success())
}

/// Switch to `name`; `create` branches off HEAD.
pub fn switch_branch(workdir: &Path, name: &str, create: bool) -> Result<()> {
    let args: &[&str] = if create {
        &["switch", "-c", name]
    } else {
        &["switch", name]
    };
    let out = git(workdir, args)?;
    if !out.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::shared::testing::run;
    use crate::session::testing::memory_session;

    #[test]
    fn branch_name_from_answer() {
        assert_eq!(
            first_branch_name("\n  fix-login-fails\nother\n").as_deref(),
            Some("fix-login-fails")
        );
        assert_eq!(
            first_branch_name("42-broken-login # Bug #42\n").as_deref(),
            Some("42-broken-login")
        );
        assert_eq!(first_branch_name(" \n"), None);
    }

    #[test]
    fn branch_without_name_or_siblings_aborts() {
        let (session, _) = memory_session("");
        let (result, out) = run(&session, "branch", &["git"]);
        assert!(result.unwrap_err().message().contains("No branch name given"));
        assert!(out.is_empty());
    }

    #[test]
    fn share_with_explicit_branch() {
        let (session, _) = memory_session("");
        let (result, out) = run(&session, "share", &["git:feature/x"]);
        assert!(result.is_ok());
        assert_eq!(out, "git:feature/x\n");
    }

    #[test]
    fn switch_creates_then_reuses_branch() {
        let dir = tempfile::tempdir().unwrap();
        let Ok(init) = git(dir.path(), &["init", "--quiet", "--initial-branch=main"]) else {
            return; // git not installed
        };
        if !init.status.success() {
            return;
        }
        for args in [
            &["config", "user.email", "abt@example.test"][..],
            &["config", "user.name", "abt"][..],
            &["commit", "--quiet", "--allow-empty", "-m", "init"][..],
        ] {
            assert!(git(dir.path(), args).unwrap().status.success());
        }

        assert!(!branch_exists(dir.path(), "feature-1").unwrap());
        switch_branch(dir.path(), "feature-1", true).unwrap();
        assert_eq!(current_branch(dir.path()).unwrap(), "feature-1");

        git(dir.path(), &["switch", "--quiet", "main"]).unwrap();
        assert!(branch_exists(dir.path(), "feature-1").unwrap());
        switch_branch(dir.path(), "feature-1", false).unwrap();
        assert_eq!(current_branch(dir.path()).unwrap(), "feature-1");
        assert!(switch_branch(dir.path(), "feature-1", true).is_err());
    }
}
