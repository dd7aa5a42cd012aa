//! Commands every path based provider offers.
//!
//! share         print scheme:path of the explicit or remembered path
//! clear         forget the remembered path (-g: user credentials, -a: both)
//! write-config  store the path in .abt.yml (-c: drop the provider section)
//! current       remember an explicit path, or show the remembered one

use std::marker::PhantomData;

use super::Backend;
use crate::config::{PATH_KEY, Tier};
use crate::dispatch::{Command, Context, FlagSpec, Invocation};
use crate::signal::Signal;

pub const CLEAR_FLAGS: &[FlagSpec] = &[
    FlagSpec::switch('g', "global", "Clear the user wide credentials instead of the path"),
    FlagSpec::switch('a', "all", "Clear both the remembered path and the credentials"),
];

pub const WRITE_CONFIG_FLAGS: &[FlagSpec] = &[FlagSpec::switch(
    'c',
    "clean",
    "Remove the provider section from the directory configuration",
)];

pub fn share(invocation: Invocation) -> Box<dyn Command> {
    Box::new(Share(invocation))
}

pub fn clear(invocation: Invocation) -> Box<dyn Command> {
    Box::new(Clear(invocation))
}

pub fn write_config(invocation: Invocation) -> Box<dyn Command> {
    Box::new(WriteConfig(invocation))
}

pub fn current<B: Backend>(invocation: Invocation) -> Box<dyn Command> {
    Box::new(Current::<B>(invocation, PhantomData))
}

struct Share(Invocation);

impl Command for Share {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let scheme = self.0.config.scheme().to_string();
        match self.0.current_path()? {
            Some(path) => ctx.print_ari(&scheme, &path, None),
            None => {
                ctx.warn(format!("No {scheme} path to share"));
                Ok(())
            }
        }
    }
}

struct Clear(Invocation);

impl Command for Clear {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let config = &self.0.config;
        let all = self.0.flags.is_set("all");
        let global = all || self.0.flags.is_set("global");
        let local = all || !global;

        if local && config.forget_path()? {
            ctx.warn(format!("Forgot the remembered {} path", config.scheme()));
        }
        if global {
            let question = format!(
                "Remove every {} setting from {}?",
                config.scheme(),
                ctx.session().settings().describe(Tier::User)
            );
            let confirmed = ctx.prompt().boolean(&question)?;
            if !confirmed {
                ctx.warn("Kept the user wide settings");
                return Ok(());
            }
            let removed = config.clear(Tier::User)?;
            ctx.warn(format!(
                "Removed {removed} {} setting(s) from {}",
                config.scheme(),
                ctx.session().settings().describe(Tier::User)
            ));
        }
        Ok(())
    }
}

struct WriteConfig(Invocation);

impl Command for WriteConfig {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        let config = &self.0.config;
        let file = || ctx.session().settings().describe(Tier::Directory);

        if self.0.flags.is_set("clean") {
            let removed = config.clear(Tier::Directory)?;
            if removed > 0 {
                ctx.warn(format!("Removed the {} section from {}", config.scheme(), file()));
            } else {
                ctx.warn(format!("No {} section in {}", config.scheme(), file()));
            }
            return Ok(());
        }

        let path = self.0.require_path()?;
        config.set(Tier::Directory, PATH_KEY, &path)?;
        ctx.warn(format!("Wrote {}:{path} to {}", config.scheme(), file()));
        Ok(())
    }
}

struct Current<B>(Invocation, PhantomData<B>);

impl<B: Backend> Command for Current<B> {
    fn perform(&mut self, ctx: &mut Context<'_>) -> Result<(), Signal> {
        show_current::<B>(&self.0, ctx).map(|_| ())
    }
}

/// Remember an explicit path (when possible) and print the current path with its description.
/// Returns the path that was printed.
pub fn show_current<B: Backend>(
    invocation: &Invocation,
    ctx: &mut Context<'_>,
) -> Result<Option<String>, Signal> {
    let path = match invocation.path() {
        Some(path) => {
            B::validate(path)?;
            invocation.config.remember_path(path)?;
            path.to_string()
        }
        None => match invocation.config.path()? {
            Some(path) => path,
            None => {
                ctx.warn(format!(
                    "No {0} path remembered, use `abt current {0}:<path>` or `abt pick {0}`",
                    B::SCHEME
                ));
                return Ok(None);
            }
        },
    };
    let description = B::describe(invocation, &path)?;
    ctx.print_ari(B::SCHEME, &path, description.as_deref())?;
    Ok(Some(path))
}


#[cfg(test)]
mod tests {
    use super::testing::run;
    use crate::config::testing::settings;
    use crate::config::{DirectoryConfig, MemoryStore, Tier};
    use crate::session::testing::{memory_session, session_with};

    #[test]
    fn share_prints_explicit_or_remembered_path() {
        let s = settings(
            MemoryStore::new("repo").with("abt.harvest.path", "27/981"),
            MemoryStore::new("user"),
            DirectoryConfig::default(),
        );
        let (session, _) = session_with(s, "");

        let (result, out) = run(&session, "share", &["harvest"]);
        assert!(result.is_ok());
        assert_eq!(out, "harvest:27/981\n");

        let (_, out) = run(&session, "share", &["asana:1/2"]);
        assert_eq!(out, "asana:1/2\n");
    }

    #[test]
    fn share_without_path_only_warns() {
        let (session, err) = memory_session("");
        let (result, out) = run(&session, "share", &["asana"]);
        assert!(result.is_ok());
        assert!(out.is_empty());
        assert!(err.contents().contains("No asana path to share"));
    }

    #[test]
    fn clear_scopes() {
        let s = settings(
            MemoryStore::new("repo").with("abt.asana.path", "1/2"),
            MemoryStore::new("user").with("abt.asana.accessToken", "secret"),
            DirectoryConfig::default(),
        );
        let (session, _) = session_with(s, "n\ny\n");
        let settings = session.settings();

        run(&session, "clear", &["asana", "--global"]).0.unwrap();
        assert!(settings.get(Tier::User, "asana", "accessToken").unwrap().is_some());

        run(&session, "clear", &["asana", "--global"]).0.unwrap();
        assert_eq!(settings.get(Tier::User, "asana", "accessToken").unwrap(), None);
        assert!(settings.get(Tier::Repo, "asana", "path").unwrap().is_some());

        run(&session, "clear", &["asana"]).0.unwrap();
        assert_eq!(settings.get(Tier::Repo, "asana", "path").unwrap(), None);
    }

    #[test]
    fn write_config_and_clean() {
        let dir = tempfile::tempdir().unwrap();
        let s = crate::config::Settings::new(
            Box::new(MemoryStore::new("repo").with("abt.devops.path", "acme/web")),
            Box::new(MemoryStore::new("user")),
            DirectoryConfig::default(),
            dir.path(),
        );
        let (session, err) = session_with(s, "");

        run(&session, "write-config", &["devops"]).0.unwrap();
        let written = DirectoryConfig::discover(dir.path()).unwrap();
        assert_eq!(written.get("devops", "path"), Some("acme/web"));
        assert!(err.contents().contains("Wrote devops:acme/web"));

        run(&session, "write-config", &["devops", "-c"]).0.unwrap();
        let cleaned = DirectoryConfig::discover(dir.path()).unwrap();
        assert_eq!(cleaned.get("devops", "path"), None);
    }

    #[test]
    fn write_config_without_path_aborts() {
        let (session, _) = memory_session("");
        let (result, _) = run(&session, "write-config", &["harvest"]);
        assert!(result.unwrap_err().message().contains("No harvest path"));
    }

    #[test]
    fn current_rejects_malformed_paths_before_remembering() {
        let (session, _) = memory_session("");
        let (result, _) = run(&session, "current", &["devops:only-org"]);
        assert!(result.unwrap_err().is_abort());
        assert_eq!(session.settings().get(Tier::Repo, "devops", "path").unwrap(), None);
    }
}
