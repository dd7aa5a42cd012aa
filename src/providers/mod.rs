/*!
Built-in providers and global commands.

  global.rs    help, version, commands, examples, share
  shared.rs    share / clear / write-config / current, reused by every path based provider
  http.rs      blocking JSON client used by the API backed providers
  asana/       asana:<project_gid>[/<task_gid>]
  harvest/     harvest:<project_id>[/<task_id>]
  devops/      devops:<organization>/<project>[/<work_item_id>]
  git.rs       git[:<branch>]

The command set is closed: everything is registered in [`REGISTRY`].
*/

pub mod asana;
pub mod devops;
pub mod git;
pub mod global;
pub mod harvest;
pub mod http;
pub mod shared;

use crate::dispatch::{Invocation, Provider, Registry};
use crate::signal::Signal;

pub static REGISTRY: Registry = Registry {
    providers: &[
        Provider {
            scheme: asana::SCHEME,
            description: "Asana projects and tasks",
            commands: asana::COMMANDS,
        },
        Provider {
            scheme: harvest::SCHEME,
            description: "Harvest time tracking",
            commands: harvest::COMMANDS,
        },
        Provider {
            scheme: devops::SCHEME,
            description: "Azure DevOps work items",
            commands: devops::COMMANDS,
        },
        Provider {
            scheme: git::SCHEME,
            description: "Git branches of the current repository",
            commands: git::COMMANDS,
        },
    ],
    globals: global::COMMANDS,
};

/// Provider specific hooks used by the commands in [`shared`].
pub trait Backend: 'static {
    const SCHEME: &'static str;

    /// Check that `path` has the provider's layout.
    fn validate(path: &str) -> Result<(), Signal>;

    /// Human readable annotation for an output line of `path`.
    fn describe(invocation: &Invocation, path: &str) -> Result<Option<String>, Signal>;
}

/// Branch friendly form of a title: lowercase ASCII words joined by `-`.
pub fn slug(title: &str) -> String {
    const MAX_LEN: usize = 60;

    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    let mut slug = out.trim_end_matches('-').to_string();
    if slug.len() > MAX_LEN {
        let cut = slug[..MAX_LEN].rfind('-').unwrap_or(MAX_LEN);
        slug.truncate(cut);
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs() {
        assert_eq!(slug("Fix: login fails (SSO)!"), "fix-login-fails-sso");
        assert_eq!(slug("  Ünïcode   & spaces  "), "n-code-spaces");
        assert_eq!(slug("---"), "");
    }

    #[test]
    fn long_slugs_cut_on_word_boundary() {
        let title = "word ".repeat(30);
        let s = slug(&title);
        assert!(s.len() <= 60);
        assert!(s.ends_with("word"));
    }

    #[test]
    fn every_provider_can_share_and_clear() {
        for provider in REGISTRY.providers() {
            assert!(provider.command("share").is_some(), "{} lacks share", provider.scheme);
        }
        for scheme in [asana::SCHEME, harvest::SCHEME, devops::SCHEME] {
            assert!(REGISTRY.resolve(scheme, "clear").is_some());
            assert!(REGISTRY.resolve(scheme, "write-config").is_some());
            assert!(REGISTRY.resolve(scheme, "current").is_some());
        }
    }

    #[test]
    fn time_entry_data_sources_are_wired() {
        assert_eq!(
            REGISTRY.schemes_for("harvest-time-entry-data"),
            vec![asana::SCHEME, devops::SCHEME]
        );
        assert_eq!(REGISTRY.schemes_for("branch-name"), vec![asana::SCHEME, devops::SCHEME]);
    }
}
