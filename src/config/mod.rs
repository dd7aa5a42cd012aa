/*!
Tiered configuration.

Tiers (lookup order for credentials and other settings):
  Repo       git config --local   remembered paths, per checkout
  User       git config --global  credentials, per user
  Directory  nearest .abt.yml      shareable, non-interactive fallback

Keys are namespaced per provider: `abt.<scheme>.<key>` in git config, `<scheme>: { <key>: .. }`
in the directory file. Commands never touch `Settings` directly; they get a
[`ProviderConfig`] bound to their own scheme.
*/

pub mod directory;
pub mod provider;
pub mod store;

use anyhow::{Context, Result, bail};
use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};

pub use directory::DirectoryConfig;
pub use provider::{PATH_KEY, ProviderConfig};
pub use store::{GitConfigStore, KeyValueStore};
#[cfg(test)]
pub use store::MemoryStore;

/// Root of every provider namespace.
pub const NAMESPACE_ROOT: &str = "abt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Directory,
    Repo,
    User,
}

impl Tier {
    /// Order used when a value may come from any tier.
    pub const LOOKUP_ORDER: [Tier; 3] = [Tier::Repo, Tier::User, Tier::Directory];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::Directory => "directory",
            Tier::Repo => "repository",
            Tier::User => "user",
        })
    }
}

pub fn namespace(scheme: &str) -> String {
    format!("{NAMESPACE_ROOT}.{scheme}")
}

/// All configuration tiers of one process.
pub struct Settings {
    repo: Box<dyn KeyValueStore>,
    user: Box<dyn KeyValueStore>,
    directory: RefCell<DirectoryConfig>,
    workdir: PathBuf,
}

impl Settings {
    pub fn new(
        repo: Box<dyn KeyValueStore>,
        user: Box<dyn KeyValueStore>,
        directory: DirectoryConfig,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repo,
            user,
            directory: RefCell::new(directory),
            workdir: workdir.into(),
        }
    }

    /// git config backed tiers plus the `.abt.yml` nearest to the working directory.
    pub fn from_environment() -> Result<Self> {
        let workdir = std::env::current_dir().context("Unable to determine working directory")?;
        let directory = DirectoryConfig::discover(&workdir)?;
        Ok(Self::new(
            Box::new(GitConfigStore::local()),
            Box::new(GitConfigStore::global()),
            directory,
            workdir,
        ))
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// The directory tier is always available; it is created on first write.
    pub fn available(&self, tier: Tier) -> bool {
        match tier {
            Tier::Directory => true,
            Tier::Repo => self.repo.available(),
            Tier::User => self.user.available(),
        }
    }

    pub fn describe(&self, tier: Tier) -> String {
        match tier {
            Tier::Directory => match self.directory.borrow().path() {
                Some(p) => p.display().to_string(),
                None => directory::FILE_NAME.to_string(),
            },
            Tier::Repo => self.repo.describe().to_string(),
            Tier::User => self.user.describe().to_string(),
        }
    }

    pub fn get(&self, tier: Tier, scheme: &str, key: &str) -> Result<Option<String>> {
        match tier {
            Tier::Directory => Ok(self
                .directory
                .borrow()
                .get(scheme, key)
                .map(str::to_string)),
            Tier::Repo => self.repo.get(&full_key(scheme, key)),
            Tier::User => self.user.get(&full_key(scheme, key)),
        }
    }

    pub fn set(&self, tier: Tier, scheme: &str, key: &str, value: &str) -> Result<()> {
        tracing::debug!(%tier, scheme, key, "writing configuration value");
        match tier {
            Tier::Directory => {
                let mut dir = self.directory.borrow_mut();
                dir.set(scheme, key, value);
                dir.save(&self.workdir)?;
                Ok(())
            }
            Tier::Repo | Tier::User => {
                let store = self.store(tier)?;
                store.set(&full_key(scheme, key), value)
            }
        }
    }

    pub fn unset(&self, tier: Tier, scheme: &str, key: &str) -> Result<()> {
        match tier {
            Tier::Directory => {
                let mut dir = self.directory.borrow_mut();
                if dir.get(scheme, key).is_some() {
                    dir.unset(scheme, key);
                    dir.save(&self.workdir)?;
                }
                Ok(())
            }
            Tier::Repo | Tier::User => self.store(tier)?.unset(&full_key(scheme, key)),
        }
    }

    /// Remove every value of `scheme` in `tier`. Returns how many keys were removed.
    pub fn clear(&self, tier: Tier, scheme: &str) -> Result<usize> {
        match tier {
            Tier::Directory => {
                let mut dir = self.directory.borrow_mut();
                if dir.remove_section(scheme) {
                    dir.save(&self.workdir)?;
                    Ok(1)
                } else {
                    Ok(0)
                }
            }
            Tier::Repo | Tier::User => {
                let store = self.store(tier)?;
                let keys = store.keys(&namespace(scheme))?;
                for key in &keys {
                    store.unset(key)?;
                }
                Ok(keys.len())
            }
        }
    }

    fn store(&self, tier: Tier) -> Result<&dyn KeyValueStore> {
        let store = match tier {
            Tier::Repo => self.repo.as_ref(),
            Tier::User => self.user.as_ref(),
            Tier::Directory => bail!("the directory tier is not a key/value store"),
        };
        if !store.available() {
            bail!(
                "{} is not available here (the {tier} tier needs a git repository / git installation)",
                store.describe()
            );
        }
        Ok(store)
    }
}

fn full_key(scheme: &str, key: &str) -> String {
    format!("{}.{key}", namespace(scheme))
}
