/*!
store.rs - key/value backends for the repository and user tiers.

  - KeyValueStore: capability surface consumed by the configuration layer
  - GitConfigStore: `git config --local` / `git config --global`
  - MemoryStore: in-process store for tests

A store reports whether it is usable from the current working directory. Writing to an
unavailable store is an error, never a silent no-op.
*/

use anyhow::{Context, Result, bail};
use std::cell::OnceCell;
use std::process::Command;

#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::BTreeMap;

pub trait KeyValueStore {
    /// Whether the backing store can be read and written here.
    fn available(&self) -> bool;

    /// Short human readable name used in messages.
    fn describe(&self) -> &str;

    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn unset(&self, key: &str) -> Result<()>;

    /// All keys starting with `prefix.`.
    fn keys(&self, prefix: &str) -> Result<Vec<String>>;
}

/* ---- git config ---- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitScope {
    Local,
    Global,
}

impl GitScope {
    fn flag(self) -> &'static str {
        match self {
            GitScope::Local => "--local",
            GitScope::Global => "--global",
        }
    }
}

/// Store backed by `git config`. Local scope is only available inside a repository.
pub struct GitConfigStore {
    scope: GitScope,
    label: String,
    available: OnceCell<bool>,
}

impl GitConfigStore {
    pub fn new(scope: GitScope) -> Self {
        Self {
            scope,
            label: format!("git config {}", scope.flag()),
            available: OnceCell::new(),
        }
    }

    pub fn local() -> Self {
        Self::new(GitScope::Local)
    }

    pub fn global() -> Self {
        Self::new(GitScope::Global)
    }

    fn git(&self, args: &[&str]) -> Result<std::process::Output> {
        tracing::trace!(scope = self.scope.flag(), ?args, "git config");
        Command::new("git")
            .arg("config")
            .arg(self.scope.flag())
            .args(args)
            .output()
            .context("Failed to run git (is it installed?)")
    }

    fn probe(&self) -> bool {
        let status = match self.scope {
            // --list fails outside a repository.
            GitScope::Local => Command::new("git")
                .args(["config", "--local", "--list"])
                .output(),
            GitScope::Global => Command::new("git").arg("--version").output(),
        };
        matches!(status, Ok(out) if out.status.success())
    }
}

impl KeyValueStore for GitConfigStore {
    fn available(&self) -> bool {
        *self.available.get_or_init(|| self.probe())
    }

    fn describe(&self) -> &str {
        &self.label
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let out = self.git(&["--get", key])?;
        match out.status.code() {
            Some(0) => {
                let value = String::from_utf8_lossy(&out.stdout).trim().to_string();
                Ok(Some(value).filter(|v| !v.is_empty()))
            }
            // exit code 1: key not set
            Some(1) => Ok(None),
            _ => bail!(
                "{} --get {key} failed: {}",
                self.label,
                String::from_utf8_lossy(&out.stderr).trim()
            ),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if !self.available() {
            bail!("{} is not available here", self.label);
        }
        let out = self.git(&[key, value])?;
        if !out.status.success() {
            bail!(
                "{} {key} failed: {}",
                self.label,
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        Ok(())
    }

    fn unset(&self, key: &str) -> Result<()> {
        if !self.available() {
            bail!("{} is not available here", self.label);
        }
        let out = self.git(&["--unset", key])?;
        match out.status.code() {
            // exit code 5: key was not set
            Some(0) | Some(5) => Ok(()),
            _ => bail!(
                "{} --unset {key} failed: {}",
                self.label,
                String::from_utf8_lossy(&out.stderr).trim()
            ),
        }
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let pattern = format!("^{}\\.", prefix.replace('.', "\\."));
        let out = self.git(&["--name-only", "--get-regexp", &pattern])?;
        match out.status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&out.stdout)
                .lines()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect()),
            Some(1) => Ok(Vec::new()),
            _ => bail!(
                "{} --get-regexp {pattern} failed: {}",
                self.label,
                String::from_utf8_lossy(&out.stderr).trim()
            ),
        }
    }
}

/* ---- in-memory ---- */

/// In-process store.
#[cfg(test)]
pub struct MemoryStore {
    label: String,
    available: bool,
    values: RefCell<BTreeMap<String, String>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            available: true,
            values: RefCell::new(BTreeMap::new()),
        }
    }

    /// A store that refuses every write, like `git config --local` outside a repository.
    pub fn unavailable(label: impl Into<String>) -> Self {
        Self {
            available: false,
            ..Self::new(label)
        }
    }

    pub fn with(self, key: &str, value: &str) -> Self {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn available(&self) -> bool {
        self.available
    }

    fn describe(&self) -> &str {
        &self.label
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        if !self.available {
            return Ok(None);
        }
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if !self.available {
            bail!("{} is not available here", self.label);
        }
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn unset(&self, key: &str) -> Result<()> {
        if !self.available {
            bail!("{} is not available here", self.label);
        }
        self.values.borrow_mut().remove(key);
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let dotted = format!("{prefix}.");
        Ok(self
            .values
            .borrow()
            .keys()
            .filter(|k| k.starts_with(&dotted))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new("memory");
        assert_eq!(store.get("abt.asana.path").unwrap(), None);
        store.set("abt.asana.path", "1/2").unwrap();
        assert_eq!(store.get("abt.asana.path").unwrap().as_deref(), Some("1/2"));
        store.unset("abt.asana.path").unwrap();
        store.unset("abt.asana.path").unwrap();
        assert_eq!(store.get("abt.asana.path").unwrap(), None);
    }

    #[test]
    fn memory_store_keys_by_prefix() {
        let store = MemoryStore::new("memory")
            .with("abt.asana.path", "1")
            .with("abt.asana.accessToken", "t")
            .with("abt.asanax.path", "2")
            .with("abt.harvest.path", "3");
        let mut keys = store.keys("abt.asana").unwrap();
        keys.sort();
        assert_eq!(keys, vec!["abt.asana.accessToken", "abt.asana.path"]);
    }

    #[test]
    fn unavailable_store_refuses_writes() {
        let store = MemoryStore::unavailable("git config --local");
        assert!(!store.available());
        let err = store.set("abt.asana.path", "1").unwrap_err();
        assert!(err.to_string().contains("not available"));
        assert_eq!(store.get("abt.asana.path").unwrap(), None);
    }

    #[test]
    fn git_scope_flags() {
        assert_eq!(GitScope::Local.flag(), "--local");
        assert_eq!(GitConfigStore::global().describe(), "git config --global");
    }
}
