//! Configuration handle bound to one provider namespace.

use std::rc::Rc;

use super::Tier;
use crate::session::Session;
use crate::signal::Signal;

/// Key holding the remembered path of a provider.
pub const PATH_KEY: &str = "path";

#[derive(Clone)]
pub struct ProviderConfig {
    scheme: String,
    session: Rc<Session>,
}

impl ProviderConfig {
    pub fn new(scheme: impl Into<String>, session: Rc<Session>) -> Self {
        Self {
            scheme: scheme.into(),
            session,
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn namespace(&self) -> String {
        super::namespace(&self.scheme)
    }

    /// Whether the repository tier can be used (inside a git checkout).
    pub fn local_available(&self) -> bool {
        self.session.settings().available(Tier::Repo)
    }

    /// Read one key. The repository tier falls back to the directory file when it is unavailable.
    pub fn get(&self, tier: Tier, key: &str) -> Result<Option<String>, Signal> {
        let settings = self.session.settings();
        let tier = match tier {
            Tier::Repo if !settings.available(Tier::Repo) => Tier::Directory,
            other => other,
        };
        Ok(settings.get(tier, &self.scheme, key)?)
    }

    /// First value found in repository, user and directory tiers, in that order.
    pub fn lookup(&self, key: &str) -> Result<Option<String>, Signal> {
        let settings = self.session.settings();
        for tier in Tier::LOOKUP_ORDER {
            if !settings.available(tier) {
                continue;
            }
            if let Some(value) = settings.get(tier, &self.scheme, key)? {
                tracing::trace!(scheme = %self.scheme, key, %tier, "configuration hit");
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    pub fn set(&self, tier: Tier, key: &str, value: &str) -> Result<(), Signal> {
        Ok(self.session.settings().set(tier, &self.scheme, key, value)?)
    }

    pub fn unset(&self, tier: Tier, key: &str) -> Result<(), Signal> {
        Ok(self.session.settings().unset(tier, &self.scheme, key)?)
    }

    /// Remove every key of this provider from `tier`.
    pub fn clear(&self, tier: Tier) -> Result<usize, Signal> {
        Ok(self.session.settings().clear(tier, &self.scheme)?)
    }

    /// Return a stored value, or ask for it once and persist the answer in `tier`.
    pub fn prompt_and_persist(
        &self,
        tier: Tier,
        key: &str,
        question: &str,
        help_text: &str,
    ) -> Result<String, Signal> {
        if let Some(value) = self.lookup(key)? {
            return Ok(value);
        }
        if !self.session.settings().available(tier) {
            return Err(Signal::abort(format!(
                "Missing {}.{key} and the {tier} configuration ({}) is not available",
                self.namespace(),
                self.session.settings().describe(tier),
            )));
        }

        let answer = {
            let mut prompt = self.session.prompt();
            if !help_text.is_empty() {
                prompt.say(help_text);
            }
            prompt.text(question)?
        };
        if answer.trim().is_empty() {
            return Err(Signal::abort("Empty value, aborting"));
        }

        self.set(tier, key, answer.trim())?;
        tracing::debug!(scheme = %self.scheme, key, %tier, "persisted prompted value");
        Ok(answer.trim().to_string())
    }

    /// Remembered path: repository tier, or the directory file outside a repository.
    pub fn path(&self) -> Result<Option<String>, Signal> {
        self.get(Tier::Repo, PATH_KEY)
    }

    /// Remember `path` in the repository tier. Outside a repository this only warns.
    pub fn remember_path(&self, path: &str) -> Result<bool, Signal> {
        if !self.local_available() {
            self.session
                .warn("No local configuration to update - will not remember the path");
            return Ok(false);
        }
        self.set(Tier::Repo, PATH_KEY, path)?;
        Ok(true)
    }

    pub fn forget_path(&self) -> Result<bool, Signal> {
        if !self.local_available() {
            self.session
                .warn("No local configuration to clear - directory settings are untouched");
            return Ok(false);
        }
        self.unset(Tier::Repo, PATH_KEY)?;
        Ok(true)
    }
}
