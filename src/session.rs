//! Per-process state shared by every (nested) dispatch: configuration tiers and the prompt.

use std::cell::{RefCell, RefMut};

use crate::config::Settings;
use crate::prompt::Prompt;

pub struct Session {
    settings: Settings,
    prompt: RefCell<Prompt>,
}

impl Session {
    pub fn new(settings: Settings, prompt: Prompt) -> Self {
        Self {
            settings,
            prompt: RefCell::new(prompt),
        }
    }

    pub fn from_environment() -> anyhow::Result<Self> {
        Ok(Self::new(Settings::from_environment()?, Prompt::terminal()))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Exclusive access to the prompt. Do not hold it across a nested dispatch.
    pub fn prompt(&self) -> RefMut<'_, Prompt> {
        self.prompt.borrow_mut()
    }

    /// Narration line on stderr (through the prompt output).
    pub fn warn(&self, msg: impl AsRef<str>) {
        self.prompt().say(msg);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::config::testing::memory_settings;
    use crate::utils::SharedBuffer;
    use std::rc::Rc;

    /// Session on in-memory tiers with scripted prompt answers; returns the stderr capture.
    pub fn session_with(settings: Settings, answers: &str) -> (Rc<Session>, SharedBuffer) {
        let err = SharedBuffer::default();
        let prompt = Prompt::scripted(answers, Box::new(err.clone()));
        (Rc::new(Session::new(settings, prompt)), err)
    }

    pub fn memory_session(answers: &str) -> (Rc<Session>, SharedBuffer) {
        session_with(memory_settings(), answers)
    }
}
