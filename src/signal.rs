//! Dispatch outcomes.
//!
//! Commands return `Result<(), Signal>`. `Abort` ends the whole invocation with a non-zero
//! exit code, `Exit` stops the current command early and successfully.

use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Signal {
    /// User facing failure. Printed to stderr, process exits non-zero.
    #[error("{0}")]
    Abort(String),
    /// Intentional early stop. Printed to stdout, process exits zero.
    #[error("{0}")]
    Exit(String),
}

impl Signal {
    pub fn abort(msg: impl Into<String>) -> Self {
        Signal::Abort(msg.into())
    }

    pub fn exit(msg: impl Into<String>) -> Self {
        Signal::Exit(msg.into())
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, Signal::Abort(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Signal::Abort(m) | Signal::Exit(m) => m,
        }
    }
}

impl From<anyhow::Error> for Signal {
    fn from(err: anyhow::Error) -> Self {
        Signal::Abort(format!("{err:#}"))
    }
}

impl From<std::io::Error> for Signal {
    fn from(err: std::io::Error) -> Self {
        Signal::Abort(format!("I/O error: {err}"))
    }
}

/// Attach a user facing message to a collaborator error and turn it into an abort.
pub trait AbortContext<T> {
    fn abort_with(self, msg: impl Display) -> Result<T, Signal>;
}

impl<T, E: Display> AbortContext<T> for Result<T, E> {
    fn abort_with(self, msg: impl Display) -> Result<T, Signal> {
        self.map_err(|e| Signal::Abort(format!("{msg}: {e}")))
    }
}

impl<T> AbortContext<T> for Option<T> {
    fn abort_with(self, msg: impl Display) -> Result<T, Signal> {
        self.ok_or_else(|| Signal::Abort(msg.to_string()))
    }
}
