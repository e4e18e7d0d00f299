//! Error taxonomy for the drafting loop.
//!
//! Every failure the loop can hit is represented here. Callers can ask
//! `category()` / `ends_run()` instead of matching on message text.
//!
//! ## Categories
//!
//! | Category      | Ends run | Handling                                        |
//! |---------------|----------|-------------------------------------------------|
//! | Generation    | yes      | propagated; no partial-draft recovery           |
//! | Input         | yes      | only when the input channel itself is unusable  |
//! | Persistence   | no       | reported to the user; loop still terminates     |
//! | Configuration | yes      | rejected before the loop starts                 |
//! | Internal      | yes      | illegal transition, should never happen         |
//!
//! Nothing is retried automatically.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::state_machine::IllegalTransition;

/// Failure reported by a text-generation collaborator.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The request reached the backend (or tried to) and failed.
    #[error("completion request failed: {0}")]
    Request(String),

    /// No completion arrived within the configured request timeout.
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered with nothing usable.
    #[error("completion was empty")]
    EmptyCompletion,

    /// The client could not be constructed from the configuration.
    #[error("failed to build completion client: {0}")]
    Client(String),
}

/// Coarse classification of a [`DraftLoopError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Generation,
    Input,
    Persistence,
    Configuration,
    Internal,
}

impl ErrorCategory {
    /// Whether an error of this category aborts the run before `Terminated`.
    pub fn ends_run(self) -> bool {
        !matches!(self, Self::Persistence)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generation => write!(f, "generation"),
            Self::Input => write!(f, "input"),
            Self::Persistence => write!(f, "persistence"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Unified error type for the drafting loop.
#[derive(Debug, Error)]
pub enum DraftLoopError {
    #[error("Generation failure: {0}")]
    Generation(#[from] GenerationError),

    /// The human input channel could not be read.
    #[error("Input failure: {0}")]
    Input(#[source] std::io::Error),

    /// Writing the final record failed.
    #[error("Persistence failure [{}]: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),
}

impl DraftLoopError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Generation(_) => ErrorCategory::Generation,
            Self::Input(_) => ErrorCategory::Input,
            Self::Persistence { .. } => ErrorCategory::Persistence,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::IllegalTransition(_) => ErrorCategory::Internal,
        }
    }

    /// Returns `true` if this error stops the loop before it can terminate normally.
    pub fn ends_run(&self) -> bool {
        self.category().ends_run()
    }

    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }
}
