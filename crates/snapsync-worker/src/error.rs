//! Error types for workers and their configuration.

use snapsync_core::{ErrorBody, Explain, KnownError};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for worker lifecycle operations.
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Outcome of a work function other than success.
#[derive(Debug, Error)]
pub enum WorkError {
    /// Ends the worker loop. Never recorded as a failure.
    #[error("worker stop requested")]
    Stop,

    /// Anything else; recorded as the worker's last error.
    #[error(transparent)]
    Failed(#[from] Failure),
}

impl From<KnownError> for WorkError {
    fn from(err: KnownError) -> Self {
        Self::Failed(Failure::Known(err))
    }
}

impl From<anyhow::Error> for WorkError {
    fn from(err: anyhow::Error) -> Self {
        Self::Failed(Failure::Other(err))
    }
}

/// A failure captured from a work function.
#[derive(Debug, Error)]
pub enum Failure {
    /// A failure with a stable code.
    #[error(transparent)]
    Known(#[from] KnownError),

    /// A failure nothing classified.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Failure {
    /// The classified error, if there is one.
    #[must_use]
    pub const fn known(&self) -> Option<&KnownError> {
        match self {
            Self::Known(err) => Some(err),
            Self::Other(_) => None,
        }
    }

    /// Body shown to users. Unclassified failures get the generic body.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        match self {
            Self::Known(err) => err.to_body(),
            Self::Other(_) => ErrorBody::generic(),
        }
    }
}

/// Errors from driving a worker's lifecycle.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// `start` was called on a worker that already started.
    #[error("worker '{0}' was already started")]
    AlreadyStarted(String),

    /// `join` was called before `start`.
    #[error("worker '{0}' was never started")]
    NotStarted(String),

    /// The worker task panicked.
    #[error("worker '{name}' panicked: {message}")]
    Panicked { name: String, message: String },

    /// The worker task was cancelled before its loop finished, e.g. by
    /// runtime shutdown.
    #[error("worker '{0}' was cancelled")]
    Cancelled(String),
}

/// Errors loading `snapsync.yml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("config file not found at '{0}'")]
    NotFound(PathBuf),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A value failed validation.
    #[error(transparent)]
    Invalid(#[from] KnownError),
}

impl ConfigError {
    /// Body describing the failure; parse and IO failures get the generic body.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        match self {
            Self::Invalid(err) => err.to_body(),
            _ => ErrorBody::generic(),
        }
    }
}
