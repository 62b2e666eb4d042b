//! Error types for context-preserving decorators and execution engines.
//!
//! Decorators never translate the failures of the tasks they wrap; the types
//! here describe the failures that originate in argument checks, in the
//! execution engine, or in process setup (logging and runtime construction).

use std::time::Duration;
use thiserror::Error;

/// The main error type for setup-level operations.
#[derive(Debug, Error)]
pub enum ContextPreservedError {
    /// An argument failed a precondition.
    #[error("{0}")]
    InvalidArgument(#[from] InvalidArgumentError),

    /// An execution engine rejected or timed out an operation.
    #[error("{0}")]
    Executor(#[from] ExecutorError),

    /// Logging could not be initialized.
    #[error("{0}")]
    Logging(#[from] LoggingError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error raised when an argument violates a precondition the type system
/// cannot express.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid argument '{argument}': {message}")]
pub struct InvalidArgumentError {
    /// Name of the offending argument.
    pub argument: &'static str,
    /// What was wrong with it.
    pub message: String,
}

impl InvalidArgumentError {
    /// Creates a new invalid argument error.
    #[must_use]
    pub fn new(argument: &'static str, message: impl Into<String>) -> Self {
        Self {
            argument,
            message: message.into(),
        }
    }
}

/// Errors raised by an execution engine for a submission as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    /// The submission was malformed.
    #[error("{0}")]
    InvalidArgument(#[from] InvalidArgumentError),

    /// The engine refused the submission (for example after shutdown).
    #[error("Task rejected: {reason}")]
    Rejected {
        /// Why the task was rejected.
        reason: String,
    },

    /// A bounded wait elapsed before a result was available.
    #[error("Timed out after {timeout:?}")]
    Timeout {
        /// The bound that elapsed.
        timeout: Duration,
    },
}

impl ExecutorError {
    /// Creates a rejection error.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout { timeout }
    }
}

/// The failure of one submitted task, as seen through its handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError<E> {
    /// The task body returned an error value.
    #[error("Task failed: {0}")]
    Failed(E),

    /// The task body panicked; holds the panic message.
    #[error("Task panicked: {0}")]
    Panicked(String),

    /// The task was cancelled before it produced a result.
    #[error("Task cancelled")]
    Cancelled,
}

impl<E> TaskError<E> {
    /// Returns true if the task was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the error value produced by the task body, if any.
    #[must_use]
    pub fn into_failure(self) -> Option<E> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors raised by a first-success batch.
#[derive(Debug, Error)]
pub enum InvokeError<E> {
    /// The engine rejected the batch, timed out, or the batch was malformed.
    #[error("{0}")]
    Executor(#[from] ExecutorError),

    /// Every task failed; holds the last failure observed.
    #[error("No task completed successfully, last failure: {0}")]
    AllFailed(TaskError<E>),
}

/// Errors raised while installing the global tracing subscriber.
#[derive(Debug, Clone, Error)]
pub enum LoggingError {
    /// The configured filter directive could not be parsed.
    #[error("Invalid log filter '{filter}': {message}")]
    InvalidFilter {
        /// The rejected directive.
        filter: String,
        /// Parser message.
        message: String,
    },

    /// A global subscriber was already installed.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}
