//! Configuration for the tokio-backed execution engine.

use crate::errors::{ContextPreservedError, InvalidArgumentError};
use crate::utils::validation::require_positive;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_worker_threads() -> usize {
    1
}

fn default_max_blocking_threads() -> usize {
    16
}

fn default_thread_name() -> String {
    "context-preserved-worker".to_string()
}

fn default_keep_alive_ms() -> u64 {
    10_000
}

/// Sizing and naming of the threads behind a
/// [`TokioExecutorService`](super::TokioExecutorService).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Async worker threads of the runtime. Jobs do not run on these.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Upper bound on the blocking threads jobs run on.
    #[serde(default = "default_max_blocking_threads")]
    pub max_blocking_threads: usize,
    /// Name given to every thread the runtime spawns.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
    /// How long an idle blocking thread is kept before it exits.
    #[serde(default = "default_keep_alive_ms")]
    pub keep_alive_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            max_blocking_threads: default_max_blocking_threads(),
            thread_name: default_thread_name(),
            keep_alive_ms: default_keep_alive_ms(),
        }
    }
}

impl ExecutorConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ContextPreservedError::Serialization` for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, ContextPreservedError> {
        serde_json::from_str(json).map_err(|e| ContextPreservedError::Serialization(e.to_string()))
    }

    /// Sets the number of async worker threads.
    #[must_use]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Sets the upper bound on blocking threads.
    #[must_use]
    pub fn with_max_blocking_threads(mut self, threads: usize) -> Self {
        self.max_blocking_threads = threads;
        self
    }

    /// Sets the thread name.
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Sets the idle keep-alive.
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive_ms = u64::try_from(keep_alive.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns the idle keep-alive as a duration.
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }

    /// Checks that both thread counts are positive.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgumentError` naming the offending field.
    pub fn validate(&self) -> Result<(), InvalidArgumentError> {
        require_positive("worker_threads", self.worker_threads)?;
        require_positive("max_blocking_threads", self.max_blocking_threads)
    }
}
