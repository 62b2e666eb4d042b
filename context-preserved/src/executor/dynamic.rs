//! Task sink that captures the submitter's context per submission.

use super::Executor;
use crate::context::ContextCoordinator;
use crate::errors::ExecutorError;
use crate::task::{ContextPreservedRunnable, Job};
use std::fmt;

/// Wraps an [`Executor`] so every job runs under the context its submitter
/// had at the moment of `execute`.
pub struct DynamicContextExecutor<X, C> {
    inner: X,
    coordinator: C,
}

impl<X: Executor, C: ContextCoordinator + Clone + 'static> DynamicContextExecutor<X, C> {
    /// Decorates `executor`. Nothing is read until the first submission.
    #[must_use]
    pub fn wrap(executor: X, coordinator: C) -> Self {
        Self {
            inner: executor,
            coordinator,
        }
    }

    /// Returns the decorated executor.
    #[must_use]
    pub fn inner(&self) -> &X {
        &self.inner
    }
}

impl<X: Executor, C: ContextCoordinator + Clone + 'static> Executor for DynamicContextExecutor<X, C> {
    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        let context = self.coordinator.read();
        self.inner.execute(
            ContextPreservedRunnable::wrap_with(job, self.coordinator.clone(), context).into_job(),
        )
    }
}

impl<X: fmt::Debug, C> fmt::Debug for DynamicContextExecutor<X, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicContextExecutor")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}
