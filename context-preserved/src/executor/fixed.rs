//! Task sink bound to one context for its whole lifetime.

use super::Executor;
use crate::context::ContextCoordinator;
use crate::errors::ExecutorError;
use crate::task::{ContextPreservedRunnable, Job};
use std::fmt;

/// Wraps an [`Executor`] so every job runs under one snapshot, chosen when
/// the decorator is built.
pub struct FixedContextExecutor<X, C: ContextCoordinator> {
    inner: X,
    coordinator: C,
    context: Option<C::Snapshot>,
}

impl<X: Executor, C: ContextCoordinator + Clone + 'static> FixedContextExecutor<X, C> {
    /// Decorates `executor` with the calling thread's context, read once now.
    #[must_use]
    pub fn wrap(executor: X, coordinator: C) -> Self {
        let context = coordinator.read();
        Self::wrap_with(executor, coordinator, context)
    }

    /// Decorates `executor` with an explicit snapshot. The coordinator is
    /// never read.
    #[must_use]
    pub fn wrap_with(executor: X, coordinator: C, context: Option<C::Snapshot>) -> Self {
        Self {
            inner: executor,
            coordinator,
            context,
        }
    }

    /// Returns the snapshot every job runs under.
    #[must_use]
    pub fn context(&self) -> Option<&C::Snapshot> {
        self.context.as_ref()
    }

    /// Returns the decorated executor.
    #[must_use]
    pub fn inner(&self) -> &X {
        &self.inner
    }
}

impl<X: Executor, C: ContextCoordinator + Clone + 'static> Executor for FixedContextExecutor<X, C> {
    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        self.inner.execute(
            ContextPreservedRunnable::wrap_with(job, self.coordinator.clone(), self.context.clone())
                .into_job(),
        )
    }
}

impl<X: fmt::Debug, C: ContextCoordinator> fmt::Debug for FixedContextExecutor<X, C>
where
    C::Snapshot: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedContextExecutor")
            .field("inner", &self.inner)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{context_map, mdc, MdcCoordinator};
    use crate::testing::{ContextProbe, DeferredExecutor, RecordingCoordinator};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wrap_captures_once_at_construction() {
        let probe = ContextProbe::new();
        mdc::set_context_map(Some(context_map([("k", "v1")])));
        let executor = FixedContextExecutor::wrap(DeferredExecutor::new(), MdcCoordinator);

        executor.execute(Box::new(probe.recorder())).unwrap();
        mdc::set_context_map(Some(context_map([("k", "v2")])));
        executor.execute(Box::new(probe.recorder())).unwrap();
        mdc::clear();

        executor.inner().run_pending_on_new_thread();
        assert_eq!(
            probe.observed(),
            vec![
                Some(context_map([("k", "v1")])),
                Some(context_map([("k", "v1")])),
            ]
        );
    }

    #[test]
    fn test_wrap_with_uses_given_context() {
        let probe = ContextProbe::new();
        mdc::set_context_map(Some(context_map([("k", "v1")])));
        let executor = FixedContextExecutor::wrap_with(
            DeferredExecutor::new(),
            MdcCoordinator,
            Some(context_map([("k", "given")])),
        );

        executor.execute(Box::new(probe.recorder())).unwrap();
        mdc::set_context_map(Some(context_map([("k", "v2")])));
        executor.execute(Box::new(probe.recorder())).unwrap();
        mdc::clear();

        executor.inner().run_pending_on_new_thread();
        assert_eq!(
            probe.observed(),
            vec![
                Some(context_map([("k", "given")])),
                Some(context_map([("k", "given")])),
            ]
        );
    }

    #[test]
    fn test_submissions_never_read() {
        let coordinator = RecordingCoordinator::new();
        let executor = FixedContextExecutor::wrap(DeferredExecutor::new(), coordinator.clone());
        assert_eq!(coordinator.reads(), 1);

        executor.execute(Box::new(|| {})).unwrap();
        executor.execute(Box::new(|| {})).unwrap();

        assert_eq!(coordinator.reads(), 1);
    }

    #[test]
    fn test_wrap_with_absent_context() {
        let executor = FixedContextExecutor::wrap_with(DeferredExecutor::new(), MdcCoordinator, None);
        assert!(executor.context().is_none());
    }
}
