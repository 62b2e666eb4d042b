//! Fire-and-forget task decorator.

use super::{ContextPreservedCallable, Job};
use crate::context::ContextCoordinator;
use std::fmt;

/// Wraps a fire-and-forget action so it runs under a fixed snapshot.
pub struct ContextPreservedRunnable<C: ContextCoordinator, F> {
    inner: ContextPreservedCallable<C, F>,
}

impl<C: ContextCoordinator, F> ContextPreservedRunnable<C, F> {
    /// Wraps `action` with the context of the calling thread, read once now.
    #[must_use]
    pub fn wrap(action: F, coordinator: C) -> Self {
        Self {
            inner: ContextPreservedCallable::wrap(action, coordinator),
        }
    }

    /// Wraps `action` with an explicit snapshot. The coordinator is not read.
    #[must_use]
    pub fn wrap_with(action: F, coordinator: C, context: Option<C::Snapshot>) -> Self {
        Self {
            inner: ContextPreservedCallable::wrap_with(action, coordinator, context),
        }
    }

    /// Returns the snapshot this action will run under.
    #[must_use]
    pub fn context(&self) -> Option<&C::Snapshot> {
        self.inner.context()
    }

    /// Runs the action under its snapshot on the current thread.
    pub fn run(self)
    where
        F: FnOnce(),
    {
        self.inner.call();
    }
}

impl<C, F> ContextPreservedRunnable<C, F>
where
    C: ContextCoordinator + 'static,
    F: FnOnce() + Send + 'static,
{
    /// Boxes the decorated action for submission to an executor.
    #[must_use]
    pub fn into_job(self) -> Job {
        Box::new(move || self.run())
    }
}

impl<C: ContextCoordinator, F> fmt::Debug for ContextPreservedRunnable<C, F>
where
    C::Snapshot: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextPreservedRunnable")
            .field("context", &self.inner.context())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{context_map, mdc, MdcCoordinator};
    use crate::testing::ContextProbe;
    use pretty_assertions::assert_eq;
    use std::thread;

    #[test]
    fn test_runnable_captures_calling_thread() {
        let probe = ContextProbe::new();
        mdc::set_context_map(Some(context_map([("k", "v1")])));

        let action = ContextPreservedRunnable::wrap(probe.recorder(), MdcCoordinator);
        mdc::clear();
        thread::spawn(move || action.run()).join().unwrap();

        assert_eq!(probe.observed(), vec![Some(context_map([("k", "v1")]))]);
    }

    #[test]
    fn test_runnable_with_given_context() {
        let probe = ContextProbe::new();
        mdc::set_context_map(Some(context_map([("k", "v1")])));

        let action = ContextPreservedRunnable::wrap_with(
            probe.recorder(),
            MdcCoordinator,
            Some(context_map([("k", "given")])),
        );
        action.run();

        assert_eq!(probe.last(), Some(context_map([("k", "given")])));
        assert_eq!(mdc::get("k").as_deref(), Some("v1"));
        mdc::clear();
    }

    #[test]
    fn test_into_job_runs_on_other_thread() {
        let probe = ContextProbe::new();
        let job = ContextPreservedRunnable::wrap_with(
            probe.recorder(),
            MdcCoordinator,
            Some(context_map([("k", "job")])),
        )
        .into_job();

        let after = thread::spawn(move || {
            job();
            mdc::copy_of_context_map()
        })
        .join()
        .unwrap();

        assert_eq!(probe.last(), Some(context_map([("k", "job")])));
        assert_eq!(after, None);
    }
}
