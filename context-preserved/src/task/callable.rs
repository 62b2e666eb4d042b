//! Result-producing task decorator.

use crate::context::{run_in_context, ContextCoordinator};
use std::fmt;

/// Wraps a result-producing task so it runs under a fixed snapshot.
///
/// The task may return anything, including `Result<T, E>`; whatever it
/// returns is handed back unchanged, and a panic resumes with its original
/// payload once the executing thread's prior context has been restored.
///
/// ```rust
/// use context_preserved::context::{mdc, MdcCoordinator};
/// use context_preserved::task::ContextPreservedCallable;
///
/// mdc::put("request_id", "r-42").unwrap();
/// let task = ContextPreservedCallable::wrap(|| mdc::get("request_id"), MdcCoordinator);
/// mdc::clear();
///
/// let seen = std::thread::spawn(move || task.call()).join().unwrap();
/// assert_eq!(seen.as_deref(), Some("r-42"));
/// ```
pub struct ContextPreservedCallable<C: ContextCoordinator, F> {
    task: F,
    coordinator: C,
    context: Option<C::Snapshot>,
}

impl<C: ContextCoordinator, F> ContextPreservedCallable<C, F> {
    /// Wraps `task` with the context of the calling thread, read once now.
    #[must_use]
    pub fn wrap(task: F, coordinator: C) -> Self {
        let context = coordinator.read();
        Self::wrap_with(task, coordinator, context)
    }

    /// Wraps `task` with an explicit snapshot. The coordinator is not read.
    #[must_use]
    pub fn wrap_with(task: F, coordinator: C, context: Option<C::Snapshot>) -> Self {
        Self {
            task,
            coordinator,
            context,
        }
    }

    /// Returns the snapshot this task will run under.
    #[must_use]
    pub fn context(&self) -> Option<&C::Snapshot> {
        self.context.as_ref()
    }

    /// Runs the task under its snapshot on the current thread.
    pub fn call<R>(self) -> R
    where
        F: FnOnce() -> R,
    {
        let Self {
            task,
            coordinator,
            context,
        } = self;
        run_in_context(&coordinator, context, task)
    }

    /// Converts the decorator into a plain closure.
    pub fn into_fn<R>(self) -> impl FnOnce() -> R
    where
        F: FnOnce() -> R,
    {
        move || self.call()
    }
}

impl<C: ContextCoordinator, F> fmt::Debug for ContextPreservedCallable<C, F>
where
    C::Snapshot: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextPreservedCallable")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
