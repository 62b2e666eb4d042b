//! Async task decorator.

use crate::context::{run_in_context, ContextCoordinator};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A [`Future`] that runs every poll of its inner future under a snapshot.
///
/// Multi-threaded runtimes may poll a task on a different worker each time it
/// wakes; installing the snapshot around each poll keeps the context visible
/// to the future's synchronous sections wherever they run. The worker's own
/// context is restored after every poll.
pub struct ContextPreservedFuture<C: ContextCoordinator, F> {
    inner: Pin<Box<F>>,
    coordinator: C,
    context: Option<C::Snapshot>,
}

impl<C: ContextCoordinator, F: Future> ContextPreservedFuture<C, F> {
    /// Wraps `future` with the context of the calling thread, read once now.
    #[must_use]
    pub fn wrap(future: F, coordinator: C) -> Self {
        let context = coordinator.read();
        Self::wrap_with(future, coordinator, context)
    }

    /// Wraps `future` with an explicit snapshot.
    #[must_use]
    pub fn wrap_with(future: F, coordinator: C, context: Option<C::Snapshot>) -> Self {
        Self {
            inner: Box::pin(future),
            coordinator,
            context,
        }
    }

    /// Returns the snapshot installed around each poll.
    #[must_use]
    pub fn context(&self) -> Option<&C::Snapshot> {
        self.context.as_ref()
    }
}

// The inner future is pinned on the heap; nothing else is structurally pinned.
impl<C: ContextCoordinator, F> Unpin for ContextPreservedFuture<C, F> {}

impl<C: ContextCoordinator, F: Future> Future for ContextPreservedFuture<C, F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let inner = this.inner.as_mut();
        run_in_context(&this.coordinator, this.context.clone(), || inner.poll(cx))
    }
}

impl<C: ContextCoordinator, F> fmt::Debug for ContextPreservedFuture<C, F>
where
    C::Snapshot: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextPreservedFuture")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Adds context decoration to any future.
pub trait PreserveContextExt: Future + Sized {
    /// Runs this future under the calling thread's current context.
    fn preserve_context<C: ContextCoordinator>(self, coordinator: C) -> ContextPreservedFuture<C, Self> {
        ContextPreservedFuture::wrap(self, coordinator)
    }

    /// Runs this future under the given snapshot.
    fn preserve_context_with<C: ContextCoordinator>(
        self,
        coordinator: C,
        context: Option<C::Snapshot>,
    ) -> ContextPreservedFuture<C, Self> {
        ContextPreservedFuture::wrap_with(self, coordinator, context)
    }
}

impl<F: Future> PreserveContextExt for F {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{context_map, mdc, MdcCoordinator};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_future_sees_captured_context() {
        mdc::set_context_map(Some(context_map([("k", "v1")])));
        let fut = async { mdc::get("k") }.preserve_context(MdcCoordinator);
        mdc::clear();

        let seen = tokio_test::block_on(fut);

        assert_eq!(seen.as_deref(), Some("v1"));
        assert_eq!(mdc::copy_of_context_map(), None);
    }

    #[test]
    fn test_context_installed_on_every_poll() {
        let fut = async {
            let before = mdc::get("k");
            tokio::task::yield_now().await;
            (before, mdc::get("k"))
        }
        .preserve_context_with(MdcCoordinator, Some(context_map([("k", "given")])));

        let (before, after) = tokio_test::block_on(fut);

        assert_eq!(before.as_deref(), Some("given"));
        assert_eq!(after.as_deref(), Some("given"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_spawned_task_keeps_context() {
        let fut = async {
            tokio::task::yield_now().await;
            mdc::get("request_id")
        }
        .preserve_context_with(MdcCoordinator, Some(context_map([("request_id", "r-7")])));

        let seen = tokio::spawn(fut).await.unwrap();

        assert_eq!(seen.as_deref(), Some("r-7"));
    }
}
