//! The capability through which decorators reach ambient context.

use super::Snapshot;
use std::fmt;
use std::sync::Arc;

/// Uniform access to a thread-affined ambient context.
///
/// A coordinator is bound to one storage mechanism (a thread-local map, a
/// logging facade's diagnostic context, ...) and exposes exactly two
/// operations. Both act only on the calling thread's context.
///
/// Implementations must hand out independent copies from [`read`](Self::read)
/// and must replace, never merge, on [`install`](Self::install). A
/// coordinator that cannot honour a call signals it by panicking; decorators
/// let such panics propagate after undoing whatever they already installed.
pub trait ContextCoordinator: Send + Sync {
    /// The snapshot type handed out by this coordinator.
    type Snapshot: Snapshot;

    /// Returns a copy of the calling thread's context, or `None` if it has
    /// none.
    fn read(&self) -> Option<Self::Snapshot>;

    /// Replaces the calling thread's context. `None` clears it.
    fn install(&self, context: Option<Self::Snapshot>);
}

impl<C: ContextCoordinator + ?Sized> ContextCoordinator for Arc<C> {
    type Snapshot = C::Snapshot;

    fn read(&self) -> Option<Self::Snapshot> {
        (**self).read()
    }

    fn install(&self, context: Option<Self::Snapshot>) {
        (**self).install(context);
    }
}

impl<C: ContextCoordinator + ?Sized> ContextCoordinator for &C {
    type Snapshot = C::Snapshot;

    fn read(&self) -> Option<Self::Snapshot> {
        (**self).read()
    }

    fn install(&self, context: Option<Self::Snapshot>) {
        (**self).install(context);
    }
}

/// A coordinator assembled from a pair of functions.
///
/// Useful for binding a storage mechanism owned by another library without
/// writing a dedicated type.
pub struct FnCoordinator<S, R, I> {
    read: R,
    install: I,
    _snapshot: std::marker::PhantomData<fn() -> S>,
}

impl<S, R, I> FnCoordinator<S, R, I>
where
    S: Snapshot,
    R: Fn() -> Option<S> + Send + Sync,
    I: Fn(Option<S>) + Send + Sync,
{
    /// Creates a coordinator from a read function and an install function.
    #[must_use]
    pub fn new(read: R, install: I) -> Self {
        Self {
            read,
            install,
            _snapshot: std::marker::PhantomData,
        }
    }
}

impl<S, R, I> ContextCoordinator for FnCoordinator<S, R, I>
where
    S: Snapshot,
    R: Fn() -> Option<S> + Send + Sync,
    I: Fn(Option<S>) + Send + Sync,
{
    type Snapshot = S;

    fn read(&self) -> Option<S> {
        (self.read)()
    }

    fn install(&self, context: Option<S>) {
        (self.install)(context);
    }
}

impl<S, R: Clone, I: Clone> Clone for FnCoordinator<S, R, I> {
    fn clone(&self) -> Self {
        Self {
            read: self.read.clone(),
            install: self.install.clone(),
            _snapshot: std::marker::PhantomData,
        }
    }
}

impl<S, R, I> fmt::Debug for FnCoordinator<S, R, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCoordinator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    thread_local! {
        static SLOT: RefCell<Option<u32>> = const { RefCell::new(None) };
    }

    fn slot_coordinator() -> impl ContextCoordinator<Snapshot = u32> + Clone {
        FnCoordinator::new(
            || SLOT.with(|s| *s.borrow()),
            |value| SLOT.with(|s| *s.borrow_mut() = value),
        )
    }

    #[test]
    fn test_fn_coordinator_round_trip() {
        let coordinator = slot_coordinator();
        assert_eq!(coordinator.read(), None);

        coordinator.install(Some(7));
        assert_eq!(coordinator.read(), Some(7));

        coordinator.install(None);
        assert_eq!(coordinator.read(), None);
    }

    #[test]
    fn test_fn_coordinator_is_thread_affined() {
        let coordinator = slot_coordinator();
        coordinator.install(Some(1));

        let other = coordinator.clone();
        let seen = std::thread::spawn(move || other.read())
            .join()
            .unwrap();

        assert_eq!(seen, None);
        assert_eq!(coordinator.read(), Some(1));
        coordinator.install(None);
    }

    #[test]
    fn test_arc_and_ref_forward() {
        let coordinator = Arc::new(slot_coordinator());
        coordinator.install(Some(3));
        assert_eq!((&coordinator).read(), Some(3));
        coordinator.install(None);
    }
}
