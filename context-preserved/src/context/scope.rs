//! Scoped installation of a snapshot with guaranteed restoration.

use super::ContextCoordinator;
use std::fmt;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};

/// Installs a snapshot on the current thread and restores the prior context
/// when dropped.
///
/// Restoration runs on every exit path, including unwinding, so a panicking
/// task body cannot leak its context into the next task scheduled on the same
/// worker thread.
///
/// Restoring from `Drop` while the thread is already unwinding means a
/// panicking `install` aborts the process. Use [`exit`](Self::exit) or
/// [`run_in_context`] when the coordinator may panic on restore.
pub struct ContextScope<'a, C: ContextCoordinator + ?Sized> {
    coordinator: &'a C,
    prior: Option<Option<C::Snapshot>>,
}

impl<'a, C: ContextCoordinator + ?Sized> ContextScope<'a, C> {
    /// Reads the current context, installs `context`, and returns a guard
    /// that puts the read value back.
    ///
    /// If `install` panics the guard is never created and nothing is
    /// restored, since nothing was replaced.
    #[must_use = "the prior context is restored as soon as the scope is dropped"]
    pub fn enter(coordinator: &'a C, context: Option<C::Snapshot>) -> Self {
        let prior = coordinator.read();
        coordinator.install(context);
        Self {
            coordinator,
            prior: Some(prior),
        }
    }

    /// Restores the prior context now instead of on drop. A panic from
    /// `install` propagates to the caller like any other panic.
    pub fn exit(mut self) {
        if let Some(prior) = self.prior.take() {
            self.coordinator.install(prior);
        }
    }
}

impl<C: ContextCoordinator + ?Sized> Drop for ContextScope<'_, C> {
    fn drop(&mut self) {
        if let Some(prior) = self.prior.take() {
            self.coordinator.install(prior);
        }
    }
}

impl<C: ContextCoordinator + ?Sized> fmt::Debug for ContextScope<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextScope")
            .field("armed", &self.prior.is_some())
            .finish()
    }
}

/// Runs `body` with `context` installed on the current thread, then restores
/// whatever was there before.
///
/// The body's return value is passed through untouched; a panic in the body
/// resumes with the same payload once the prior context is back.
///
/// If restoring panics after the body panicked, the body's payload wins and
/// the restore panic is dropped. If only the restore panics, its payload is
/// resumed.
pub fn run_in_context<C, R>(
    coordinator: &C,
    context: Option<C::Snapshot>,
    body: impl FnOnce() -> R,
) -> R
where
    C: ContextCoordinator + ?Sized,
{
    let scope = ContextScope::enter(coordinator, context);
    let outcome = catch_unwind(AssertUnwindSafe(body));
    let restored = catch_unwind(AssertUnwindSafe(|| scope.exit()));
    match (outcome, restored) {
        (Ok(value), Ok(())) => value,
        (Err(payload), _) | (Ok(_), Err(payload)) => resume_unwind(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{context_map, mdc, FnCoordinator, MdcCoordinator};
    use std::any::Any;

    #[test]
    fn test_scope_installs_and_restores() {
        mdc::set_context_map(Some(context_map([("k", "outer")])));

        {
            let _scope = ContextScope::enter(&MdcCoordinator, Some(context_map([("k", "inner")])));
            assert_eq!(mdc::get("k").as_deref(), Some("inner"));
        }

        assert_eq!(mdc::get("k").as_deref(), Some("outer"));
        mdc::clear();
    }

    #[test]
    fn test_restores_absent_context() {
        mdc::clear();

        let seen = run_in_context(&MdcCoordinator, Some(context_map([("k", "v")])), || {
            mdc::get("k")
        });

        assert_eq!(seen.as_deref(), Some("v"));
        assert_eq!(mdc::copy_of_context_map(), None);
    }

    #[test]
    fn test_restores_after_panic() {
        mdc::set_context_map(Some(context_map([("k", "before")])));

        let result = catch_unwind(AssertUnwindSafe(|| {
            run_in_context(&MdcCoordinator, Some(context_map([("k", "during")])), || {
                panic!("body failed");
            })
        }));

        assert!(result.is_err());
        assert_eq!(mdc::get("k").as_deref(), Some("before"));
        mdc::clear();
    }

    #[test]
    fn test_installing_none_clears_for_body() {
        mdc::set_context_map(Some(context_map([("k", "v")])));

        let inside = run_in_context(&MdcCoordinator, None, mdc::copy_of_context_map);

        assert_eq!(inside, None);
        assert_eq!(mdc::get("k").as_deref(), Some("v"));
        mdc::clear();
    }

    fn failing_restore() -> impl ContextCoordinator<Snapshot = u32> {
        FnCoordinator::new(
            || None,
            |context: Option<u32>| {
                if context.is_none() {
                    panic!("restore failed");
                }
            },
        )
    }

    fn message(payload: &(dyn Any + Send)) -> &str {
        payload.downcast_ref::<&str>().copied().unwrap_or_default()
    }

    #[test]
    fn test_body_panic_wins_over_restore_panic() {
        let coordinator = failing_restore();

        let payload = catch_unwind(AssertUnwindSafe(|| {
            run_in_context(&coordinator, Some(1), || -> u8 { panic!("body failed") })
        }))
        .unwrap_err();

        assert_eq!(message(&*payload), "body failed");
    }

    #[test]
    fn test_restore_panic_propagates_after_clean_body() {
        let coordinator = failing_restore();

        let payload = catch_unwind(AssertUnwindSafe(|| run_in_context(&coordinator, Some(1), || 7)))
            .unwrap_err();

        assert_eq!(message(&*payload), "restore failed");
    }

    #[test]
    fn test_exit_restores_early() {
        mdc::set_context_map(Some(context_map([("k", "outer")])));

        let scope = ContextScope::enter(&MdcCoordinator, Some(context_map([("k", "inner")])));
        scope.exit();

        assert_eq!(mdc::get("k").as_deref(), Some("outer"));
        mdc::clear();
    }
}
