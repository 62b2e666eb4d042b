//! Decorators bound to the mapped diagnostic context.
//!
//! Shorthand for the generic constructors with [`MdcCoordinator`] filled in,
//! for the common case of carrying logging correlation fields across thread
//! hand-offs.
//!
//! ```rust
//! use context_preserved::context::mdc;
//! use context_preserved::executor::{ExecutorConfig, ExecutorService, TokioExecutorService};
//! use context_preserved::mdc_preserved;
//!
//! let service = mdc_preserved::dynamic_executor_service(
//!     TokioExecutorService::new(&ExecutorConfig::default()).unwrap(),
//! );
//!
//! mdc::put("request_id", "r-42").unwrap();
//! let handle = service.submit(|| Ok::<_, String>(mdc::get("request_id"))).unwrap();
//! assert_eq!(handle.wait().unwrap().as_deref(), Some("r-42"));
//! ```

use crate::context::{ContextMap, MdcCoordinator};
use crate::executor::{
    DynamicContextExecutor, DynamicContextExecutorService, Executor, ExecutorService,
    FixedContextExecutor,
};
use crate::task::{ContextPreservedCallable, ContextPreservedRunnable};

/// Wraps `task` with the calling thread's MDC.
#[must_use]
pub fn callable<F>(task: F) -> ContextPreservedCallable<MdcCoordinator, F> {
    ContextPreservedCallable::wrap(task, MdcCoordinator)
}

/// Wraps `task` with the given MDC.
#[must_use]
pub fn callable_with<F>(task: F, context: Option<ContextMap>) -> ContextPreservedCallable<MdcCoordinator, F> {
    ContextPreservedCallable::wrap_with(task, MdcCoordinator, context)
}

/// Wraps `action` with the calling thread's MDC.
#[must_use]
pub fn runnable<F>(action: F) -> ContextPreservedRunnable<MdcCoordinator, F> {
    ContextPreservedRunnable::wrap(action, MdcCoordinator)
}

/// Wraps `action` with the given MDC.
#[must_use]
pub fn runnable_with<F>(action: F, context: Option<ContextMap>) -> ContextPreservedRunnable<MdcCoordinator, F> {
    ContextPreservedRunnable::wrap_with(action, MdcCoordinator, context)
}

/// Decorates `executor` so each job carries its submitter's MDC.
#[must_use]
pub fn dynamic_executor<X: Executor>(executor: X) -> DynamicContextExecutor<X, MdcCoordinator> {
    DynamicContextExecutor::wrap(executor, MdcCoordinator)
}

/// Decorates `executor` with the calling thread's current MDC for every job.
#[must_use]
pub fn fixed_executor<X: Executor>(executor: X) -> FixedContextExecutor<X, MdcCoordinator> {
    FixedContextExecutor::wrap(executor, MdcCoordinator)
}

/// Decorates `executor` with the given MDC for every job.
#[must_use]
pub fn fixed_executor_with<X: Executor>(
    executor: X,
    context: Option<ContextMap>,
) -> FixedContextExecutor<X, MdcCoordinator> {
    FixedContextExecutor::wrap_with(executor, MdcCoordinator, context)
}

/// Decorates `service` so each submission carries its submitter's MDC.
#[must_use]
pub fn dynamic_executor_service<S: ExecutorService>(
    service: S,
) -> DynamicContextExecutorService<S, MdcCoordinator> {
    DynamicContextExecutorService::wrap(service, MdcCoordinator)
}
